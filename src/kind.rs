//! Resource kind enumeration and per-kind API metadata
//!
//! Every managed object type is described here once: its API group/version,
//! plural path segment, scope, and delete options. The reconciler and the
//! facade select behavior through this enum instead of repeating per-kind
//! control flow.

use std::fmt;

use kube::api::DeleteParams;
use kube::discovery::ApiResource;

/// API version of the Kubernetes core group
pub const API_VERSION_CORE: &str = "v1";

/// API version of the apps group, where deployments live
pub const API_VERSION_APPS: &str = "apps/v1";

/// The fixed set of Kubernetes object types steward manages
///
/// Node is listed and label-patched but never reconciled; the other six
/// kinds each get an ensure-present/ensure-absent pair on the facade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Core v1 ConfigMap (namespaced)
    ConfigMap,
    /// Core v1 Service (namespaced)
    Service,
    /// Core v1 Pod (namespaced)
    Pod,
    /// apps/v1 Deployment (namespaced)
    Deployment,
    /// Core v1 PersistentVolume (cluster-scoped)
    PersistentVolume,
    /// Core v1 PersistentVolumeClaim (namespaced)
    PersistentVolumeClaim,
    /// Core v1 Node (cluster-scoped)
    Node,
}

impl ResourceKind {
    /// Kubernetes kind string, as it appears in manifests
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigMap => "ConfigMap",
            Self::Service => "Service",
            Self::Pod => "Pod",
            Self::Deployment => "Deployment",
            Self::PersistentVolume => "PersistentVolume",
            Self::PersistentVolumeClaim => "PersistentVolumeClaim",
            Self::Node => "Node",
        }
    }

    /// API version string for this kind
    pub fn api_version(&self) -> &'static str {
        match self {
            Self::Deployment => API_VERSION_APPS,
            _ => API_VERSION_CORE,
        }
    }

    /// Plural resource name used in API paths
    pub fn plural(&self) -> &'static str {
        match self {
            Self::ConfigMap => "configmaps",
            Self::Service => "services",
            Self::Pod => "pods",
            Self::Deployment => "deployments",
            Self::PersistentVolume => "persistentvolumes",
            Self::PersistentVolumeClaim => "persistentvolumeclaims",
            Self::Node => "nodes",
        }
    }

    /// Whether objects of this kind live inside a namespace
    pub fn namespaced(&self) -> bool {
        !matches!(self, Self::PersistentVolume | Self::Node)
    }

    /// Build the `ApiResource` describing this kind to the dynamic API
    pub fn api_resource(&self) -> ApiResource {
        let (group, version) = match self.api_version().rsplit_once('/') {
            Some((group, version)) => (group, version),
            // Core API (e.g., "v1")
            None => ("", self.api_version()),
        };
        ApiResource {
            group: group.to_string(),
            version: version.to_string(),
            api_version: self.api_version().to_string(),
            kind: self.as_str().to_string(),
            plural: self.plural().to_string(),
        }
    }

    /// Delete options for this kind
    ///
    /// Deployments are deleted with foreground cascading so dependent
    /// objects (replica sets, pods) are removed before the deployment
    /// record is cleared. Everything else uses the server defaults.
    pub fn delete_params(&self) -> DeleteParams {
        match self {
            Self::Deployment => DeleteParams::foreground(),
            _ => DeleteParams::default(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
