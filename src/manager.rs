//! Resource manager facade
//!
//! [`ResourceManager`] binds an authenticated client and a target namespace,
//! and exposes one ensure/delete pair per managed kind. Every pair is a thin
//! instantiation of the generic reconciliation protocol in
//! [`crate::reconcile`]; the cluster metadata accessors at the bottom sit
//! outside that protocol but share its error discipline.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Node;
use k8s_openapi::apimachinery::pkg::version::Info;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::Client;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::kind::ResourceKind;
use crate::ops::DynamicOps;
use crate::reconcile::{ensure_absent_with, ensure_present_with, FailurePolicy, Outcome};
use crate::{Result, DEFAULT_NAMESPACE};

/// Idempotent manager for the Kubernetes resources of one namespace
///
/// Holds an authenticated client handle and a target namespace; all
/// namespaced operations are scoped to that namespace, cluster-scoped
/// operations (persistent volumes, nodes) ignore it. The manager keeps no
/// other state: every call is a fresh read followed by at most one
/// mutating call, and concurrent callers are not coordinated (the API
/// server's own conflict detection is the race signal).
#[derive(Clone)]
pub struct ResourceManager {
    client: Client,
    namespace: String,
    policy: FailurePolicy,
}

impl ResourceManager {
    /// Create a manager over an already-built client
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            policy: FailurePolicy::default(),
        }
    }

    /// Create a manager using inferred credentials
    ///
    /// Uses in-cluster configuration when running inside a pod, otherwise
    /// the local kubeconfig.
    pub async fn try_default(namespace: impl Into<String>) -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self::new(client, namespace))
    }

    /// Create a manager for the `default` namespace with inferred credentials
    pub async fn try_default_namespace() -> Result<Self> {
        Self::try_default(DEFAULT_NAMESPACE).await
    }

    /// Override how non-corrective mutation failures are reported
    ///
    /// The default is [`FailurePolicy::Raise`]; see [`FailurePolicy`] for
    /// what [`FailurePolicy::Log`] tolerates.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Target namespace for namespaced kinds
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn ops(&self, kind: ResourceKind) -> DynamicOps {
        DynamicOps::new(self.client.clone(), kind, &self.namespace)
    }

    async fn ensure(&self, kind: ResourceKind, name: &str, body: &Value) -> Result<Outcome> {
        ensure_present_with(&self.ops(kind), name, body, self.policy).await
    }

    async fn ensure_gone(&self, kind: ResourceKind, name: &str) -> Result<Outcome> {
        ensure_absent_with(&self.ops(kind), name, self.policy).await
    }

    // =========================================================================
    // Ensure-present / ensure-absent pairs, one per managed kind
    // =========================================================================

    /// Create or patch the named config map
    pub async fn ensure_config_map(&self, name: &str, body: &Value) -> Result<Outcome> {
        self.ensure(ResourceKind::ConfigMap, name, body).await
    }

    /// Delete the named config map if it exists
    pub async fn delete_config_map(&self, name: &str) -> Result<Outcome> {
        self.ensure_gone(ResourceKind::ConfigMap, name).await
    }

    /// Create or patch the named service
    pub async fn ensure_service(&self, name: &str, body: &Value) -> Result<Outcome> {
        self.ensure(ResourceKind::Service, name, body).await
    }

    /// Delete the named service if it exists
    pub async fn delete_service(&self, name: &str) -> Result<Outcome> {
        self.ensure_gone(ResourceKind::Service, name).await
    }

    /// Create or patch the named pod
    pub async fn ensure_pod(&self, name: &str, body: &Value) -> Result<Outcome> {
        self.ensure(ResourceKind::Pod, name, body).await
    }

    /// Delete the named pod if it exists
    pub async fn delete_pod(&self, name: &str) -> Result<Outcome> {
        self.ensure_gone(ResourceKind::Pod, name).await
    }

    /// Create or patch the named deployment
    pub async fn ensure_deployment(&self, name: &str, body: &Value) -> Result<Outcome> {
        self.ensure(ResourceKind::Deployment, name, body).await
    }

    /// Delete the named deployment if it exists
    ///
    /// Deletion cascades in the foreground so replica sets and pods are
    /// removed before the deployment record is cleared.
    pub async fn delete_deployment(&self, name: &str) -> Result<Outcome> {
        self.ensure_gone(ResourceKind::Deployment, name).await
    }

    /// Create or patch the named persistent volume (cluster-scoped)
    pub async fn ensure_volume(&self, name: &str, body: &Value) -> Result<Outcome> {
        self.ensure(ResourceKind::PersistentVolume, name, body).await
    }

    /// Delete the named persistent volume if it exists
    pub async fn delete_volume(&self, name: &str) -> Result<Outcome> {
        self.ensure_gone(ResourceKind::PersistentVolume, name).await
    }

    /// Create or patch the named persistent volume claim
    pub async fn ensure_volume_claim(&self, name: &str, body: &Value) -> Result<Outcome> {
        self.ensure(ResourceKind::PersistentVolumeClaim, name, body)
            .await
    }

    /// Delete the named persistent volume claim if it exists
    pub async fn delete_volume_claim(&self, name: &str) -> Result<Outcome> {
        self.ensure_gone(ResourceKind::PersistentVolumeClaim, name)
            .await
    }

    // =========================================================================
    // Cluster metadata accessors
    //
    // These do not participate in the reconciliation protocol. They always
    // propagate failures; there is no Outcome channel through which a
    // tolerated failure could be reported.
    // =========================================================================

    /// Fetch the API server version
    pub async fn get_version(&self) -> Result<Info> {
        match self.client.apiserver_version().await {
            Ok(info) => {
                debug!(version = %info.git_version, "fetched API server version");
                Ok(info)
            }
            Err(err) => {
                error!(error = %err, "operation failed");
                Err(err.into())
            }
        }
    }

    /// List all nodes visible to the caller
    pub async fn list_nodes(&self) -> Result<Vec<Node>> {
        let api: Api<Node> = Api::all(self.client.clone());
        match api.list(&ListParams::default()).await {
            Ok(nodes) => {
                debug!(count = nodes.items.len(), "listed cluster nodes");
                Ok(nodes.items)
            }
            Err(err) => {
                error!(error = %err, "operation failed");
                Err(err.into())
            }
        }
    }

    /// Merge labels onto the named node
    ///
    /// Deliberately a blind patch with no existence check: label updates
    /// are fire-and-forget against a node that is expected to exist, and a
    /// missing node surfaces as the patch failure itself.
    pub async fn update_node_labels(
        &self,
        node: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<()> {
        let api: Api<Node> = Api::all(self.client.clone());
        let body = json!({"metadata": {"labels": labels}});
        match api
            .patch(node, &PatchParams::default(), &Patch::Merge(&body))
            .await
        {
            Ok(_) => {
                debug!(node, "node labels patched");
                Ok(())
            }
            Err(err) => {
                error!(node, error = %err, "operation failed");
                Err(err.into())
            }
        }
    }
}
