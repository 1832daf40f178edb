//! Kubernetes-backed implementation of the reconciler capability set
//!
//! One dynamic-API implementation serves every managed kind; the kind
//! enumeration selects the API group, path, scope, and delete options.

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, Patch, PatchParams, PostParams};
use kube::Client;
use serde_json::Value;

use crate::kind::ResourceKind;
use crate::reconcile::ResourceOps;
use crate::{Error, Result};

/// Capability set for one resource kind, backed by the dynamic API
pub struct DynamicOps {
    api: Api<DynamicObject>,
    kind: ResourceKind,
    namespace: Option<String>,
}

impl DynamicOps {
    /// Bind a client to one kind, namespaced when the kind requires it
    ///
    /// `namespace` is ignored for cluster-scoped kinds.
    pub fn new(client: Client, kind: ResourceKind, namespace: &str) -> Self {
        let ar = kind.api_resource();
        if kind.namespaced() {
            Self {
                api: Api::namespaced_with(client, namespace, &ar),
                kind,
                namespace: Some(namespace.to_string()),
            }
        } else {
            Self {
                api: Api::all_with(client, &ar),
                kind,
                namespace: None,
            }
        }
    }
}

/// Convert an opaque desired-configuration body into a dynamic object
///
/// The API server requires `apiVersion` and `kind` on create bodies; they
/// are filled in from the kind metadata when the caller omitted them. The
/// body is otherwise passed through uninterpreted.
fn to_dynamic(kind: ResourceKind, body: &Value) -> Result<DynamicObject> {
    let mut body = body.clone();
    let map = body
        .as_object_mut()
        .ok_or_else(|| Error::serialization(format!("{kind} body must be a JSON object")))?;
    map.entry("apiVersion")
        .or_insert_with(|| Value::String(kind.api_version().to_string()));
    map.entry("kind")
        .or_insert_with(|| Value::String(kind.as_str().to_string()));
    serde_json::from_value(body).map_err(|e| Error::serialization(e.to_string()))
}

#[async_trait]
impl ResourceOps for DynamicOps {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn namespace(&self) -> Option<String> {
        self.namespace.clone()
    }

    async fn read(&self, name: &str) -> Result<()> {
        self.api.get(name).await.map(|_| ()).map_err(Error::from)
    }

    async fn create(&self, body: &Value) -> Result<()> {
        let obj = to_dynamic(self.kind, body)?;
        self.api
            .create(&PostParams::default(), &obj)
            .await
            .map(|_| ())
            .map_err(Error::from)
    }

    async fn patch(&self, name: &str, body: &Value) -> Result<()> {
        self.api
            .patch(name, &PatchParams::default(), &Patch::Merge(body))
            .await
            .map(|_| ())
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.api
            .delete(name, &self.kind.delete_params())
            .await
            .map(|_| ())
            .map_err(Error::from)
    }
}
