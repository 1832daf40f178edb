//! Generic read-then-branch reconciliation protocol
//!
//! This module implements the one non-trivial design in steward: for any
//! managed kind, ensure-present and ensure-absent are a single read followed
//! by at most one mutating call, branching on whether the read failure (if
//! any) classifies as "resource absent" or as a real operation failure.
//!
//! The protocol is written once, generically over a [`ResourceOps`]
//! capability set, instead of once per kind.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;
use tracing::{debug, error};

use crate::kind::ResourceKind;
use crate::Result;

/// What a reconciliation call did to the cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The resource was absent and has been created
    Created,
    /// The resource existed and has been patched with the desired body
    Patched,
    /// The resource existed and has been deleted
    Deleted,
    /// The resource was already absent; ensure-absent had nothing to do
    NotFoundNoop,
    /// The corrective step failed and the failure policy suppressed the error
    Failed,
}

/// How non-corrective mutation failures are reported
///
/// The original interface exposed a per-operation `reraise` flag on some
/// kinds and not others. Steward exposes one policy uniformly, defaulting
/// to the strictest behavior. Create failures and non-404 read failures
/// raise regardless of policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Propagate every failure to the caller (default)
    #[default]
    Raise,
    /// Log patch/delete failures and report them as [`Outcome::Failed`]
    Log,
}

/// Capability set binding the reconciliation protocol to one resource kind
///
/// The facade supplies one implementation per managed kind; tests supply
/// mocks. Bodies are opaque payloads; the protocol passes them through to
/// create/patch without interpreting their contents.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceOps: Send + Sync {
    /// Kind this capability set operates on
    fn kind(&self) -> ResourceKind;

    /// Target namespace, for namespaced kinds
    fn namespace(&self) -> Option<String>;

    /// Read the named resource, discarding its content
    ///
    /// Only the success/not-found/failed distinction matters to the
    /// protocol.
    async fn read(&self, name: &str) -> Result<()>;

    /// Create the resource from the desired body
    async fn create(&self, body: &Value) -> Result<()>;

    /// Patch the named resource with the desired body
    async fn patch(&self, name: &str, body: &Value) -> Result<()>;

    /// Delete the named resource using the kind's delete options
    async fn delete(&self, name: &str) -> Result<()>;
}

/// Ensure the named resource exists with the desired body
///
/// Reads once, then either patches (found) or creates (absent). A read
/// failure that does not classify as not-found is propagated without
/// attempting any mutation, so a permission or transport problem is never
/// masked as "resource missing". At most one mutating call is made.
pub async fn ensure_present_with<O: ResourceOps + ?Sized>(
    ops: &O,
    name: &str,
    body: &Value,
    policy: FailurePolicy,
) -> Result<Outcome> {
    let kind = ops.kind();
    let namespace = ops.namespace();
    match ops.read(name).await {
        Ok(()) => {
            debug!(kind = %kind, name, namespace = ?namespace, "resource found");
            match ops.patch(name, body).await {
                Ok(()) => {
                    debug!(kind = %kind, name, namespace = ?namespace, "resource patched");
                    Ok(Outcome::Patched)
                }
                Err(err) => {
                    // The read succeeded, so this is an unambiguous
                    // operational failure, not a missing resource.
                    error!(kind = %kind, name, namespace = ?namespace, error = %err, "operation failed");
                    match policy {
                        FailurePolicy::Raise => Err(err),
                        FailurePolicy::Log => Ok(Outcome::Failed),
                    }
                }
            }
        }
        Err(err) if err.is_not_found() => {
            debug!(kind = %kind, name, namespace = ?namespace, "resource not found");
            match ops.create(body).await {
                Ok(()) => {
                    debug!(kind = %kind, name, namespace = ?namespace, "resource created");
                    Ok(Outcome::Created)
                }
                Err(err) => {
                    // Create is the corrective action; its failure is always
                    // reported regardless of policy.
                    error!(kind = %kind, name, namespace = ?namespace, error = %err, "operation failed");
                    Err(err)
                }
            }
        }
        Err(err) => {
            error!(kind = %kind, name, namespace = ?namespace, error = %err, "operation failed");
            Err(err)
        }
    }
}

/// Ensure the named resource does not exist
///
/// Reads once, then deletes if found. A not-found read is the desired end
/// state and reports [`Outcome::NotFoundNoop`]; any other read failure is
/// propagated without attempting the delete.
pub async fn ensure_absent_with<O: ResourceOps + ?Sized>(
    ops: &O,
    name: &str,
    policy: FailurePolicy,
) -> Result<Outcome> {
    let kind = ops.kind();
    let namespace = ops.namespace();
    match ops.read(name).await {
        Ok(()) => {
            debug!(kind = %kind, name, namespace = ?namespace, "resource found");
            match ops.delete(name).await {
                Ok(()) => {
                    debug!(kind = %kind, name, namespace = ?namespace, "resource deleted");
                    Ok(Outcome::Deleted)
                }
                Err(err) => {
                    error!(kind = %kind, name, namespace = ?namespace, error = %err, "operation failed");
                    match policy {
                        FailurePolicy::Raise => Err(err),
                        FailurePolicy::Log => Ok(Outcome::Failed),
                    }
                }
            }
        }
        Err(err) if err.is_not_found() => {
            debug!(kind = %kind, name, namespace = ?namespace, "resource not found");
            Ok(Outcome::NotFoundNoop)
        }
        Err(err) => {
            error!(kind = %kind, name, namespace = ?namespace, error = %err, "operation failed");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use serde_json::json;

    use super::*;
    use crate::Error;

    fn api_error(code: u16, reason: &str) -> Error {
        Error::Kube(kube::Error::Api(
            kube::core::Status::failure(&format!("{reason} for the requested resource"), reason)
                .with_code(code)
                .boxed(),
        ))
    }

    fn mock_ops(kind: ResourceKind) -> MockResourceOps {
        let mut ops = MockResourceOps::new();
        ops.expect_kind().return_const(kind);
        let namespace = kind.namespaced().then(|| "default".to_string());
        ops.expect_namespace().return_const(namespace);
        ops
    }

    // ==========================================================================
    // Story: Ensure Present
    //
    // One read, then exactly one of create or patch: never both, never a
    // retry, never a re-read after the write.
    // ==========================================================================

    /// Absent resource triggers exactly one create with the caller's body
    #[tokio::test]
    async fn when_resource_is_absent_ensure_present_creates_it() {
        let body = json!({"data": {"k": "v"}});
        let mut ops = mock_ops(ResourceKind::ConfigMap);
        ops.expect_read()
            .with(eq("app-config"))
            .times(1)
            .returning(|_| Err(api_error(404, "NotFound")));
        ops.expect_create()
            .with(eq(body.clone()))
            .times(1)
            .returning(|_| Ok(()));
        ops.expect_patch().never();

        let outcome = ensure_present_with(&ops, "app-config", &body, FailurePolicy::Raise)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Created);
    }

    /// Existing resource triggers exactly one patch and zero creates
    #[tokio::test]
    async fn when_resource_exists_ensure_present_patches_it() {
        let body = json!({"data": {"k": "v"}});
        let mut ops = mock_ops(ResourceKind::ConfigMap);
        ops.expect_read()
            .with(eq("app-config"))
            .times(1)
            .returning(|_| Ok(()));
        ops.expect_patch()
            .with(eq("app-config"), eq(body.clone()))
            .times(1)
            .returning(|_, _| Ok(()));
        ops.expect_create().never();

        let outcome = ensure_present_with(&ops, "app-config", &body, FailurePolicy::Raise)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Patched);
    }

    /// Two ensure-present calls against a converging cluster go create
    /// then patch, never create twice
    #[tokio::test]
    async fn when_called_twice_ensure_present_is_idempotent() {
        let body = json!({"spec": {"replicas": 2}});

        let mut first = mock_ops(ResourceKind::Deployment);
        first
            .expect_read()
            .times(1)
            .returning(|_| Err(api_error(404, "NotFound")));
        first.expect_create().times(1).returning(|_| Ok(()));

        let mut second = mock_ops(ResourceKind::Deployment);
        second.expect_read().times(1).returning(|_| Ok(()));
        second.expect_patch().times(1).returning(|_, _| Ok(()));
        second.expect_create().never();

        let outcome = ensure_present_with(&first, "worker", &body, FailurePolicy::Raise)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Created);
        let outcome = ensure_present_with(&second, "worker", &body, FailurePolicy::Raise)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Patched);
    }

    /// A read failure that is not a 404 never triggers a create
    #[tokio::test]
    async fn when_read_fails_without_404_ensure_present_raises_and_does_not_create() {
        let body = json!({"data": {}});
        let mut ops = mock_ops(ResourceKind::ConfigMap);
        ops.expect_read()
            .times(1)
            .returning(|_| Err(api_error(403, "Forbidden")));
        ops.expect_create().never();
        ops.expect_patch().never();

        // Propagates even under the tolerant policy: ambiguous state must
        // never be silently ignored.
        let result = ensure_present_with(&ops, "app-config", &body, FailurePolicy::Log).await;
        assert!(matches!(result, Err(err) if !err.is_not_found()));
    }

    /// Create failure raises regardless of the failure policy
    #[tokio::test]
    async fn when_create_fails_ensure_present_raises_even_under_log_policy() {
        let body = json!({"data": {}});
        let mut ops = mock_ops(ResourceKind::ConfigMap);
        ops.expect_read()
            .times(1)
            .returning(|_| Err(api_error(404, "NotFound")));
        ops.expect_create()
            .times(1)
            .returning(|_| Err(api_error(409, "AlreadyExists")));

        let result = ensure_present_with(&ops, "app-config", &body, FailurePolicy::Log).await;
        assert!(result.is_err());
    }

    /// Patch failure respects the failure policy
    #[tokio::test]
    async fn when_patch_fails_policy_decides_between_raising_and_failed_outcome() {
        let body = json!({"data": {}});

        let mut raising = mock_ops(ResourceKind::ConfigMap);
        raising.expect_read().times(1).returning(|_| Ok(()));
        raising
            .expect_patch()
            .times(1)
            .returning(|_, _| Err(api_error(422, "Invalid")));
        let result = ensure_present_with(&raising, "app-config", &body, FailurePolicy::Raise).await;
        assert!(result.is_err());

        let mut logging = mock_ops(ResourceKind::ConfigMap);
        logging.expect_read().times(1).returning(|_| Ok(()));
        logging
            .expect_patch()
            .times(1)
            .returning(|_, _| Err(api_error(422, "Invalid")));
        let outcome = ensure_present_with(&logging, "app-config", &body, FailurePolicy::Log)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Failed);
    }

    // ==========================================================================
    // Story: Ensure Absent
    //
    // Absence is the desired end state, so a not-found read is success.
    // ==========================================================================

    /// Existing resource triggers exactly one delete
    #[tokio::test]
    async fn when_resource_exists_ensure_absent_deletes_it() {
        let mut ops = mock_ops(ResourceKind::Deployment);
        ops.expect_read()
            .with(eq("worker"))
            .times(1)
            .returning(|_| Ok(()));
        ops.expect_delete()
            .with(eq("worker"))
            .times(1)
            .returning(|_| Ok(()));

        let outcome = ensure_absent_with(&ops, "worker", FailurePolicy::Raise)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Deleted);
    }

    /// Absent resource is a successful no-op with zero delete calls
    #[tokio::test]
    async fn when_resource_is_absent_ensure_absent_is_a_noop() {
        let mut ops = mock_ops(ResourceKind::Pod);
        ops.expect_read()
            .times(1)
            .returning(|_| Err(api_error(404, "NotFound")));
        ops.expect_delete().never();

        let outcome = ensure_absent_with(&ops, "worker-pod", FailurePolicy::Raise)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::NotFoundNoop);
    }

    /// A read failure that is not a 404 never triggers a delete
    #[tokio::test]
    async fn when_read_fails_without_404_ensure_absent_raises_and_does_not_delete() {
        let mut ops = mock_ops(ResourceKind::Service);
        ops.expect_read()
            .times(1)
            .returning(|_| Err(api_error(500, "InternalError")));
        ops.expect_delete().never();

        let result = ensure_absent_with(&ops, "web", FailurePolicy::Log).await;
        assert!(result.is_err());
    }

    /// Delete failure respects the failure policy
    #[tokio::test]
    async fn when_delete_fails_policy_decides_between_raising_and_failed_outcome() {
        let mut raising = mock_ops(ResourceKind::PersistentVolume);
        raising.expect_read().times(1).returning(|_| Ok(()));
        raising
            .expect_delete()
            .times(1)
            .returning(|_| Err(api_error(409, "Conflict")));
        let result = ensure_absent_with(&raising, "data-pv", FailurePolicy::Raise).await;
        assert!(result.is_err());

        let mut logging = mock_ops(ResourceKind::PersistentVolume);
        logging.expect_read().times(1).returning(|_| Ok(()));
        logging
            .expect_delete()
            .times(1)
            .returning(|_| Err(api_error(409, "Conflict")));
        let outcome = ensure_absent_with(&logging, "data-pv", FailurePolicy::Log)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Failed);
    }
}
