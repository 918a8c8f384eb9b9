use async_trait::async_trait;
use sync_replication::DocumentId;

/// Credential and permission decisions, both entirely delegated to the host (§6, §7
/// `PermissionDenied`). This crate consumes only the yes/no answer.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authenticate(&self, token: &str) -> bool;

    async fn can_access(&self, document_id: &DocumentId) -> bool;
}

/// Accepts any token and grants access to every document. Suitable for local demos and
/// tests; a real deployment supplies its own [[Authorizer]].
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authenticate(&self, _token: &str) -> bool {
        true
    }

    async fn can_access(&self, _document_id: &DocumentId) -> bool {
        true
    }
}
