use crate::domain::entities::AttachmentRef;
use crate::domain::value_objects::{EntityKind, IdempotencyKey, RemoteId};
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Create-request rebuilt from a queued record.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteMutationRequest {
    pub kind: EntityKind,
    pub idempotency_key: IdempotencyKey,
    pub fields: Map<String, Value>,
    pub attachment: Option<AttachmentRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The request never got a definitive answer: offline, timeout, connection reset, 5xx.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The server rejected the content. The message is the server's own text.
    #[error("{0}")]
    Validation(String),
}

impl RemoteError {
    pub fn is_transport(&self) -> bool {
        matches!(self, RemoteError::Transport(_))
    }
}

/// Remote create endpoint for every entity kind.
#[async_trait]
pub trait DomainMutationGateway: Send + Sync {
    async fn submit(&self, request: RemoteMutationRequest) -> Result<RemoteId, RemoteError>;
}
