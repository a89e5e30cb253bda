use thiserror::Error;

pub type ResourceResult<T> = Result<T, ResourceError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Resource {resource_id} has no handler for message type {msgtype:?}")]
    UnhandledMessage {
        resource_id: String,
        msgtype: Option<String>,
    },

    #[error("Resource {0} cannot be fetched")]
    NotFetchable(String),

    #[error("Resource {0} does not accept listeners")]
    NoListeners(String),
}
