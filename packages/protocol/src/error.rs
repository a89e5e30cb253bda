use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Message has no msgtype field")]
    MissingMessageType,

    #[error("Unrecognised message type: {0}")]
    UnrecognisedMessage(String),

    #[error("Malformed {msgtype} message: {source}")]
    Malformed {
        msgtype: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    /// The msgtype the error concerns, if one was present
    pub fn msgtype(&self) -> Option<&str> {
        match self {
            ProtocolError::MissingMessageType => None,
            ProtocolError::UnrecognisedMessage(msgtype) => Some(msgtype),
            ProtocolError::Malformed { msgtype, .. } => Some(msgtype),
        }
    }
}
