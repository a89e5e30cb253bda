use thiserror::Error;
use trellis_messaging::ResourceError;
use trellis_protocol::ProtocolError;
use trellis_segments::SegmentError;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Segment error: {0}")]
    Segment(#[from] SegmentError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Invalid navigation target: {0}")]
    Navigation(#[from] url::ParseError),
}
