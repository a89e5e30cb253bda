//! Error types for segment tracking and script execution

use thiserror::Error;
use trellis_dom::TreeError;

pub type SegmentResult<T> = Result<T, SegmentError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentError {
    #[error("Unknown segment: {0}")]
    UnknownSegment(String),

    #[error("Markup for segment {0} contains no nodes")]
    EmptyContent(String),

    #[error("Placeholder is not attached to a parent")]
    DetachedPlaceholder,

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("No script registered for callback {0}")]
    UnknownCallback(String),

    #[error("Script failed: {0}")]
    Failed(String),

    #[error("Script {0} panicked")]
    Panicked(String),

    #[error("Segment error: {0}")]
    Segment(#[from] SegmentError),
}

impl ScriptError {
    pub fn failed(message: impl Into<String>) -> Self {
        ScriptError::Failed(message.into())
    }
}
