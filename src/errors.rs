use std::time::Duration;

/// Failures while pulling a battle declaration out of message text.
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    /// The message does not contain a `<TAG>...</TAG>` block
    #[error("no <{0}> block found in message")]
    MissingTag(String),
    /// The tagged block contains neither `{` nor `[`
    #[error("no JSON object or array inside the declaration block")]
    NoJsonBracket,
    #[error("declaration is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures while turning parsed JSON into a typed declaration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("battle declaration must be a JSON object")]
    NotAnObject,
    #[error("side `{side}` is malformed: {reason}")]
    InvalidSide { side: String, reason: String },
}

/// Failures during roster resolution. Reference-data misses never land here;
/// they degrade to generated defaults instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("alliance `{alliance}` has {members} contributing trainers but only {capacity} roster slots")]
    AllianceOverCapacity {
        alliance: String,
        members: usize,
        capacity: usize,
    },
}

/// Failures talking to the authoritative state store.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store did not answer within {0:?}")]
    Timeout(Duration),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store patch could not be applied: {0}")]
    InvalidPatch(String),
}

/// Rejections from the party/box transfer planner. All of them abort before
/// any store mutation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("nothing selected")]
    NothingSelected,
    #[error("quantity mismatch: {selected} selected, {targets} target slots")]
    QuantityMismatch { selected: usize, targets: usize },
    #[error("invalid combination of party slots and box cells")]
    InvalidCombination,
    #[error("unknown party slot `{0}`")]
    UnknownSlot(String),
    #[error("unknown box entry `{0}`")]
    UnknownBoxEntry(String),
}

/// The session task is gone; commands can no longer be delivered.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Everything that can abort the declaration → payload pipeline.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Declaration(#[from] DeclarationError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for extraction
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type for declaration parsing
pub type DeclarationResult<T> = Result<T, DeclarationError>;

/// Result type for roster resolution
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for storage transfers
pub type TransferResult<T> = Result<T, TransferError>;

/// Result type for the full pipeline
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExtractError::MissingTag("PKM_BATTLE".to_string());
        assert_eq!(err.to_string(), "no <PKM_BATTLE> block found in message");

        let err = TransferError::QuantityMismatch {
            selected: 2,
            targets: 1,
        };
        assert_eq!(
            err.to_string(),
            "quantity mismatch: 2 selected, 1 target slots"
        );
    }

    #[test]
    fn test_pipeline_error_wraps_component_errors() {
        let err: PipelineError = DeclarationError::NotAnObject.into();
        assert!(matches!(err, PipelineError::Declaration(_)));
        assert_eq!(err.to_string(), "battle declaration must be a JSON object");
    }
}
