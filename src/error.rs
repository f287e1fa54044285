use std::path::PathBuf;
use thiserror::Error;

/// Which of the two detection result sources an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Baselines,
    TextBlocks,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Baselines => write!(f, "baseline"),
            SourceKind::TextBlocks => write!(f, "text block"),
        }
    }
}

/// Which record type a per-record error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Baseline,
    TextBlock,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Baseline => write!(f, "baseline"),
            RecordKind::TextBlock => write!(f, "text block"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("cannot read {kind} source {}: {source}", .path.display())]
    SourceUnavailable {
        kind: SourceKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{kind} source {} is not valid JSON: {source}", .path.display())]
    InvalidFormat {
        kind: SourceKind,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed {kind} record {id}: {reason}")]
    MalformedRecord {
        kind: RecordKind,
        id: i64,
        reason: String,
    },

    #[error("text block {block_id} references unknown baseline {baseline_id}")]
    DanglingReference { block_id: i64, baseline_id: i64 },
}

impl BridgeError {
    pub(crate) fn malformed(kind: RecordKind, id: i64, reason: impl Into<String>) -> Self {
        BridgeError::MalformedRecord {
            kind,
            id,
            reason: reason.into(),
        }
    }
}
