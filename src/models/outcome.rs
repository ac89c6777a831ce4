use crate::errors::RadarError;
use crate::models::record::CanonicalRecord;
use std::fmt;

/// 失败类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transient,
    Terminal,
    Parse,
    MaxRetriesExceeded,
    AllSourcesExhausted,
}

impl FailureKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::Transient)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// 单次适配器调用的结果
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success {
        records: Vec<CanonicalRecord>,
        /// Set when a fallback policy (e.g. the stale-data rule) produced the records.
        degraded: Option<String>,
    },
    Empty,
    Failure(FetchFailure),
}

impl FetchOutcome {
    /// Non-empty records become `Success`, anything else `Empty`.
    pub fn success(records: Vec<CanonicalRecord>) -> Self {
        if records.is_empty() {
            FetchOutcome::Empty
        } else {
            FetchOutcome::Success {
                records,
                degraded: None,
            }
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        FetchOutcome::Failure(FetchFailure {
            kind,
            message: message.into(),
        })
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::failure(FailureKind::Transient, message)
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self::failure(FailureKind::Terminal, message)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    pub fn records(&self) -> Option<&[CanonicalRecord]> {
        match self {
            FetchOutcome::Success { records, .. } => Some(records),
            _ => None,
        }
    }
}

impl From<RadarError> for FetchOutcome {
    fn from(e: RadarError) -> Self {
        let kind = match &e {
            RadarError::EmptyResult(_) => return FetchOutcome::Empty,
            RadarError::ParseError(_) | RadarError::DateError(_) | RadarError::SpreadsheetError(_) => {
                FailureKind::Parse
            }
            other if other.is_retryable() => FailureKind::Transient,
            _ => FailureKind::Terminal,
        };
        FetchOutcome::failure(kind, e.to_string())
    }
}

impl From<crate::errors::Result<Vec<CanonicalRecord>>> for FetchOutcome {
    fn from(result: crate::errors::Result<Vec<CanonicalRecord>>) -> Self {
        match result {
            Ok(records) => FetchOutcome::success(records),
            Err(e) => e.into(),
        }
    }
}
