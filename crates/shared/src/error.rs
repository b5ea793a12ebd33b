use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{AxisName, ResourceKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Fetch,
}

/// Non-fatal failure report handed to subscribers and the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedError {
    pub code: ErrorCode,
    pub message: String,
}

impl ReportedError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Failure of a single resource fetch. Cloned to every caller awaiting the
/// same in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("transport failure for resource {resource}: {message}")]
    Transport {
        resource: ResourceKey,
        message: String,
    },
    #[error("resource {resource} answered with status {code}")]
    Status { resource: ResourceKey, code: u16 },
    #[error("failed to decode resource {resource}: {message}")]
    Decode {
        resource: ResourceKey,
        message: String,
    },
    #[error("no fetcher configured for resource {resource}")]
    Unconfigured { resource: ResourceKey },
}

impl FetchError {
    pub fn resource(&self) -> &ResourceKey {
        match self {
            Self::Transport { resource, .. }
            | Self::Status { resource, .. }
            | Self::Decode { resource, .. }
            | Self::Unconfigured { resource } => resource,
        }
    }
}

impl From<&FetchError> for ReportedError {
    fn from(value: &FetchError) -> Self {
        Self::new(ErrorCode::Fetch, value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("value {value:?} is not allowed for axis {axis}")]
    InvalidSelection { axis: AxisName, value: String },
    #[error("unknown selection axis {axis}")]
    UnknownAxis { axis: AxisName },
}

/// Rejections raised while declaring selection axes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AxisConfigError {
    #[error("axis {axis} declared twice")]
    DuplicateAxis { axis: AxisName },
    #[error("axis {axis} depends on undeclared axis {parent}")]
    UnknownParent { axis: AxisName, parent: AxisName },
    #[error("default {default:?} of axis {axis} is not among its allowed values")]
    DefaultNotAllowed { axis: AxisName, default: String },
}
