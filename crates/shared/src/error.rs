use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body the backend returns alongside a non-2xx status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ApiErrorBody {
    /// Non-blank `message`, if the server sent one.
    pub fn message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    OriginCode,
    DestinationCode,
    CargoLoad,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field:?}: {message}")]
pub struct FieldError {
    pub field: DraftField,
    pub message: String,
}

impl FieldError {
    pub fn new(field: DraftField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("shipment form is incomplete: {}", summarize(.0))]
pub struct DraftError(pub Vec<FieldError>);

impl DraftError {
    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn first_message(&self) -> Option<&str> {
        self.0.first().map(|err| err.message.as_str())
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|err| err.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
