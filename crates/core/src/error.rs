use serde::Serialize;
use thiserror::Error;

use crate::types::ItemId;

/// Unified API error type.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Unknown catalog item. Clients recover by going back to the listing.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::ItemNotFound(_) => "item_not_found",
            Self::Conflict(_) => "conflict",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::ItemNotFound(_) => 404,
            Self::Conflict(_) => 409,
        }
    }

    pub fn details(&self) -> serde_json::Value {
        match self {
            Self::ItemNotFound(_) => serde_json::json!({ "redirect": "/" }),
            _ => serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// JSON error envelope: `{ "error": { "code": "…", "message": "…", "details": {} } }`
#[derive(Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
}

impl From<&ApiError> for ErrorEnvelope {
    fn from(e: &ApiError) -> Self {
        Self {
            error: ErrorBody {
                code: e.code().to_string(),
                message: e.to_string(),
                details: e.details(),
            },
        }
    }
}

/// A gate operation was called in a phase that does not allow it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("no item is selected")]
    NothingSelected,
    #[error("selected item is not waiting for a password")]
    NotLocked,
    #[error("selected item is still locked")]
    StillLocked,
    #[error("selected item has no episodes")]
    NoEpisodes,
    #[error("episode {0} does not belong to the selected item")]
    UnknownEpisode(ItemId),
    #[error("nothing is bound to the player")]
    NotPlaying,
}

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::UnknownEpisode(_) => ApiError::NotFound(e.to_string()),
            _ => ApiError::Conflict(e.to_string()),
        }
    }
}

/// Catalog could not be read or breaks an invariant.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid catalog json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate item id {0}")]
    DuplicateId(ItemId),
    #[error("item {0} has an empty category")]
    MissingCategory(ItemId),
    #[error("item {0} is locked but has no password")]
    MissingPassword(ItemId),
    #[error("item {0} declares an empty episode list")]
    EmptyEpisodes(ItemId),
    #[error("item {item} repeats episode id {episode}")]
    DuplicateEpisodeId { item: ItemId, episode: ItemId },
}
