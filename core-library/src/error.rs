use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Invalid query: {field} - {message}")]
    InvalidQuery { field: String, message: String },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] BridgeError),

    #[error("Codec error in {table}: {message}")]
    Codec { table: String, message: String },
}

impl LibraryError {
    pub fn invalid_query(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity_type: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Whether the failure may clear up on the next re-evaluation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
