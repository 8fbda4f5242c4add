use proconnect_shared::Role;
use proconnect_store::StoreError;
use thiserror::Error;

/// Shown when a form is submitted with a required field left blank.
pub const REQUIRED_FIELDS_MESSAGE: &str = "Please fill all required fields.";

/// Errors surfaced by the client core to the presentation layer.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No signed-in caller, or an empty caller id.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// A read the operation depends on failed.
    #[error("Store read failed: {0}")]
    StoreRead(#[source] StoreError),

    /// A write failed; nothing was persisted.
    #[error("Store write failed: {0}")]
    StoreWrite(#[source] StoreError),

    /// User input was missing or malformed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The caller's stored role does not allow the action.
    #[error("Only a {required} may do this")]
    WrongRole { required: Role },

    /// The caller does not own the record.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ClientError {
    /// One sentence suitable for an alert dialog.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::NotAuthenticated => "You must be logged in.".to_string(),
            ClientError::StoreRead(_) => "Failed to load data. Please try again.".to_string(),
            ClientError::StoreWrite(_) => "Failed to save changes. Please try again.".to_string(),
            ClientError::Validation(message) => message.clone(),
            ClientError::WrongRole { required } => format!("Only a {required} can do this."),
            ClientError::Forbidden(_) => "You can only change your own records.".to_string(),
            ClientError::NotFound(_) => "This item no longer exists.".to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for ClientError {
    /// Keeps the message of the first failing field (in field-name order).
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        let message = fields
            .iter()
            .flat_map(|(_, errs)| errs.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| REQUIRED_FIELDS_MESSAGE.to_string());
        ClientError::Validation(message)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
