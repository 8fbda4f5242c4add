use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown user type: {0}")]
    UnknownRole(String),

    #[error("Unknown invite status: {0}")]
    UnknownInviteStatus(String),
}
