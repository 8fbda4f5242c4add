use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Opaque user id issued by the authentication provider.
    UserId
);
string_id!(
    /// Store-generated key of a job posting.
    JobId
);
string_id!(
    /// Store-generated key of a portfolio project.
    ProjectId
);
string_id!(
    /// Store-generated key of a two-party conversation.
    ConversationId
);
string_id!(
    /// Store-generated key of a chat message.
    MessageId
);
string_id!(
    /// Store-generated key of an invite.
    InviteId
);

/// Canonical key of an unordered participant pair:
/// `{len(min)}_{min}_{max}`.
///
/// Both role assignments of the same two users produce the same key.  The
/// byte-length prefix keeps ids that contain `_` from colliding.
pub fn pair_key(a: &UserId, b: &UserId) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{}_{lo}_{hi}", lo.as_str().len())
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// The stored "user type" flag that drives feed selection and routing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    Client,
    Freelancer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "Client",
            Role::Freelancer => "Freelancer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    /// Older profiles were written with lowercase role names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "freelancer" => Ok(Role::Freelancer),
            other => Err(ParseError::UnknownRole(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Invite status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
            InviteStatus::Declined => "declined",
        }
    }

    /// Only a pending invite can be answered.
    pub fn can_transition_to(&self, next: InviteStatus) -> bool {
        matches!(
            (self, next),
            (InviteStatus::Pending, InviteStatus::Accepted)
                | (InviteStatus::Pending, InviteStatus::Declined)
        )
    }
}

impl FromStr for InviteStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(InviteStatus::Pending),
            "accepted" => Ok(InviteStatus::Accepted),
            "declined" => Ok(InviteStatus::Declined),
            other => Err(ParseError::UnknownInviteStatus(other.to_string())),
        }
    }
}
