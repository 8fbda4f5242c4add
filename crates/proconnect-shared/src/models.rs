//! Domain records as stored in the realtime store.
//!
//! Each record reads itself leniently from a raw JSON node via
//! `from_value` (see [`crate::fields`]) and writes itself with the
//! camelCase field names used by every client of the store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::NO_MESSAGES_PREVIEW;
use crate::fields::{self, serialize_skills};
use crate::types::{ConversationId, InviteId, InviteStatus, JobId, MessageId, ProjectId, Role, UserId};

// ---------------------------------------------------------------------------
// User profile
// ---------------------------------------------------------------------------

/// A user profile stored at `users/{uid}`.
///
/// Freelancer-only fields (`skills`, `portfolio`, `rate`) and client-only
/// fields (`company_name`, `budget`) are defaulted for the other role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    /// `None` when the stored `userType` is missing or unrecognised.
    pub role: Option<Role>,
    pub name: String,
    pub bio: String,
    pub skills: Vec<String>,
    pub portfolio: String,
    pub rate: f64,
    pub company_name: String,
    pub budget: f64,
}

impl UserProfile {
    pub fn from_value(id: UserId, value: &Value) -> Self {
        Self {
            id,
            role: fields::text(value, "userType").parse().ok(),
            name: fields::text(value, "name"),
            bio: fields::text(value, "bio"),
            skills: fields::skills(value, "skills"),
            portfolio: fields::text(value, "portfolio"),
            rate: fields::number(value, "rate"),
            company_name: fields::text(value, "companyName"),
            budget: fields::number(value, "budget"),
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A job posted by a client under `jobs/{key}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(skip)]
    pub id: JobId,
    pub title: String,
    pub description: String,
    #[serde(serialize_with = "serialize_skills")]
    pub skills: Vec<String>,
    pub budget: f64,
    pub job_type: String,
    pub duration: String,
    pub client_id: UserId,
    /// ISO-8601 creation time.
    pub created_at: String,
}

impl Job {
    pub fn from_value(id: JobId, value: &Value) -> Self {
        Self {
            id,
            title: fields::text(value, "title"),
            description: fields::text(value, "description"),
            skills: fields::skills(value, "skills"),
            budget: fields::number(value, "budget"),
            job_type: fields::text(value, "jobType"),
            duration: fields::text(value, "duration"),
            client_id: UserId(fields::text(value, "clientId")),
            created_at: fields::text(value, "createdAt"),
        }
    }
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// A portfolio project owned by a freelancer under `projects/{key}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(skip)]
    pub id: ProjectId,
    pub project_title: String,
    pub description: String,
    #[serde(serialize_with = "serialize_skills")]
    pub technologies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub freelancer_id: UserId,
    pub created_at: String,
}

impl Project {
    pub fn from_value(id: ProjectId, value: &Value) -> Self {
        Self {
            id,
            project_title: fields::text(value, "projectTitle"),
            description: fields::text(value, "description"),
            technologies: fields::skills(value, "technologies"),
            github_link: fields::opt_text(value, "githubLink"),
            live_link: fields::opt_text(value, "liveLink"),
            image_url: fields::opt_text(value, "imageUrl"),
            freelancer_id: UserId(fields::text(value, "freelancerId")),
            created_at: fields::text(value, "createdAt"),
        }
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// The two fixed roles of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Participants {
    pub client_id: UserId,
    pub freelancer_id: UserId,
}

impl Participants {
    pub fn from_value(value: &Value) -> Option<Self> {
        let client_id = fields::opt_text(value, "clientId")?;
        let freelancer_id = fields::opt_text(value, "freelancerId")?;
        Some(Self {
            client_id: UserId(client_id),
            freelancer_id: UserId(freelancer_id),
        })
    }

    pub fn includes(&self, user: &UserId) -> bool {
        &self.client_id == user || &self.freelancer_id == user
    }

    /// True when these participants are the unordered pair `{a, b}`.
    pub fn matches_pair(&self, a: &UserId, b: &UserId) -> bool {
        (&self.client_id == a && &self.freelancer_id == b)
            || (&self.client_id == b && &self.freelancer_id == a)
    }

    /// The other party from `user`'s point of view.
    pub fn counterpart(&self, user: &UserId) -> &UserId {
        if &self.client_id == user {
            &self.freelancer_id
        } else {
            &self.client_id
        }
    }
}

/// A single chat message under `chats/{id}/messages/{key}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(skip)]
    pub id: MessageId,
    pub sender_id: UserId,
    /// Sender display name captured at write time.
    pub sender_name: String,
    pub text: String,
    /// Sender's local clock, milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn from_value(id: MessageId, value: &Value) -> Self {
        Self {
            id,
            sender_id: UserId(fields::text(value, "senderId")),
            sender_name: fields::text(value, "senderName"),
            text: fields::text(value, "text"),
            timestamp: fields::millis(value, "timestamp"),
        }
    }
}

/// Convert a raw message log node into messages sorted by ascending timestamp.
///
/// Messages with equal timestamps keep key order, and push keys are
/// chronological, so ties resolve to write order.
pub fn messages_from_log(log: Option<&Value>) -> Vec<ChatMessage> {
    let Some(Value::Object(entries)) = log else {
        return Vec::new();
    };
    let mut messages: Vec<ChatMessage> = entries
        .iter()
        .map(|(key, value)| ChatMessage::from_value(MessageId(key.clone()), value))
        .collect();
    messages.sort_by_key(|m| m.timestamp);
    messages
}

/// A conversation record under `chats/{id}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(skip)]
    pub id: ConversationId,
    /// `None` for records written without a participants node.
    pub participants: Option<Participants>,
    #[serde(skip)]
    pub messages: Vec<ChatMessage>,
    /// Denormalized copy of the latest message text.
    pub last_message: String,
    /// Denormalized last-activity marker in milliseconds.
    pub timestamp: i64,
}

impl Conversation {
    pub fn from_value(id: ConversationId, value: &Value) -> Self {
        Self {
            id,
            participants: value.get("participants").and_then(Participants::from_value),
            messages: messages_from_log(value.get("messages")),
            last_message: fields::text(value, "lastMessage"),
            timestamp: fields::millis(value, "timestamp"),
        }
    }

    /// Timestamp of the newest message in the log, `0` when empty.
    pub fn latest_activity(&self) -> i64 {
        self.messages.iter().map(|m| m.timestamp).max().unwrap_or(0)
    }

    /// Text of the newest message in the log.
    pub fn latest_preview(&self) -> String {
        self.messages
            .iter()
            .max_by_key(|m| m.timestamp)
            .map(|m| m.text.clone())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| NO_MESSAGES_PREVIEW.to_string())
    }
}

// ---------------------------------------------------------------------------
// Invite
// ---------------------------------------------------------------------------

/// A client's invitation to a freelancer under `invites/{key}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    #[serde(skip)]
    pub id: InviteId,
    pub client_id: UserId,
    pub freelancer_id: UserId,
    pub client_name: String,
    pub freelancer_name: String,
    pub timestamp: i64,
    pub status: InviteStatus,
}

impl Invite {
    /// Unknown statuses read as pending.
    pub fn from_value(id: InviteId, value: &Value) -> Self {
        Self {
            id,
            client_id: UserId(fields::text(value, "clientId")),
            freelancer_id: UserId(fields::text(value, "freelancerId")),
            client_name: fields::text(value, "clientName"),
            freelancer_name: fields::text(value, "freelancerName"),
            timestamp: fields::millis(value, "timestamp"),
            status: fields::text(value, "status").parse().unwrap_or(InviteStatus::Pending),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_round_trips_skills_as_string() {
        let job = Job {
            id: JobId::from("j1"),
            title: "Build API".into(),
            description: "REST backend".into(),
            skills: vec!["rust".into(), "sql".into()],
            budget: 500.0,
            job_type: "Fixed".into(),
            duration: "1 month".into(),
            client_id: UserId::from("c1"),
            created_at: "2024-01-01T00:00:00.000Z".into(),
        };
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["skills"], "rust, sql");
        assert_eq!(value["clientId"], "c1");
        assert!(value.get("id").is_none());

        let back = Job::from_value(JobId::from("j1"), &value);
        assert_eq!(back, job);
    }

    #[test]
    fn test_profile_with_missing_fields() {
        let profile = UserProfile::from_value(UserId::from("u1"), &json!({ "userType": "freelancer" }));
        assert_eq!(profile.role, Some(Role::Freelancer));
        assert_eq!(profile.name, "");
        assert_eq!(profile.rate, 0.0);
        assert!(profile.skills.is_empty());

        let unknown = UserProfile::from_value(UserId::from("u2"), &json!({ "name": "X" }));
        assert_eq!(unknown.role, None);
    }

    #[test]
    fn test_participants() {
        let p = Participants {
            client_id: UserId::from("c"),
            freelancer_id: UserId::from("f"),
        };
        assert!(p.matches_pair(&UserId::from("c"), &UserId::from("f")));
        assert!(p.matches_pair(&UserId::from("f"), &UserId::from("c")));
        assert!(!p.matches_pair(&UserId::from("c"), &UserId::from("x")));
        assert_eq!(p.counterpart(&UserId::from("c")), &UserId::from("f"));
        assert_eq!(p.counterpart(&UserId::from("f")), &UserId::from("c"));
        assert!(Participants::from_value(&json!({ "clientId": "c" })).is_none());
    }

    #[test]
    fn test_conversation_orders_messages_and_derives_activity() {
        let value = json!({
            "participants": { "clientId": "c", "freelancerId": "f" },
            "lastMessage": "stale",
            "timestamp": 1,
            "messages": {
                "k2": { "senderId": "f", "senderName": "F", "text": "second", "timestamp": 200 },
                "k1": { "senderId": "c", "senderName": "C", "text": "first", "timestamp": 100 },
            }
        });
        let conv = Conversation::from_value(ConversationId::from("x"), &value);
        let texts: Vec<_> = conv.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(conv.latest_activity(), 200);
        assert_eq!(conv.latest_preview(), "second");

        let empty = Conversation::from_value(ConversationId::from("y"), &json!({}));
        assert_eq!(empty.latest_activity(), 0);
        assert_eq!(empty.latest_preview(), NO_MESSAGES_PREVIEW);
        assert!(empty.participants.is_none());
    }

    #[test]
    fn test_invite_unknown_status_reads_pending() {
        let invite = Invite::from_value(InviteId::from("i"), &json!({ "status": "weird" }));
        assert_eq!(invite.status, InviteStatus::Pending);
        let accepted = Invite::from_value(InviteId::from("i"), &json!({ "status": "accepted" }));
        assert_eq!(accepted.status, InviteStatus::Accepted);
    }
}
