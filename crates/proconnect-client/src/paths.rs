use proconnect_shared::constants::{
    CHATS_COLLECTION, CHAT_INDEX_COLLECTION, INVITES_COLLECTION, JOBS_COLLECTION, MESSAGES_NODE,
    PROJECTS_COLLECTION, USERS_COLLECTION,
};
use proconnect_shared::{ConversationId, InviteId, JobId, ProjectId, UserId};
use proconnect_store::StorePath;

use crate::error::{ClientError, Result};

/// Collection root such as `jobs`.
pub fn collection(name: &str) -> Result<StorePath> {
    node(&[name])
}

pub fn user(id: &UserId) -> Result<StorePath> {
    node(&[USERS_COLLECTION, id.as_str()])
}

pub fn user_name(id: &UserId) -> Result<StorePath> {
    node(&[USERS_COLLECTION, id.as_str(), "name"])
}

pub fn job(id: &JobId) -> Result<StorePath> {
    node(&[JOBS_COLLECTION, id.as_str()])
}

pub fn project(id: &ProjectId) -> Result<StorePath> {
    node(&[PROJECTS_COLLECTION, id.as_str()])
}

pub fn invite(id: &InviteId) -> Result<StorePath> {
    node(&[INVITES_COLLECTION, id.as_str()])
}

pub fn conversation(id: &ConversationId) -> Result<StorePath> {
    node(&[CHATS_COLLECTION, id.as_str()])
}

pub fn participants(id: &ConversationId) -> Result<StorePath> {
    node(&[CHATS_COLLECTION, id.as_str(), "participants"])
}

pub fn messages(id: &ConversationId) -> Result<StorePath> {
    node(&[CHATS_COLLECTION, id.as_str(), MESSAGES_NODE])
}

pub fn chat_index(pair: &str) -> Result<StorePath> {
    node(&[CHAT_INDEX_COLLECTION, pair])
}

/// Ids come from callers, so a reserved character is a validation failure
/// rather than a store fault.
fn node(segments: &[&str]) -> Result<StorePath> {
    let mut path = StorePath::root();
    for segment in segments {
        path.push(segment)
            .map_err(|e| ClientError::Validation(e.to_string()))?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let chat = ConversationId::from("-Nabc");
        assert_eq!(messages(&chat).unwrap().to_string(), "chats/-Nabc/messages");
        assert_eq!(user_name(&UserId::from("u1")).unwrap().to_string(), "users/u1/name");
        assert_eq!(chat_index("a_b").unwrap().to_string(), "chatIndex/a_b");
    }

    #[test]
    fn test_bad_ids_are_validation_errors() {
        assert!(matches!(user(&UserId::from("a.b")), Err(ClientError::Validation(_))));
        assert!(matches!(job(&JobId::from("")), Err(ClientError::Validation(_))));
    }
}
