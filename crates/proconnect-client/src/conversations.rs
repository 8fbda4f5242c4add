//! Two-party conversations under `chats/{id}` and their live message logs.
//!
//! A conversation is unique per unordered (client, freelancer) pair.  The
//! pair is claimed in `chatIndex/{pair_key}` with a conditional create, so
//! two concurrent callers always agree on one id.  Conversations written
//! before the index existed are found by scanning and then pinned in the
//! index.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use proconnect_shared::clock::now_millis;
use proconnect_shared::constants::{
    CHATS_COLLECTION, CONVERSATION_SEED_MESSAGE, MESSAGES_NODE, UNKNOWN_USER_NAME,
};
use proconnect_shared::{
    messages_from_log, pair_key, ChatMessage, Conversation, ConversationId, MessageId,
    Participants, UserId,
};
use proconnect_store::{ChangeEvent, RealtimeStore, StorePath, SubscriptionId};
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{ClientError, Result};
use crate::paths;
use crate::profiles::display_names;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

type MessageCallback = Box<dyn FnMut(Vec<ChatMessage>) + Send + 'static>;
type SharedCallback = Arc<Mutex<Option<MessageCallback>>>;

/// One row of a user's conversation list.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub participants: Participants,
    /// The other party from the listing user's point of view.
    pub counterpart: UserId,
    pub counterpart_name: String,
    /// Text of the newest message, or `"No messages yet"`.
    pub latest_message: String,
    /// Timestamp of the newest message, `0` when the log is empty.
    pub latest_timestamp: i64,
}

/// Handle of a live message subscription.
///
/// Dropping the handle cancels it.
pub struct MessageSubscription {
    id: SubscriptionId,
    conversation: ConversationId,
    store: Arc<dyn RealtimeStore>,
    callback: SharedCallback,
    task: JoinHandle<()>,
}

fn lock(callback: &SharedCallback) -> MutexGuard<'_, Option<MessageCallback>> {
    callback.lock().unwrap_or_else(|e| e.into_inner())
}

impl MessageSubscription {
    pub fn conversation(&self) -> &ConversationId {
        &self.conversation
    }

    pub fn is_active(&self) -> bool {
        lock(&self.callback).is_some()
    }

    /// Stop delivery and detach from the store.
    ///
    /// Once this returns the callback is never invoked again, even for a
    /// change that was already queued.  Must not be called from inside the
    /// callback itself.
    pub fn cancel(&self) {
        let was_active = lock(&self.callback).take().is_some();
        self.task.abort();
        self.store.unsubscribe(self.id);
        if was_active {
            debug!(conversation = %self.conversation, subscription = %self.id, "message subscription cancelled");
        }
    }
}

impl Drop for MessageSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct Conversations {
    store: Arc<dyn RealtimeStore>,
    max_message_len: usize,
}

impl Conversations {
    pub fn new(store: Arc<dyn RealtimeStore>, max_message_len: usize) -> Self {
        Self {
            store,
            max_message_len,
        }
    }

    /// The conversation between `client` and `freelancer`, created on first use.
    ///
    /// Either role order finds the same conversation.  A failed read is an
    /// error; nothing is created on a guess.
    pub async fn find_or_create(
        &self,
        client: &UserId,
        freelancer: &UserId,
    ) -> Result<ConversationId> {
        if client.as_str().is_empty() || freelancer.as_str().is_empty() {
            return Err(ClientError::Validation(
                "Both participants are required".into(),
            ));
        }

        let index = paths::chat_index(&pair_key(client, freelancer))?;
        let id = match self.indexed(&index, client, freelancer).await? {
            Some(id) => id,
            None => self.claim(&index, client, freelancer).await?,
        };
        self.ensure_record(&id, client, freelancer).await?;
        Ok(id)
    }

    /// The id held by the pair index, accepted only when its record is not
    /// written yet or names the same two participants.
    async fn indexed(
        &self,
        index: &StorePath,
        client: &UserId,
        freelancer: &UserId,
    ) -> Result<Option<ConversationId>> {
        let value = self.store.read(index).await.map_err(ClientError::StoreRead)?;
        let Some(Value::String(raw)) = value else {
            return Ok(None);
        };
        let id = ConversationId(raw);
        let Ok(path) = paths::participants(&id) else {
            return Ok(None);
        };
        let recorded = self.store.read(&path).await.map_err(ClientError::StoreRead)?;
        match recorded {
            None => Ok(Some(id)),
            Some(value) => {
                let same_pair = Participants::from_value(&value)
                    .is_some_and(|p| p.matches_pair(client, freelancer));
                if !same_pair {
                    warn!(index = %index, conversation = %id, "pair index points at another pair's conversation");
                }
                Ok(same_pair.then_some(id))
            }
        }
    }

    /// Claim the pair index for a legacy match or a fresh key.  The loser of
    /// a concurrent claim adopts the winner's id.
    async fn claim(
        &self,
        index: &StorePath,
        client: &UserId,
        freelancer: &UserId,
    ) -> Result<ConversationId> {
        let legacy = self.scan_for_pair(client, freelancer).await?;
        let candidate = legacy
            .clone()
            .unwrap_or_else(|| ConversationId(self.store.push_key()));

        let won = self
            .store
            .create_if_absent(index, json!(candidate.as_str()))
            .await
            .map_err(ClientError::StoreWrite)?;
        if won {
            if legacy.is_some() {
                info!(conversation = %candidate, "pinned existing conversation in pair index");
            }
            return Ok(candidate);
        }

        match self.indexed(index, client, freelancer).await? {
            Some(winner) => {
                debug!(conversation = %winner, "pair already claimed, adopting");
                Ok(winner)
            }
            None => {
                warn!(index = %index, "pair index holds an unusable value, overwriting");
                self.store
                    .write(index, json!(candidate.as_str()))
                    .await
                    .map_err(ClientError::StoreWrite)?;
                Ok(candidate)
            }
        }
    }

    /// Last conversation (in key order, so the newest) whose participants
    /// are the pair.  Older duplicates are left alone.
    async fn scan_for_pair(
        &self,
        client: &UserId,
        freelancer: &UserId,
    ) -> Result<Option<ConversationId>> {
        let chats = self
            .store
            .read(&paths::collection(CHATS_COLLECTION)?)
            .await
            .map_err(ClientError::StoreRead)?;
        let Some(Value::Object(chats)) = chats else {
            return Ok(None);
        };
        Ok(chats
            .iter()
            .rev()
            .find(|(_, chat)| {
                chat.get("participants")
                    .and_then(Participants::from_value)
                    .is_some_and(|p| p.matches_pair(client, freelancer))
            })
            .map(|(key, _)| ConversationId(key.clone())))
    }

    /// Write the conversation record unless one already exists, so a late
    /// writer never replaces an existing message log.
    async fn ensure_record(
        &self,
        id: &ConversationId,
        client: &UserId,
        freelancer: &UserId,
    ) -> Result<()> {
        let participants = Participants {
            client_id: client.clone(),
            freelancer_id: freelancer.clone(),
        };
        let record = json!({
            "participants": participants,
            "lastMessage": CONVERSATION_SEED_MESSAGE,
            "timestamp": now_millis(),
        });
        let created = self
            .store
            .create_if_absent(&paths::conversation(id)?, record)
            .await
            .map_err(ClientError::StoreWrite)?;
        if created {
            info!(conversation = %id, client = %client, freelancer = %freelancer, "conversation created");
        }
        Ok(())
    }

    /// Append a message stamped with the local clock.
    ///
    /// Blank text is ignored and returns `Ok(None)`.
    pub async fn append_message(
        &self,
        conversation: &ConversationId,
        sender: &UserId,
        sender_name: &str,
        text: &str,
    ) -> Result<Option<MessageId>> {
        self.append_message_at(conversation, sender, sender_name, text, now_millis())
            .await
    }

    /// Append a message with an explicit timestamp.
    ///
    /// The message node and the parent's `lastMessage`/`timestamp` are one
    /// multi-location update: all of it is stored or none of it.
    pub async fn append_message_at(
        &self,
        conversation: &ConversationId,
        sender: &UserId,
        sender_name: &str,
        text: &str,
        timestamp: i64,
    ) -> Result<Option<MessageId>> {
        if text.trim().is_empty() {
            debug!(conversation = %conversation, "ignoring blank message");
            return Ok(None);
        }
        if sender.as_str().is_empty() {
            return Err(ClientError::NotAuthenticated);
        }
        let len = text.chars().count();
        if len > self.max_message_len {
            return Err(ClientError::Validation(format!(
                "Message is too long ({len} characters, at most {})",
                self.max_message_len
            )));
        }

        let key = self.store.push_key();
        let sender_name = match sender_name.trim() {
            "" => UNKNOWN_USER_NAME,
            name => name,
        };
        let message = ChatMessage {
            id: MessageId(key.clone()),
            sender_id: sender.clone(),
            sender_name: sender_name.to_string(),
            text: text.to_string(),
            timestamp,
        };

        let mut fields = Map::new();
        fields.insert(
            format!("{MESSAGES_NODE}/{key}"),
            serde_json::to_value(&message).map_err(|e| ClientError::StoreWrite(e.into()))?,
        );
        fields.insert("lastMessage".into(), json!(message.text));
        fields.insert("timestamp".into(), json!(timestamp));

        self.store
            .update(&paths::conversation(conversation)?, fields)
            .await
            .map_err(ClientError::StoreWrite)?;

        debug!(conversation = %conversation, message = %key, sender = %sender, "message appended");
        Ok(Some(message.id))
    }

    /// Deliver the full, timestamp-ordered message list to `on_update` now
    /// and after every change, until the returned handle is cancelled.
    pub async fn subscribe_messages<F>(
        &self,
        conversation: &ConversationId,
        on_update: F,
    ) -> Result<MessageSubscription>
    where
        F: FnMut(Vec<ChatMessage>) + Send + 'static,
    {
        let path = paths::messages(conversation)?;
        let subscription = self
            .store
            .subscribe(&path)
            .await
            .map_err(ClientError::StoreRead)?;

        let boxed: MessageCallback = Box::new(on_update);
        let callback: SharedCallback = Arc::new(Mutex::new(Some(boxed)));
        let task = tokio::spawn(deliver(
            self.store.clone(),
            subscription.path,
            subscription.events,
            callback.clone(),
        ));

        info!(conversation = %conversation, subscription = %subscription.id, "message subscription started");
        Ok(MessageSubscription {
            id: subscription.id,
            conversation: conversation.clone(),
            store: self.store.clone(),
            callback,
            task,
        })
    }

    /// Conversations `user` takes part in, most recently active first.
    ///
    /// Recency comes from the message log, not the denormalized fields.  A
    /// failed read yields an empty list.
    pub async fn list_conversations_for_user(&self, user: &UserId) -> Vec<ConversationSummary> {
        let chats = match paths::collection(CHATS_COLLECTION) {
            Ok(path) => self.store.read(&path).await,
            Err(_) => return Vec::new(),
        };
        let chats = match chats {
            Ok(Some(Value::Object(chats))) => chats,
            Ok(_) => return Vec::new(),
            Err(e) => {
                error!(user = %user, error = %e, "failed to load conversations");
                return Vec::new();
            }
        };

        let conversations: Vec<(Conversation, Participants)> = chats
            .iter()
            .map(|(key, value)| Conversation::from_value(ConversationId(key.clone()), value))
            .filter_map(|c| {
                let participants = c.participants.clone()?;
                participants.includes(user).then_some((c, participants))
            })
            .collect();

        let names = display_names(
            self.store.as_ref(),
            conversations.iter().map(|(_, p)| p.counterpart(user)),
        )
        .await;

        let mut summaries: Vec<ConversationSummary> = conversations
            .iter()
            .map(|(conversation, participants)| {
                let counterpart = participants.counterpart(user).clone();
                ConversationSummary {
                    id: conversation.id.clone(),
                    participants: participants.clone(),
                    counterpart_name: names
                        .get(&counterpart)
                        .cloned()
                        .unwrap_or_else(|| UNKNOWN_USER_NAME.to_string()),
                    counterpart,
                    latest_message: conversation.latest_preview(),
                    latest_timestamp: conversation.latest_activity(),
                }
            })
            .collect();
        summaries.sort_by(|a, b| b.latest_timestamp.cmp(&a.latest_timestamp));

        debug!(user = %user, count = summaries.len(), "conversations listed");
        summaries
    }

    /// Participants of one conversation, for the chat header.
    pub async fn conversation_participants(
        &self,
        conversation: &ConversationId,
    ) -> Result<Option<Participants>> {
        let value = self
            .store
            .read(&paths::participants(conversation)?)
            .await
            .map_err(ClientError::StoreRead)?;
        Ok(value.as_ref().and_then(Participants::from_value))
    }

    /// Display names for `users`, one lookup per distinct id.
    pub async fn participant_names(&self, users: &[UserId]) -> HashMap<UserId, String> {
        display_names(self.store.as_ref(), users).await
    }
}

/// Re-read and deliver the whole log for every burst of change events.
async fn deliver(
    store: Arc<dyn RealtimeStore>,
    path: StorePath,
    mut events: mpsc::UnboundedReceiver<ChangeEvent>,
    callback: SharedCallback,
) {
    while events.recv().await.is_some() {
        // Each delivery is a full snapshot, so queued events add nothing.
        while events.try_recv().is_ok() {}

        let messages = match store.read(&path).await {
            Ok(log) => messages_from_log(log.as_ref()),
            Err(e) => {
                warn!(path = %path, error = %e, "failed to re-read message log");
                continue;
            }
        };

        let mut guard = lock(&callback);
        match guard.as_mut() {
            Some(on_update) => on_update(messages),
            None => break,
        }
    }
    debug!(path = %path, "message delivery stopped");
}
