use std::sync::Arc;

use proconnect_shared::clock::now_millis;
use proconnect_shared::constants::{DEFAULT_CLIENT_NAME, INVITES_COLLECTION};
use proconnect_shared::{Invite, InviteId, InviteStatus, UserId};
use proconnect_store::RealtimeStore;
use serde_json::{json, Map};
use tracing::{info, warn};

use crate::error::{ClientError, Result};
use crate::paths;

pub struct Invites {
    store: Arc<dyn RealtimeStore>,
}

impl Invites {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    /// Record a pending invite from `client` to `freelancer`.
    pub async fn send_invite(
        &self,
        client: &UserId,
        freelancer: &UserId,
        client_name: Option<&str>,
        freelancer_name: &str,
    ) -> Result<InviteId> {
        if client.as_str().is_empty() {
            return Err(ClientError::NotAuthenticated);
        }
        if freelancer.as_str().is_empty() {
            return Err(ClientError::Validation("No freelancer selected".into()));
        }

        let id = InviteId(self.store.push_key());
        let invite = Invite {
            id: id.clone(),
            client_id: client.clone(),
            freelancer_id: freelancer.clone(),
            client_name: client_name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or(DEFAULT_CLIENT_NAME)
                .to_string(),
            freelancer_name: freelancer_name.trim().to_string(),
            timestamp: now_millis(),
            status: InviteStatus::Pending,
        };
        let value = serde_json::to_value(&invite).map_err(|e| ClientError::StoreWrite(e.into()))?;
        self.store
            .write(&paths::invite(&id)?, value)
            .await
            .map_err(ClientError::StoreWrite)?;

        info!(invite = %id, client = %client, freelancer = %freelancer, "invite sent");
        Ok(id)
    }

    /// Invites addressed to `freelancer`, newest first.  A failed read yields none.
    pub async fn invites_for_freelancer(&self, freelancer: &UserId) -> Vec<Invite> {
        let Ok(collection) = paths::collection(INVITES_COLLECTION) else {
            return Vec::new();
        };
        let found = match self
            .store
            .query_by_field(&collection, "freelancerId", &json!(freelancer.as_str()))
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(freelancer = %freelancer, error = %e, "failed to load invites");
                return Vec::new();
            }
        };
        let mut invites: Vec<Invite> = found
            .iter()
            .map(|(key, value)| Invite::from_value(InviteId::from(key.as_str()), value))
            .collect();
        invites.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        invites
    }

    /// Move a pending invite to accepted or declined.
    pub async fn set_invite_status(&self, id: &InviteId, status: InviteStatus) -> Result<()> {
        let path = paths::invite(id)?;
        let current = match self.store.read(&path).await.map_err(ClientError::StoreRead)? {
            Some(value) if value.is_object() => Invite::from_value(id.clone(), &value).status,
            _ => return Err(ClientError::NotFound(format!("invite {id}"))),
        };
        if !current.can_transition_to(status) {
            return Err(ClientError::Validation(format!(
                "Invite is already {}",
                current.as_str()
            )));
        }

        let mut fields = Map::new();
        fields.insert("status".into(), json!(status.as_str()));
        self.store
            .update(&path, fields)
            .await
            .map_err(ClientError::StoreWrite)?;

        info!(invite = %id, status = status.as_str(), "invite status changed");
        Ok(())
    }
}
