//! Application state shared by every presentation-layer entry point.
//!
//! [`ClientState`] owns the store and auth collaborators and hands out the
//! services that operate on them.  It is cheap to clone.

use std::sync::Arc;

use proconnect_shared::UserId;
use proconnect_store::{RealtimeStore, StoreError};

use crate::auth::{require_user, AuthProvider};
use crate::config::ClientConfig;
use crate::conversations::Conversations;
use crate::directory::Directory;
use crate::error::Result;
use crate::invites::Invites;
use crate::jobs::Jobs;
use crate::profiles::Profiles;
use crate::projects::Projects;
use crate::routing::{resolve_start_route, StartRoute};

#[derive(Clone)]
pub struct ClientState {
    /// The realtime store every service reads and writes.
    pub store: Arc<dyn RealtimeStore>,

    /// Supplies the signed-in user at the edge.
    pub auth: Arc<dyn AuthProvider>,

    pub config: ClientConfig,
}

impl ClientState {
    pub fn new(
        store: Arc<dyn RealtimeStore>,
        auth: Arc<dyn AuthProvider>,
        config: ClientConfig,
    ) -> Self {
        Self {
            store,
            auth,
            config,
        }
    }

    /// Connect to the store named by `config`.
    pub fn connect(
        config: ClientConfig,
        auth: Arc<dyn AuthProvider>,
    ) -> std::result::Result<Self, StoreError> {
        let store = config.connect_store()?;
        Ok(Self::new(store, auth, config))
    }

    /// The signed-in user, or `NotAuthenticated`.
    pub fn current_user(&self) -> Result<UserId> {
        require_user(self.auth.as_ref())
    }

    pub async fn start_route(&self) -> StartRoute {
        resolve_start_route(self.auth.as_ref(), self.store.clone()).await
    }

    pub fn directory(&self) -> Directory {
        Directory::new(self.store.clone())
    }

    pub fn conversations(&self) -> Conversations {
        Conversations::new(self.store.clone(), self.config.max_message_len)
    }

    pub fn profiles(&self) -> Profiles {
        Profiles::new(self.store.clone())
    }

    pub fn jobs(&self) -> Jobs {
        Jobs::new(self.store.clone())
    }

    pub fn projects(&self) -> Projects {
        Projects::new(self.store.clone())
    }

    pub fn invites(&self) -> Invites {
        Invites::new(self.store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticAuth;
    use crate::error::ClientError;

    #[tokio::test]
    async fn test_state_wires_services_to_one_store() {
        let auth = Arc::new(StaticAuth::signed_in("c1"));
        let state = ClientState::connect(ClientConfig::default(), auth.clone()).unwrap();
        let user = state.current_user().unwrap();

        let id = state
            .conversations()
            .find_or_create(&user, &UserId::from("f1"))
            .await
            .unwrap();
        let listed = state.conversations().list_conversations_for_user(&user).await;
        assert_eq!(listed[0].id, id);

        auth.sign_out();
        assert!(matches!(state.current_user(), Err(ClientError::NotAuthenticated)));
        assert_eq!(state.start_route().await, StartRoute::Login);
    }
}
