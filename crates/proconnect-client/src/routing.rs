use std::sync::Arc;

use proconnect_shared::Role;
use proconnect_store::RealtimeStore;
use tracing::{debug, error};

use crate::auth::AuthProvider;
use crate::profiles::Profiles;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRoute {
    Login,
    /// Signed in, but no usable profile yet.
    ProfileSetup,
    Home { role: Role },
}

/// Route from the signed-in user and their stored role.
///
/// A failed profile read routes to login.
pub async fn resolve_start_route(
    auth: &dyn AuthProvider,
    store: Arc<dyn RealtimeStore>,
) -> StartRoute {
    let Some(user) = auth.current_user_id().filter(|u| !u.as_str().is_empty()) else {
        return StartRoute::Login;
    };
    let route = match Profiles::new(store).get_profile(&user).await {
        Ok(Some(profile)) => match profile.role {
            Some(role) => StartRoute::Home { role },
            None => StartRoute::ProfileSetup,
        },
        Ok(None) => StartRoute::ProfileSetup,
        Err(e) => {
            error!(user = %user, error = %e, "failed to load profile for routing");
            StartRoute::Login
        }
    };
    debug!(user = %user, ?route, "start route resolved");
    route
}
