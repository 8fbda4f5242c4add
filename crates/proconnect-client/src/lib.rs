pub mod auth;
pub mod config;
pub mod conversations;
pub mod directory;
pub mod error;
pub mod invites;
pub mod jobs;
pub mod paths;
pub mod profiles;
pub mod projects;
pub mod routing;
pub mod state;

#[cfg(test)]
mod testing;

use tracing_subscriber::{fmt, EnvFilter};

pub use auth::{AuthProvider, StaticAuth};
pub use config::ClientConfig;
pub use conversations::{ConversationSummary, Conversations, MessageSubscription};
pub use directory::{search, Directory, FeedItem, HomeFeed};
pub use error::{ClientError, Result};
pub use invites::Invites;
pub use jobs::{JobForm, Jobs};
pub use profiles::{ProfileSetupForm, ProfileUpdateForm, Profiles};
pub use projects::{ProjectForm, Projects};
pub use routing::{resolve_start_route, StartRoute};
pub use state::ClientState;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set.  Calling this twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("proconnect_client=debug,proconnect_store=info,warn")
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();

    tracing::info!("ProConnect client core initialised");
}
