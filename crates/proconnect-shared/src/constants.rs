/// Application name
pub const APP_NAME: &str = "ProConnect";

/// Top-level collection holding one profile per authenticated user
pub const USERS_COLLECTION: &str = "users";

/// Top-level collection of jobs posted by clients
pub const JOBS_COLLECTION: &str = "jobs";

/// Top-level collection of freelancer portfolio projects
pub const PROJECTS_COLLECTION: &str = "projects";

/// Top-level collection of two-party conversations
pub const CHATS_COLLECTION: &str = "chats";

/// Secondary index mapping a canonical participant pair to its conversation id
pub const CHAT_INDEX_COLLECTION: &str = "chatIndex";

/// Top-level collection of client-to-freelancer invites
pub const INVITES_COLLECTION: &str = "invites";

/// Child node of a conversation holding its message log
pub const MESSAGES_NODE: &str = "messages";

/// `lastMessage` seed written when a freelancer opens a conversation by applying
pub const CONVERSATION_SEED_MESSAGE: &str = "Freelancer has applied for the job.";

/// Preview shown for a conversation whose message log is empty
pub const NO_MESSAGES_PREVIEW: &str = "No messages yet";

/// Fallback display name when a participant has no stored profile
pub const UNKNOWN_USER_NAME: &str = "Unknown User";

/// Fallback name for the poster of a job whose profile cannot be read
pub const UNKNOWN_POSTER_NAME: &str = "Unknown";

/// Fallback inviter name when the client has no display name
pub const DEFAULT_CLIENT_NAME: &str = "Client";

/// Maximum chat message length in characters
pub const MAX_MESSAGE_LEN: usize = 500;

/// Separator used when a list of skills is stored as a single string
pub const SKILLS_SEPARATOR: char = ',';
