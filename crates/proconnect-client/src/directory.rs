//! Home feed: jobs for freelancers, freelancers for clients.
//!
//! Records are normalized leniently and never dropped; a failed read yields
//! an empty feed and an `error!` log line.

use std::cmp::Ordering;
use std::sync::Arc;

use proconnect_shared::constants::{JOBS_COLLECTION, USERS_COLLECTION};
use proconnect_shared::fields::join_skills;
use proconnect_shared::{Job, JobId, Role, UserId, UserProfile};
use proconnect_store::RealtimeStore;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::{ClientError, Result};
use crate::paths;
use crate::profiles::Profiles;

/// One row of the home feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedItem {
    /// Shown to freelancers.
    Job(Job),
    /// Shown to clients.
    Freelancer(UserProfile),
}

impl FeedItem {
    pub fn id(&self) -> &str {
        match self {
            FeedItem::Job(job) => job.id.as_str(),
            FeedItem::Freelancer(profile) => profile.id.as_str(),
        }
    }

    /// Job title or freelancer name.
    pub fn title(&self) -> &str {
        match self {
            FeedItem::Job(job) => &job.title,
            FeedItem::Freelancer(profile) => &profile.name,
        }
    }

    /// Job budget or freelancer hourly rate; the feed sort key.
    pub fn amount(&self) -> f64 {
        match self {
            FeedItem::Job(job) => job.budget,
            FeedItem::Freelancer(profile) => profile.rate,
        }
    }

    pub fn skills(&self) -> &[String] {
        match self {
            FeedItem::Job(job) => &job.skills,
            FeedItem::Freelancer(profile) => &profile.skills,
        }
    }

    /// `needle` must already be lowercase.
    fn matches(&self, needle: &str) -> bool {
        let contains = |haystack: &str| haystack.to_lowercase().contains(needle);
        match self {
            FeedItem::Job(job) => contains(&job.title) || contains(&job.description),
            FeedItem::Freelancer(profile) => {
                contains(&profile.name) || contains(&join_skills(&profile.skills))
            }
        }
    }
}

/// The signed-in user's home screen.
#[derive(Debug, Clone, PartialEq)]
pub struct HomeFeed {
    pub role: Role,
    pub items: Vec<FeedItem>,
}

pub struct Directory {
    store: Arc<dyn RealtimeStore>,
}

impl Directory {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    /// Feed for a viewer with `role`, sorted by descending budget or rate.
    ///
    /// Ties keep store enumeration order (ascending key).
    pub async fn load_feed(&self, role: Role, viewer: &UserId) -> Vec<FeedItem> {
        let collection = match role {
            Role::Freelancer => JOBS_COLLECTION,
            Role::Client => USERS_COLLECTION,
        };
        let Some(records) = self.read_collection(collection).await else {
            return Vec::new();
        };

        let mut items: Vec<FeedItem> = match role {
            Role::Freelancer => records
                .iter()
                .map(|(key, value)| FeedItem::Job(Job::from_value(JobId::from(key.as_str()), value)))
                .collect(),
            Role::Client => records
                .iter()
                .map(|(key, value)| UserProfile::from_value(UserId::from(key.as_str()), value))
                .filter(|profile| profile.role == Some(Role::Freelancer))
                .map(FeedItem::Freelancer)
                .collect(),
        };
        items.sort_by(|a, b| b.amount().partial_cmp(&a.amount()).unwrap_or(Ordering::Equal));

        debug!(viewer = %viewer, role = %role, count = items.len(), "feed loaded");
        items
    }

    /// Look up the viewer's role and load the matching feed.
    pub async fn load_home(&self, viewer: &UserId) -> Result<HomeFeed> {
        let profile = Profiles::new(self.store.clone()).get_profile(viewer).await?;
        let role = profile
            .and_then(|p| p.role)
            .ok_or_else(|| ClientError::NotFound(format!("profile for {viewer}")))?;
        Ok(HomeFeed {
            role,
            items: self.load_feed(role, viewer).await,
        })
    }

    async fn read_collection(&self, name: &str) -> Option<Map<String, Value>> {
        let path = paths::collection(name).ok()?;
        match self.store.read(&path).await {
            Ok(Some(Value::Object(records))) => Some(records),
            Ok(_) => Some(Map::new()),
            Err(e) => {
                error!(collection = name, error = %e, "failed to load feed");
                None
            }
        }
    }
}

/// Case-insensitive filter over title/description (jobs) or name/skills
/// (freelancers).  A blank query returns the feed unchanged.
pub fn search(feed: &[FeedItem], query: &str) -> Vec<FeedItem> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return feed.to_vec();
    }
    feed.iter().filter(|item| item.matches(&needle)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FailingStore;
    use proconnect_store::MemoryStore;
    use serde_json::json;

    fn directory(data: Value) -> Directory {
        Directory::new(Arc::new(MemoryStore::with_data(data)))
    }

    #[tokio::test]
    async fn test_jobs_sorted_by_budget_with_defaults() {
        let dir = directory(json!({
            "jobs": {
                "j1": { "title": "Small", "budget": 50, "skills": "css" },
                "j2": { "title": "Big", "budget": "900", "skills": ["rust", " ", "sql"] },
                "j3": { "description": "no title, no budget" },
                "j4": 17,
            }
        }));
        let feed = dir.load_feed(Role::Freelancer, &UserId::from("f1")).await;

        let ids: Vec<&str> = feed.iter().map(FeedItem::id).collect();
        assert_eq!(ids, vec!["j2", "j1", "j3", "j4"]);
        assert_eq!(feed[0].skills(), ["rust", "sql"]);
        assert_eq!(feed[2].title(), "");
        assert_eq!(feed[2].amount(), 0.0);
        assert!(feed[3].skills().is_empty());
    }

    #[tokio::test]
    async fn test_clients_see_freelancers_by_rate() {
        let dir = directory(json!({
            "users": {
                "a": { "userType": "Freelancer", "name": "Ada", "rate": 40 },
                "b": { "userType": "Client", "name": "Bob", "rate": 999 },
                "c": { "userType": "freelancer", "name": "Cy", "rate": 70 },
                "d": { "userType": "Freelancer" },
            }
        }));
        let feed = dir.load_feed(Role::Client, &UserId::from("b")).await;
        let ids: Vec<&str> = feed.iter().map(FeedItem::id).collect();
        assert_eq!(ids, vec!["c", "a", "d"]);
        assert!(feed.windows(2).all(|w| w[0].amount() >= w[1].amount()));
    }

    #[tokio::test]
    async fn test_read_failure_yields_empty_feed() {
        let dir = Directory::new(Arc::new(FailingStore));
        assert!(dir.load_feed(Role::Freelancer, &UserId::from("f1")).await.is_empty());
        assert!(dir.load_feed(Role::Client, &UserId::from("c1")).await.is_empty());
    }

    #[tokio::test]
    async fn test_load_home_uses_stored_role() {
        let dir = directory(json!({
            "users": {
                "c1": { "userType": "Client", "name": "Cat" },
                "f1": { "userType": "Freelancer", "name": "Fay", "rate": 10 },
            },
            "jobs": { "j1": { "title": "T", "budget": 5 } }
        }));
        let home = dir.load_home(&UserId::from("c1")).await.unwrap();
        assert_eq!(home.role, Role::Client);
        assert_eq!(home.items.len(), 1);
        assert_eq!(home.items[0].id(), "f1");

        assert!(matches!(
            dir.load_home(&UserId::from("nobody")).await,
            Err(ClientError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search() {
        let dir = directory(json!({
            "users": {
                "a": { "userType": "Freelancer", "name": "Ada", "skills": "Rust, Tokio" },
                "b": { "userType": "Freelancer", "name": "Ben", "skills": ["Go"] },
            }
        }));
        let feed = dir.load_feed(Role::Client, &UserId::from("c")).await;

        assert_eq!(search(&feed, ""), feed);
        assert_eq!(search(&feed, "   "), feed);
        let hits = search(&feed, "TOKIO");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id(), "a");
        assert_eq!(search(&feed, "ben")[0].id(), "b");
        assert!(search(&feed, "python").is_empty());
    }

    #[test]
    fn test_search_jobs_by_description() {
        let job = |id: &str, title: &str, description: &str| {
            FeedItem::Job(Job::from_value(
                JobId::from(id),
                &json!({ "title": title, "description": description }),
            ))
        };
        let feed = vec![job("1", "Logo", "Vector art"), job("2", "API", "REST backend")];
        let hits = search(&feed, "rest");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id(), "2");
    }
}
