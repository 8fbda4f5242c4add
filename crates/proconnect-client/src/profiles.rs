use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use futures::future::join_all;
use proconnect_shared::clock::now_millis;
use proconnect_shared::constants::UNKNOWN_USER_NAME;
use proconnect_shared::fields::{join_skills, split_skills};
use proconnect_shared::{Role, UserId, UserProfile};
use proconnect_store::RealtimeStore;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use validator::Validate;

use crate::error::{ClientError, Result, REQUIRED_FIELDS_MESSAGE};
use crate::paths;

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

/// First-run profile form.
#[derive(Debug, Clone, Default, Validate)]
pub struct ProfileSetupForm {
    pub role: Option<Role>,
    #[validate(length(min = 1, message = "Please fill all required fields."))]
    pub name: String,
    #[validate(length(min = 1, message = "Please fill all required fields."))]
    pub bio: String,
    /// Freelancer only, comma-separated.
    pub skills: String,
    /// Freelancer only.
    pub portfolio: String,
    /// Freelancer only, hourly.
    pub rate: Option<f64>,
    /// Client only.
    pub company_name: String,
    /// Client only.
    pub budget: Option<f64>,
}

/// Edit form for an existing profile.  `role` is the stored role, which the
/// form does not change.
#[derive(Debug, Clone, Validate)]
pub struct ProfileUpdateForm {
    pub role: Role,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub bio: String,
    pub skills: String,
    pub portfolio: String,
    pub rate: Option<f64>,
    pub company_name: String,
}

fn trim(s: &mut String) {
    *s = s.trim().to_string();
}

fn check_amount(value: Option<f64>, label: &str) -> Result<()> {
    match value {
        Some(v) if !(v.is_finite() && v >= 0.0) => Err(ClientError::Validation(format!(
            "{label} must be a positive number"
        ))),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct Profiles {
    store: Arc<dyn RealtimeStore>,
}

impl Profiles {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    /// Write the whole profile for `user`, replacing anything stored.
    pub async fn setup_profile(&self, user: &UserId, mut form: ProfileSetupForm) -> Result<()> {
        for field in [&mut form.name, &mut form.bio, &mut form.portfolio, &mut form.company_name] {
            trim(field);
        }
        form.validate()?;
        let role = form
            .role
            .ok_or_else(|| ClientError::Validation(REQUIRED_FIELDS_MESSAGE.to_string()))?;
        check_amount(form.rate, "Rate")?;
        check_amount(form.budget, "Budget")?;

        let mut record = Map::new();
        record.insert("userType".into(), json!(role.as_str()));
        record.insert("name".into(), json!(form.name));
        record.insert("bio".into(), json!(form.bio));
        match role {
            Role::Freelancer => {
                record.insert("skills".into(), json!(join_skills(&split_skills(&form.skills))));
                record.insert("portfolio".into(), json!(form.portfolio));
                if let Some(rate) = form.rate {
                    record.insert("rate".into(), json!(rate));
                }
            }
            Role::Client => {
                record.insert("companyName".into(), json!(form.company_name));
                if let Some(budget) = form.budget {
                    record.insert("budget".into(), json!(budget));
                }
            }
        }

        self.store
            .write(&paths::user(user)?, Value::Object(record))
            .await
            .map_err(ClientError::StoreWrite)?;

        info!(user = %user, role = %role, "profile created");
        Ok(())
    }

    /// Merge the edited fields into the stored profile.
    pub async fn update_profile(&self, user: &UserId, mut form: ProfileUpdateForm) -> Result<()> {
        for field in [
            &mut form.name,
            &mut form.bio,
            &mut form.skills,
            &mut form.portfolio,
            &mut form.company_name,
        ] {
            trim(field);
        }
        form.validate()?;
        if form.role == Role::Freelancer && form.rate.is_none() {
            return Err(ClientError::Validation("Hourly rate is required".into()));
        }
        check_amount(form.rate, "Rate")?;

        let mut fields = Map::new();
        fields.insert("userType".into(), json!(form.role.as_str()));
        fields.insert("name".into(), json!(form.name));
        fields.insert("bio".into(), json!(form.bio));
        fields.insert("updatedAt".into(), json!(now_millis()));
        match form.role {
            Role::Freelancer => {
                fields.insert("skills".into(), json!(join_skills(&split_skills(&form.skills))));
                fields.insert("portfolio".into(), json!(form.portfolio));
                fields.insert("rate".into(), json!(form.rate.unwrap_or(0.0)));
            }
            Role::Client => {
                fields.insert("companyName".into(), json!(form.company_name));
            }
        }

        self.store
            .update(&paths::user(user)?, fields)
            .await
            .map_err(ClientError::StoreWrite)?;

        info!(user = %user, "profile updated");
        Ok(())
    }

    /// The stored profile, or `None` when the user has not set one up.
    pub async fn get_profile(&self, user: &UserId) -> Result<Option<UserProfile>> {
        let value = self
            .store
            .read(&paths::user(user)?)
            .await
            .map_err(ClientError::StoreRead)?;
        Ok(value
            .filter(Value::is_object)
            .map(|v| UserProfile::from_value(user.clone(), &v)))
    }

    pub async fn display_name(&self, user: &UserId) -> String {
        display_name(self.store.as_ref(), user).await
    }
}

// ---------------------------------------------------------------------------
// Name lookups
// ---------------------------------------------------------------------------

/// `users/{id}/name`, or `"Unknown User"` when missing or unreadable.
pub async fn display_name(store: &dyn RealtimeStore, user: &UserId) -> String {
    name_or(store, user, UNKNOWN_USER_NAME).await
}

/// `users/{id}/name`, or `fallback` when missing or unreadable.
pub async fn name_or(store: &dyn RealtimeStore, user: &UserId, fallback: &str) -> String {
    let Ok(path) = paths::user_name(user) else {
        return fallback.to_string();
    };
    match store.read(&path).await {
        Ok(Some(Value::String(name))) if !name.trim().is_empty() => name,
        Ok(_) => fallback.to_string(),
        Err(e) => {
            warn!(user = %user, error = %e, "failed to read display name");
            fallback.to_string()
        }
    }
}

/// Resolve many names with one lookup per distinct id, concurrently.
pub async fn display_names<'a>(
    store: &dyn RealtimeStore,
    users: impl IntoIterator<Item = &'a UserId>,
) -> HashMap<UserId, String> {
    let unique: BTreeSet<&UserId> = users.into_iter().collect();
    debug!(count = unique.len(), "resolving display names");
    let names = join_all(unique.iter().map(|id| display_name(store, id))).await;
    unique.into_iter().cloned().zip(names).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FailingStore;
    use proconnect_store::MemoryStore;

    fn freelancer_form() -> ProfileSetupForm {
        ProfileSetupForm {
            role: Some(Role::Freelancer),
            name: "  Ada ".into(),
            bio: "Rust dev".into(),
            skills: "rust, , tokio ,".into(),
            portfolio: "https://ada.dev".into(),
            rate: Some(80.0),
            company_name: "ignored".into(),
            budget: Some(1.0),
        }
    }

    #[tokio::test]
    async fn test_setup_writes_role_specific_fields() {
        let store = Arc::new(MemoryStore::new());
        let profiles = Profiles::new(store.clone());
        let user = UserId::from("f1");

        profiles.setup_profile(&user, freelancer_form()).await.unwrap();

        let stored = store.dump();
        let record = &stored["users"]["f1"];
        assert_eq!(record["userType"], "Freelancer");
        assert_eq!(record["name"], "Ada");
        assert_eq!(record["skills"], "rust, tokio");
        assert_eq!(record["rate"], 80.0);
        assert!(record.get("companyName").is_none());

        let profile = profiles.get_profile(&user).await.unwrap().unwrap();
        assert_eq!(profile.role, Some(Role::Freelancer));
        assert_eq!(profile.skills, vec!["rust", "tokio"]);
    }

    #[tokio::test]
    async fn test_setup_requires_role_name_and_bio() {
        let profiles = Profiles::new(Arc::new(MemoryStore::new()));
        let user = UserId::from("u1");

        for form in [
            ProfileSetupForm { role: None, ..freelancer_form() },
            ProfileSetupForm { name: "   ".into(), ..freelancer_form() },
            ProfileSetupForm { bio: String::new(), ..freelancer_form() },
        ] {
            let err = profiles.setup_profile(&user, form).await.unwrap_err();
            assert_eq!(err.user_message(), REQUIRED_FIELDS_MESSAGE);
        }
        assert_eq!(profiles.get_profile(&user).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_merges_and_requires_rate_for_freelancers() {
        let store = Arc::new(MemoryStore::new());
        let profiles = Profiles::new(store.clone());
        let user = UserId::from("f1");
        profiles.setup_profile(&user, freelancer_form()).await.unwrap();

        let mut form = ProfileUpdateForm {
            role: Role::Freelancer,
            name: "Ada L.".into(),
            bio: "Systems".into(),
            skills: "rust,wasm".into(),
            portfolio: String::new(),
            rate: None,
            company_name: String::new(),
        };
        let err = profiles.update_profile(&user, form.clone()).await.unwrap_err();
        assert_eq!(err.user_message(), "Hourly rate is required");

        form.rate = Some(95.0);
        profiles.update_profile(&user, form).await.unwrap();

        let record = &store.dump()["users"]["f1"];
        assert_eq!(record["name"], "Ada L.");
        assert_eq!(record["skills"], "rust, wasm");
        assert_eq!(record["rate"], 95.0);
        assert!(record["updatedAt"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_update_requires_name() {
        let profiles = Profiles::new(Arc::new(MemoryStore::new()));
        let form = ProfileUpdateForm {
            role: Role::Client,
            name: "  ".into(),
            bio: String::new(),
            skills: String::new(),
            portfolio: String::new(),
            rate: None,
            company_name: "Acme".into(),
        };
        let err = profiles.update_profile(&UserId::from("c1"), form).await.unwrap_err();
        assert_eq!(err.user_message(), "Name is required");
    }

    #[tokio::test]
    async fn test_display_names_fall_back() {
        let store = MemoryStore::with_data(json!({
            "users": { "a": { "name": "Ada" }, "b": { "name": "  " } }
        }));
        let ids = [UserId::from("a"), UserId::from("b"), UserId::from("a"), UserId::from("zz")];
        let names = display_names(&store, ids.iter()).await;
        assert_eq!(names.len(), 3);
        assert_eq!(names[&UserId::from("a")], "Ada");
        assert_eq!(names[&UserId::from("b")], UNKNOWN_USER_NAME);
        assert_eq!(names[&UserId::from("zz")], UNKNOWN_USER_NAME);

        assert_eq!(display_name(&FailingStore, &UserId::from("a")).await, UNKNOWN_USER_NAME);
    }

    #[tokio::test]
    async fn test_get_profile_read_failure_is_an_error() {
        let profiles = Profiles::new(Arc::new(FailingStore));
        assert!(matches!(
            profiles.get_profile(&UserId::from("u1")).await,
            Err(ClientError::StoreRead(_))
        ));
    }
}
