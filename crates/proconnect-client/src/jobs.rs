use std::sync::Arc;

use proconnect_shared::clock::now_iso;
use proconnect_shared::constants::{JOBS_COLLECTION, UNKNOWN_POSTER_NAME};
use proconnect_shared::fields::split_skills;
use proconnect_shared::{Job, JobId, Role, UserId};
use proconnect_store::RealtimeStore;
use serde_json::{json, Value};
use tracing::{info, warn};
use validator::Validate;

use crate::error::{ClientError, Result};
use crate::paths;
use crate::profiles::{name_or, Profiles};

const ALL_FIELDS_MESSAGE: &str = "Please fill in all fields.";

#[derive(Debug, Clone, Default, Validate)]
pub struct JobForm {
    #[validate(length(min = 1, message = "Please fill in all fields."))]
    pub title: String,
    #[validate(length(min = 1, message = "Please fill in all fields."))]
    pub description: String,
    /// Comma-separated.
    #[validate(length(min = 1, message = "Please fill in all fields."))]
    pub skills: String,
    pub budget: Option<f64>,
    #[validate(length(min = 1, message = "Please fill in all fields."))]
    pub job_type: String,
    #[validate(length(min = 1, message = "Please fill in all fields."))]
    pub duration: String,
}

impl JobForm {
    fn trimmed(mut self) -> Self {
        for field in [
            &mut self.title,
            &mut self.description,
            &mut self.skills,
            &mut self.job_type,
            &mut self.duration,
        ] {
            *field = field.trim().to_string();
        }
        self
    }
}

pub struct Jobs {
    store: Arc<dyn RealtimeStore>,
}

impl Jobs {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    /// Post a job as `client`, whose stored role must be Client.
    pub async fn post_job(&self, client: &UserId, form: JobForm) -> Result<JobId> {
        if client.as_str().is_empty() {
            return Err(ClientError::NotAuthenticated);
        }
        let form = form.trimmed();
        form.validate()?;
        let budget = form
            .budget
            .ok_or_else(|| ClientError::Validation(ALL_FIELDS_MESSAGE.to_string()))?;
        if !(budget.is_finite() && budget > 0.0) {
            return Err(ClientError::Validation("Budget must be greater than zero".into()));
        }
        let skills = split_skills(&form.skills);
        if skills.is_empty() {
            return Err(ClientError::Validation(ALL_FIELDS_MESSAGE.to_string()));
        }

        let role = Profiles::new(self.store.clone())
            .get_profile(client)
            .await?
            .and_then(|p| p.role);
        if role != Some(Role::Client) {
            return Err(ClientError::WrongRole {
                required: Role::Client,
            });
        }

        let id = JobId(self.store.push_key());
        let job = Job {
            id: id.clone(),
            title: form.title,
            description: form.description,
            skills,
            budget,
            job_type: form.job_type,
            duration: form.duration,
            client_id: client.clone(),
            created_at: now_iso(),
        };
        let value = serde_json::to_value(&job).map_err(|e| ClientError::StoreWrite(e.into()))?;
        self.store
            .write(&paths::job(&id)?, value)
            .await
            .map_err(ClientError::StoreWrite)?;

        info!(job = %id, client = %client, budget, "job posted");
        Ok(id)
    }

    /// Jobs posted by `client`, newest first.  A failed read yields none.
    pub async fn jobs_for_client(&self, client: &UserId) -> Vec<Job> {
        let Ok(collection) = paths::collection(JOBS_COLLECTION) else {
            return Vec::new();
        };
        let found = match self
            .store
            .query_by_field(&collection, "clientId", &json!(client.as_str()))
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(client = %client, error = %e, "failed to load client jobs");
                return Vec::new();
            }
        };
        let mut jobs: Vec<Job> = found
            .iter()
            .map(|(key, value)| Job::from_value(JobId::from(key.as_str()), value))
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    pub async fn get_job(&self, id: &JobId) -> Result<Option<Job>> {
        let value = self
            .store
            .read(&paths::job(id)?)
            .await
            .map_err(ClientError::StoreRead)?;
        Ok(value
            .filter(Value::is_object)
            .map(|v| Job::from_value(id.clone(), &v)))
    }

    /// Delete a job the caller posted.
    pub async fn delete_job(&self, caller: &UserId, id: &JobId) -> Result<()> {
        let job = self
            .get_job(id)
            .await?
            .ok_or_else(|| ClientError::NotFound(format!("job {id}")))?;
        if &job.client_id != caller {
            return Err(ClientError::Forbidden(format!("job {id} belongs to another client")));
        }
        self.store
            .remove(&paths::job(id)?)
            .await
            .map_err(ClientError::StoreWrite)?;
        info!(job = %id, client = %caller, "job deleted");
        Ok(())
    }

    /// Name of the client who posted `job`, `"Unknown"` when unavailable.
    pub async fn job_poster_name(&self, job: &Job) -> String {
        name_or(self.store.as_ref(), &job.client_id, UNKNOWN_POSTER_NAME).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FailingStore;
    use proconnect_store::MemoryStore;

    fn store_with_users() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_data(json!({
            "users": {
                "c1": { "userType": "Client", "name": "Cat" },
                "c2": { "userType": "Client" },
                "f1": { "userType": "Freelancer", "name": "Fay" },
            }
        })))
    }

    fn form(title: &str, budget: f64) -> JobForm {
        JobForm {
            title: title.into(),
            description: "Build something".into(),
            skills: "rust, sql".into(),
            budget: Some(budget),
            job_type: "Fixed".into(),
            duration: "2 weeks".into(),
        }
    }

    #[tokio::test]
    async fn test_post_job_stores_record() {
        let store = store_with_users();
        let jobs = Jobs::new(store.clone());
        let client = UserId::from("c1");

        let id = jobs.post_job(&client, form("  API  ", 500.0)).await.unwrap();
        let job = jobs.get_job(&id).await.unwrap().unwrap();
        assert_eq!(job.title, "API");
        assert_eq!(job.skills, vec!["rust", "sql"]);
        assert_eq!(job.client_id, client);
        assert!(job.created_at.ends_with('Z'));

        let raw = &store.dump()["jobs"][id.as_str()];
        assert_eq!(raw["skills"], "rust, sql");
        assert_eq!(raw["budget"], 500.0);
        assert_eq!(raw["jobType"], "Fixed");
    }

    #[tokio::test]
    async fn test_post_job_validation_and_role() {
        let jobs = Jobs::new(store_with_users());

        let err = jobs
            .post_job(&UserId::from("c1"), JobForm { duration: " ".into(), ..form("T", 1.0) })
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), ALL_FIELDS_MESSAGE);

        let err = jobs
            .post_job(&UserId::from("c1"), JobForm { budget: None, ..form("T", 1.0) })
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), ALL_FIELDS_MESSAGE);

        assert!(matches!(
            jobs.post_job(&UserId::from("c1"), form("T", 0.0)).await,
            Err(ClientError::Validation(_))
        ));
        assert!(matches!(
            jobs.post_job(&UserId::from("f1"), form("T", 10.0)).await,
            Err(ClientError::WrongRole { required: Role::Client })
        ));
        assert!(matches!(
            jobs.post_job(&UserId::from("nobody"), form("T", 10.0)).await,
            Err(ClientError::WrongRole { .. })
        ));
        assert!(matches!(
            jobs.post_job(&UserId::default(), form("T", 10.0)).await,
            Err(ClientError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_jobs_for_client_newest_first() {
        let store = Arc::new(MemoryStore::with_data(json!({
            "jobs": {
                "a": { "clientId": "c1", "title": "old", "createdAt": "2024-01-01T00:00:00.000Z" },
                "b": { "clientId": "c2", "title": "theirs", "createdAt": "2024-06-01T00:00:00.000Z" },
                "c": { "clientId": "c1", "title": "new", "createdAt": "2024-03-01T00:00:00.000Z" },
            }
        })));
        let jobs = Jobs::new(store);
        let mine = jobs.jobs_for_client(&UserId::from("c1")).await;
        let titles: Vec<&str> = mine.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "old"]);

        assert!(Jobs::new(Arc::new(FailingStore))
            .jobs_for_client(&UserId::from("c1"))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_delete_job_checks_owner() {
        let store = store_with_users();
        let jobs = Jobs::new(store.clone());
        let id = jobs.post_job(&UserId::from("c1"), form("T", 10.0)).await.unwrap();

        assert!(matches!(
            jobs.delete_job(&UserId::from("c2"), &id).await,
            Err(ClientError::Forbidden(_))
        ));
        jobs.delete_job(&UserId::from("c1"), &id).await.unwrap();
        assert!(matches!(
            jobs.delete_job(&UserId::from("c1"), &id).await,
            Err(ClientError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_job_poster_name() {
        let jobs = Jobs::new(store_with_users());
        let job = |client: &str| Job::from_value(JobId::from("j"), &json!({ "clientId": client }));
        assert_eq!(jobs.job_poster_name(&job("c1")).await, "Cat");
        assert_eq!(jobs.job_poster_name(&job("c2")).await, UNKNOWN_POSTER_NAME);
        assert_eq!(jobs.job_poster_name(&job("")).await, UNKNOWN_POSTER_NAME);
    }
}
