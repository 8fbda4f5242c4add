use std::sync::Arc;

use proconnect_shared::clock::now_iso;
use proconnect_shared::constants::PROJECTS_COLLECTION;
use proconnect_shared::fields::split_skills;
use proconnect_shared::{Project, ProjectId, UserId};
use proconnect_store::RealtimeStore;
use serde_json::json;
use tracing::{info, warn};
use validator::Validate;

use crate::error::{ClientError, Result};
use crate::paths;

#[derive(Debug, Clone, Default, Validate)]
pub struct ProjectForm {
    #[validate(length(min = 1, message = "Please fill in all required fields."))]
    pub project_title: String,
    #[validate(length(min = 1, message = "Please fill in all required fields."))]
    pub description: String,
    /// Comma-separated.
    #[validate(length(min = 1, message = "Please fill in all required fields."))]
    pub technologies: String,
    pub github_link: String,
    pub live_link: String,
    pub image_url: String,
}

fn optional(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub struct Projects {
    store: Arc<dyn RealtimeStore>,
}

impl Projects {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    pub async fn add_project(&self, freelancer: &UserId, mut form: ProjectForm) -> Result<ProjectId> {
        if freelancer.as_str().is_empty() {
            return Err(ClientError::NotAuthenticated);
        }
        for field in [&mut form.project_title, &mut form.description, &mut form.technologies] {
            *field = field.trim().to_string();
        }
        form.validate()?;

        let id = ProjectId(self.store.push_key());
        let project = Project {
            id: id.clone(),
            project_title: form.project_title,
            description: form.description,
            technologies: split_skills(&form.technologies),
            github_link: optional(&form.github_link),
            live_link: optional(&form.live_link),
            image_url: optional(&form.image_url),
            freelancer_id: freelancer.clone(),
            created_at: now_iso(),
        };
        let value =
            serde_json::to_value(&project).map_err(|e| ClientError::StoreWrite(e.into()))?;
        self.store
            .write(&paths::project(&id)?, value)
            .await
            .map_err(ClientError::StoreWrite)?;

        info!(project = %id, freelancer = %freelancer, "project added");
        Ok(id)
    }

    /// Projects of `freelancer`, newest first.  A failed read yields none.
    pub async fn projects_for_freelancer(&self, freelancer: &UserId) -> Vec<Project> {
        let Ok(collection) = paths::collection(PROJECTS_COLLECTION) else {
            return Vec::new();
        };
        let found = match self
            .store
            .query_by_field(&collection, "freelancerId", &json!(freelancer.as_str()))
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(freelancer = %freelancer, error = %e, "failed to load projects");
                return Vec::new();
            }
        };
        let mut projects: Vec<Project> = found
            .iter()
            .map(|(key, value)| Project::from_value(ProjectId::from(key.as_str()), value))
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        projects
    }

    /// Delete a project the caller owns.
    pub async fn delete_project(&self, caller: &UserId, id: &ProjectId) -> Result<()> {
        let path = paths::project(id)?;
        let project = match self.store.read(&path).await.map_err(ClientError::StoreRead)? {
            Some(value) if value.is_object() => Project::from_value(id.clone(), &value),
            _ => return Err(ClientError::NotFound(format!("project {id}"))),
        };
        if &project.freelancer_id != caller {
            return Err(ClientError::Forbidden(format!(
                "project {id} belongs to another freelancer"
            )));
        }
        self.store.remove(&path).await.map_err(ClientError::StoreWrite)?;
        info!(project = %id, freelancer = %caller, "project deleted");
        Ok(())
    }
}
