//! JSON snapshot store.
//!
//! Reference backend: the whole relational state (resources, templates,
//! TVs, links, values, users) lives in one pretty-printed JSON file and is
//! rewritten after every mutation. Good enough for imports of tens of
//! thousands of items; real CMS bindings implement the same traits against
//! their own schema.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::traits::{ContentStore, StoreError, TvStore, UserStore};
use super::types::{
    NewResource, Resource, ResourceId, Template, TemplateId, TvDefinition, TvId, TvType, TvValue,
    User, UserId, UserProfile,
};

/// Built-in superuser account present in every fresh store.
pub const SUPERUSER_ID: UserId = 1;
const SUPERUSER_LOGIN: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TvLink {
    tv_id: TvId,
    template_id: TemplateId,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct State {
    resources: Vec<Resource>,
    templates: Vec<Template>,
    tvs: Vec<TvDefinition>,
    tv_links: Vec<TvLink>,
    tv_values: Vec<TvValue>,
    users: Vec<User>,
    profiles: Vec<UserProfile>,
}

fn next_id<T>(items: &[T], id_of: impl Fn(&T) -> u64) -> u64 {
    items.iter().map(id_of).max().unwrap_or(0) + 1
}

/// File-backed store implementing all three persistence traits.
pub struct JsonStore {
    path: PathBuf,
    state: RwLock<State>,
}

impl JsonStore {
    /// Open a snapshot file, creating the initial state (with the built-in
    /// superuser) when the file does not exist yet.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let state = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(path)?)?
        } else {
            let mut state = State::default();
            state.users.push(User {
                id: SUPERUSER_ID,
                username: SUPERUSER_LOGIN.to_string(),
            });
            state
        };

        Ok(Self {
            path: path.to_path_buf(),
            state: RwLock::new(state),
        })
    }

    async fn persist(&self, state: &State) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for JsonStore {
    async fn find_by_alias(&self, alias: &str) -> Result<Option<Resource>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .resources
            .iter()
            .find(|r| r.alias == alias && !r.trashed)
            .cloned())
    }

    async fn find_by_alias_any(&self, alias: &str) -> Result<Option<Resource>, StoreError> {
        let state = self.state.read().await;
        Ok(state.resources.iter().find(|r| r.alias == alias).cloned())
    }

    async fn get(&self, id: ResourceId) -> Result<Option<Resource>, StoreError> {
        let state = self.state.read().await;
        Ok(state.resources.iter().find(|r| r.id == id).cloned())
    }

    async fn create(&self, resource: NewResource) -> Result<Resource, StoreError> {
        let mut state = self.state.write().await;
        let resource = Resource {
            id: next_id(&state.resources, |r| r.id),
            title: resource.title,
            alias: resource.alias,
            parent: resource.parent,
            template: resource.template,
            published: resource.published,
            is_container: resource.is_container,
            intro: resource.intro,
            body: resource.body,
            created_at: resource.created_at,
            created_by: resource.created_by,
            trashed: false,
        };
        state.resources.push(resource.clone());
        self.persist(&state).await?;
        Ok(resource)
    }

    async fn set_parent(&self, id: ResourceId, parent: ResourceId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let resource = state
            .resources
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("resource {id}")))?;
        resource.parent = parent;
        self.persist(&state).await
    }

    async fn set_template(&self, id: ResourceId, template: TemplateId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let resource = state
            .resources
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("resource {id}")))?;
        resource.template = template;
        self.persist(&state).await
    }

    async fn set_container(&self, id: ResourceId, is_container: bool) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let resource = state
            .resources
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("resource {id}")))?;
        resource.is_container = is_container;
        self.persist(&state).await
    }

    async fn delete(&self, id: ResourceId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.resources.retain(|r| r.id != id);
        self.persist(&state).await
    }
}

#[async_trait]
impl TvStore for JsonStore {
    async fn find_template(&self, name: &str) -> Result<Option<Template>, StoreError> {
        let state = self.state.read().await;
        Ok(state.templates.iter().find(|t| t.name == name).cloned())
    }

    async fn create_template(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Template, StoreError> {
        let mut state = self.state.write().await;
        let template = Template {
            id: next_id(&state.templates, |t| t.id),
            name: name.to_string(),
            description: description.to_string(),
        };
        state.templates.push(template.clone());
        self.persist(&state).await?;
        Ok(template)
    }

    async fn templates_with_prefix(&self, prefix: &str) -> Result<Vec<Template>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .templates
            .iter()
            .filter(|t| t.name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn delete_template(&self, id: TemplateId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.templates.retain(|t| t.id != id);
        self.persist(&state).await
    }

    async fn find_tv(&self, name: &str) -> Result<Option<TvDefinition>, StoreError> {
        let state = self.state.read().await;
        Ok(state.tvs.iter().find(|tv| tv.name == name).cloned())
    }

    async fn create_tv(
        &self,
        name: &str,
        caption: &str,
        kind: TvType,
    ) -> Result<TvDefinition, StoreError> {
        let mut state = self.state.write().await;
        let tv = TvDefinition {
            id: next_id(&state.tvs, |tv| tv.id),
            name: name.to_string(),
            caption: caption.to_string(),
            kind,
        };
        state.tvs.push(tv.clone());
        self.persist(&state).await?;
        Ok(tv)
    }

    async fn delete_tv(&self, id: TvId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.tvs.retain(|tv| tv.id != id);
        state.tv_links.retain(|l| l.tv_id != id);
        state.tv_values.retain(|v| v.tv_id != id);
        self.persist(&state).await
    }

    async fn link_tv(&self, tv_id: TvId, template_id: TemplateId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let exists = state
            .tv_links
            .iter()
            .any(|l| l.tv_id == tv_id && l.template_id == template_id);
        if exists {
            return Ok(());
        }
        state.tv_links.push(TvLink { tv_id, template_id });
        self.persist(&state).await
    }

    async fn unlink_template(&self, template_id: TemplateId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.tv_links.retain(|l| l.template_id != template_id);
        self.persist(&state).await
    }

    async fn tv_links(&self, tv_id: TvId) -> Result<Vec<TemplateId>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .tv_links
            .iter()
            .filter(|l| l.tv_id == tv_id)
            .map(|l| l.template_id)
            .collect())
    }

    async fn upsert_value(
        &self,
        resource_id: ResourceId,
        tv_id: TvId,
        value: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .tv_values
            .iter_mut()
            .find(|v| v.resource_id == resource_id && v.tv_id == tv_id)
        {
            existing.value = value.to_string();
        } else {
            state.tv_values.push(TvValue {
                resource_id,
                tv_id,
                value: value.to_string(),
            });
        }
        self.persist(&state).await
    }

    async fn delete_values(&self, resource_id: ResourceId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.tv_values.retain(|v| v.resource_id != resource_id);
        self.persist(&state).await
    }

    async fn value(
        &self,
        resource_id: ResourceId,
        tv_id: TvId,
    ) -> Result<Option<String>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .tv_values
            .iter()
            .find(|v| v.resource_id == resource_id && v.tv_id == tv_id)
            .map(|v| v.value.clone()))
    }
}

#[async_trait]
impl UserStore for JsonStore {
    async fn find_user(&self, username: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, username: &str) -> Result<User, StoreError> {
        let mut state = self.state.write().await;
        if state.users.iter().any(|u| u.username == username) {
            return Err(StoreError::Backend(format!(
                "user '{username}' already exists"
            )));
        }
        let user = User {
            id: next_id(&state.users, |u| u.id),
            username: username.to_string(),
        };
        state.users.push(user.clone());
        self.persist(&state).await?;
        Ok(user)
    }

    async fn create_profile(&self, profile: UserProfile) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.profiles.retain(|p| p.user_id != profile.user_id);
        state.profiles.push(profile);
        self.persist(&state).await
    }

    async fn delete_user(&self, username: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let Some(user_id) = state
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.id)
        else {
            return Ok(());
        };
        state.users.retain(|u| u.id != user_id);
        state.profiles.retain(|p| p.user_id != user_id);
        self.persist(&state).await
    }
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
