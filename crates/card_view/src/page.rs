use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone, Error)]
pub enum ContainerError {
    #[error("container '{0}' does not exist in the page")]
    NotFound(String),
}

/// The page collaborator that owns the regions renders write into. The
/// pipeline never creates or destroys containers, it only replaces their
/// content wholesale.
#[async_trait]
pub trait ContainerHost: Send + Sync {
    async fn contains(&self, container_id: &str) -> bool;

    /// Replace the container's entire content. One call is atomic with
    /// respect to other writers of the same container, so two concurrent
    /// loads can never interleave fragments; the last commit wins whole.
    async fn replace_content(&self, container_id: &str, html: String)
        -> Result<(), ContainerError>;

    async fn content(&self, container_id: &str) -> Result<String, ContainerError>;
}

/// In-process page: a set of named containers owned by the surrounding
/// application, one lock per container.
pub struct InMemoryPage {
    containers: RwLock<HashMap<String, Arc<Mutex<String>>>>,
}

impl InMemoryPage {
    pub fn new() -> Self {
        Self {
            containers: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_containers<I, S>(container_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let containers = container_ids
            .into_iter()
            .map(|id| (id.into(), Arc::new(Mutex::new(String::new()))))
            .collect();
        Self {
            containers: RwLock::new(containers),
        }
    }

    /// Page-owner operation; the render pipeline itself never calls this.
    pub async fn add_container(&self, container_id: impl Into<String>) {
        self.containers
            .write()
            .await
            .entry(container_id.into())
            .or_insert_with(|| Arc::new(Mutex::new(String::new())));
    }

    async fn slot(&self, container_id: &str) -> Option<Arc<Mutex<String>>> {
        self.containers.read().await.get(container_id).cloned()
    }
}

impl Default for InMemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerHost for InMemoryPage {
    async fn contains(&self, container_id: &str) -> bool {
        self.containers.read().await.contains_key(container_id)
    }

    async fn replace_content(
        &self,
        container_id: &str,
        html: String,
    ) -> Result<(), ContainerError> {
        let slot = self
            .slot(container_id)
            .await
            .ok_or_else(|| ContainerError::NotFound(container_id.to_string()))?;
        *slot.lock().await = html;
        Ok(())
    }

    async fn content(&self, container_id: &str) -> Result<String, ContainerError> {
        let slot = self
            .slot(container_id)
            .await
            .ok_or_else(|| ContainerError::NotFound(container_id.to_string()))?;
        let content = slot.lock().await.clone();
        Ok(content)
    }
}
