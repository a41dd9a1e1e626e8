//! Shared fixtures for in-memory integration tests.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use skillnest::marketplace::{
    adapters::memory::InMemoryMarketplaceStore,
    domain::TaskId,
    services::{BidWorkflow, CreateTaskRequest, TaskCatalogService},
};

/// Services wired over one fresh store.
pub struct Marketplace {
    /// Bid workflow over the store.
    pub workflow: BidWorkflow<InMemoryMarketplaceStore, DefaultClock>,
    /// Task catalog over the store.
    pub catalog: TaskCatalogService<InMemoryMarketplaceStore, DefaultClock>,
}

impl Marketplace {
    /// Posts an open task for `client-1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the task cannot be created.
    pub async fn post_task(&self, title: &str) -> eyre::Result<TaskId> {
        let task = self
            .catalog
            .create_task(CreateTaskRequest::new("client-1", title).with_budget(1_000))
            .await?;
        Ok(task.id())
    }
}

/// Provides services over a fresh in-memory store.
#[fixture]
pub fn marketplace() -> Marketplace {
    let store = Arc::new(InMemoryMarketplaceStore::new());
    let clock = Arc::new(DefaultClock);
    Marketplace {
        workflow: BidWorkflow::new(Arc::clone(&store), Arc::clone(&clock)),
        catalog: TaskCatalogService::new(store, clock),
    }
}
