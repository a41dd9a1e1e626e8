//! Shared fixtures for marketplace unit tests.

use std::sync::Arc;

use crate::marketplace::{
    adapters::memory::InMemoryMarketplaceStore,
    domain::{Task, TaskId},
    services::{BidWorkflow, CreateTaskRequest, TaskCatalogService},
};
use mockable::DefaultClock;
use rstest::fixture;

pub type TestWorkflow = BidWorkflow<InMemoryMarketplaceStore, DefaultClock>;
pub type TestCatalog = TaskCatalogService<InMemoryMarketplaceStore, DefaultClock>;

/// Workflow and catalog sharing one in-memory store.
pub struct Marketplace {
    pub store: Arc<InMemoryMarketplaceStore>,
    pub workflow: TestWorkflow,
    pub catalog: TestCatalog,
}

impl Marketplace {
    pub async fn post_task(&self, title: &str) -> eyre::Result<TaskId> {
        let task = self
            .catalog
            .create_task(CreateTaskRequest::new("client-1", title).with_budget(500))
            .await?;
        Ok(task.id())
    }

    pub async fn task(&self, task_id: TaskId) -> eyre::Result<Task> {
        Ok(self.catalog.get_task(task_id).await?)
    }
}

#[fixture]
pub fn marketplace() -> Marketplace {
    let store = Arc::new(InMemoryMarketplaceStore::new());
    let clock = Arc::new(DefaultClock);
    Marketplace {
        workflow: BidWorkflow::new(Arc::clone(&store), Arc::clone(&clock)),
        catalog: TaskCatalogService::new(Arc::clone(&store), clock),
        store,
    }
}
