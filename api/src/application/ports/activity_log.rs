use async_trait::async_trait;

use crate::domain::activity::ActivityEntry;

#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn append(&self, entry: &ActivityEntry) -> anyhow::Result<()>;
}
