use async_trait::async_trait;

use crate::application::ports::activity_log::ActivityLog;
use crate::domain::activity::ActivityEntry;
use crate::infrastructure::db::PgPool;
use crate::infrastructure::db::resilience::{RetryPolicy, run};

pub struct SqlxActivityLog {
    pub pool: PgPool,
    pub retry: RetryPolicy,
}

impl SqlxActivityLog {
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }
}

#[async_trait]
impl ActivityLog for SqlxActivityLog {
    async fn append(&self, entry: &ActivityEntry) -> anyhow::Result<()> {
        let pool = &self.pool;
        run(&self.retry, "activity_logs.append", move || {
            sqlx::query(
                r#"INSERT INTO activity_logs (user_id, action, details, ip_address, user_agent)
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(entry.user_id)
            .bind(entry.action.as_str())
            .bind(&entry.details)
            .bind(entry.meta.ip_address.as_deref())
            .bind(entry.meta.user_agent.as_deref())
            .execute(pool)
        })
        .await?;
        Ok(())
    }
}
