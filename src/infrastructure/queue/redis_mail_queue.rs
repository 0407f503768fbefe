use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::domain::billing::{BillingError, MailJob, ports::MailQueue};

/// Redis-backed mail queue. Jobs are pushed as JSON onto a list; a separate
/// mail worker owns delivery, templating and retry policy. The core's
/// contract ends once the job is on the list.
pub struct RedisMailQueue {
  redis: ConnectionManager,
  queue_key: String,
}

impl RedisMailQueue {
  pub fn new(redis: ConnectionManager, queue_key: String) -> Self {
    Self { redis, queue_key }
  }
}

#[async_trait]
impl MailQueue for RedisMailQueue {
  async fn enqueue(&self, job: MailJob) -> Result<(), BillingError> {
    let payload = serde_json::to_string(&job)
      .map_err(|e| BillingError::Internal(format!("Failed to serialize mail job: {}", e)))?;

    let mut conn = self.redis.clone();
    let queued: i64 = conn
      .lpush(&self.queue_key, payload)
      .await
      .map_err(|e| BillingError::Internal(format!("Failed to enqueue mail job: {}", e)))?;

    tracing::debug!(
      to = %job.to,
      template = %job.template,
      queue_depth = queued,
      "Mail job enqueued"
    );

    Ok(())
  }
}
