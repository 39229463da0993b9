use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("failed-job ledger unavailable: {0}")]
    Backend(#[from] redis::RedisError),
}

/// Failed jobs per check suite, so one status message can list all of them.
#[async_trait]
pub trait FailedJobLedger: Send + Sync {
    /// Adds `entry` to the suite's set and returns the whole set, sorted.
    async fn record(&self, suite_id: u64, entry: &str) -> Result<Vec<String>, LedgerError>;
}

/// How long a suite's failed-job set outlives its last failure.
pub const FAILED_JOB_TTL: Duration = Duration::from_secs(48 * 60 * 60);

pub fn failed_set_key(suite_id: u64) -> String {
    format!("github:suite:{suite_id}:failed")
}

pub fn status_message_key(suite_id: u64) -> String {
    format!("github:suite:{suite_id}:msg")
}

pub struct RedisFailedJobLedger {
    connection: ConnectionManager,
    ttl: Duration,
}

impl RedisFailedJobLedger {
    pub fn new(connection: ConnectionManager, ttl: Duration) -> Self {
        Self { connection, ttl }
    }
}

#[async_trait]
impl FailedJobLedger for RedisFailedJobLedger {
    async fn record(&self, suite_id: u64, entry: &str) -> Result<Vec<String>, LedgerError> {
        let key = failed_set_key(suite_id);
        let mut conn = self.connection.clone();
        conn.sadd::<_, _, ()>(&key, entry).await?;
        let seconds = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        conn.expire::<_, ()>(&key, seconds).await?;
        let mut members: Vec<String> = conn.smembers(&key).await?;
        members.sort();
        Ok(members)
    }
}

/// Process-local ledger. Entries do not expire.
#[derive(Default)]
pub struct InMemoryFailedJobLedger {
    suites: DashMap<u64, BTreeSet<String>>,
}

impl InMemoryFailedJobLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FailedJobLedger for InMemoryFailedJobLedger {
    async fn record(&self, suite_id: u64, entry: &str) -> Result<Vec<String>, LedgerError> {
        let mut set = self.suites.entry(suite_id).or_default();
        set.insert(entry.to_string());
        Ok(set.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_ledger_deduplicates_and_sorts() {
        let ledger = InMemoryFailedJobLedger::new();
        ledger.record(1, "b").await.unwrap();
        ledger.record(1, "a").await.unwrap();
        let all = ledger.record(1, "b").await.unwrap();
        assert_eq!(all, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(ledger.record(2, "c").await.unwrap(), vec!["c".to_string()]);
    }

    #[test]
    fn keys_follow_the_suite_namespace() {
        assert_eq!(failed_set_key(42), "github:suite:42:failed");
        assert_eq!(status_message_key(42), "github:suite:42:msg");
    }

    #[test]
    fn failed_jobs_are_kept_for_two_days() {
        assert_eq!(FAILED_JOB_TTL.as_secs(), 172_800);
    }
}
