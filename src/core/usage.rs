//! Request and token usage tracking

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Counters collected over one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Every completion attempt
    pub requests: usize,
    /// Attempts that returned an error
    pub failed_requests: usize,
    /// Waits after a rate-limit response
    pub rate_limit_retries: usize,
    /// Retries with the simplified prompt
    pub content_policy_fallbacks: usize,
    /// Calls that gave up and handed back their input
    pub degraded: usize,
    /// Tokens reported across successful requests
    pub total_tokens: usize,
    /// When tracking started
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl UsageStats {
    /// Zeroed counters starting now
    pub fn new() -> Self {
        Self {
            requests: 0,
            failed_requests: 0,
            rate_limit_retries: 0,
            content_policy_fallbacks: 0,
            degraded: 0,
            total_tokens: 0,
            started_at: chrono::Utc::now(),
        }
    }

    /// Time since tracking started
    pub fn elapsed(&self) -> chrono::Duration {
        chrono::Utc::now() - self.started_at
    }
}

impl Default for UsageStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared usage counters
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    usage: Arc<RwLock<UsageStats>>,
}

impl UsageTracker {
    /// Create a new tracker starting now
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed request
    pub async fn record_success(&self, tokens: Option<usize>) {
        let mut usage = self.usage.write().await;
        usage.requests += 1;
        if let Some(tokens) = tokens {
            usage.total_tokens += tokens;
            debug!("Used {} tokens, total: {}", tokens, usage.total_tokens);
        }
    }

    /// Record a failed request
    pub async fn record_failure(&self) {
        let mut usage = self.usage.write().await;
        usage.requests += 1;
        usage.failed_requests += 1;
    }

    /// Record a rate-limit wait
    pub async fn record_rate_limit_retry(&self) {
        self.usage.write().await.rate_limit_retries += 1;
    }

    /// Record a simplified-prompt retry
    pub async fn record_content_policy_fallback(&self) {
        self.usage.write().await.content_policy_fallbacks += 1;
    }

    /// Record a call that handed back its input
    pub async fn record_degraded(&self) {
        self.usage.write().await.degraded += 1;
    }

    /// Get current usage statistics
    pub async fn get_stats(&self) -> UsageStats {
        self.usage.read().await.clone()
    }

    /// Log a one-line summary
    pub async fn log_summary(&self) {
        let usage = self.usage.read().await;
        info!(
            "Requests: {} ({} failed, {} rate-limit retries, {} content-policy fallbacks, {} degraded), tokens: {}, elapsed: {}s",
            usage.requests,
            usage.failed_requests,
            usage.rate_limit_retries,
            usage.content_policy_fallbacks,
            usage.degraded,
            usage.total_tokens,
            usage.elapsed().num_seconds()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_usage_tracker() {
        let tracker = UsageTracker::new();

        tracker.record_success(Some(120)).await;
        tracker.record_success(None).await;
        tracker.record_failure().await;
        tracker.record_rate_limit_retry().await;
        tracker.record_degraded().await;

        let stats = tracker.get_stats().await;
        assert_eq!(stats.requests, 3);
        assert_eq!(stats.failed_requests, 1);
        assert_eq!(stats.total_tokens, 120);
        assert_eq!(stats.rate_limit_retries, 1);
        assert_eq!(stats.degraded, 1);
        assert_eq!(stats.content_policy_fallbacks, 0);
    }

    #[tokio::test]
    async fn test_clones_share_counters() {
        let tracker = UsageTracker::new();
        let clone = tracker.clone();
        clone.record_content_policy_fallback().await;
        assert_eq!(tracker.get_stats().await.content_policy_fallbacks, 1);
    }
}
