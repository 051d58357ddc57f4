use crate::config::RetryConfig;
use crate::error::StatusError;
use std::time::Duration;
use tracing::{error, info, warn};

/// Recovery action to take after a failed poll
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryAction {
    /// Retry after a delay
    RetryAfterDelay(Duration),
    /// Give up and surface the error
    Abort,
}

/// Retry policy for status polls made while watching
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of consecutive retries
    pub max_retries: u32,
    /// Base delay for exponential backoff
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Whether to use exponential backoff
    pub exponential_backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            exponential_backoff: true,
        }
    }
}

impl RetryPolicy {
    /// Every failure is fatal
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            exponential_backoff: config.exponential_backoff,
        }
    }

    /// Delay before retry number `retry_count` (zero based)
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        if !self.exponential_backoff {
            return self.base_delay.min(self.max_delay);
        }

        let factor = 2_u32.checked_pow(retry_count).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Tracks consecutive poll failures against a retry policy
pub struct FetchRecovery {
    policy: RetryPolicy,
    retry_count: u32,
}

impl FetchRecovery {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            retry_count: 0,
        }
    }

    /// Determine recovery action for a failed poll
    pub fn handle_error(&mut self, error: &StatusError) -> RecoveryAction {
        if !error.is_retryable() {
            error!("Non-retryable status error: {}", error);
            return RecoveryAction::Abort;
        }

        if self.retry_count >= self.policy.max_retries {
            error!(
                "Maximum retries ({}) exceeded for status polling: {}",
                self.policy.max_retries, error
            );
            return RecoveryAction::Abort;
        }

        let delay = self.policy.delay_for(self.retry_count);
        self.retry_count += 1;

        warn!(
            "Status poll failed (attempt {}/{}), retrying in {:?}: {}",
            self.retry_count, self.policy.max_retries, delay, error
        );

        RecoveryAction::RetryAfterDelay(delay)
    }

    /// Reset retry count after a successful poll
    pub fn reset(&mut self) {
        if self.retry_count > 0 {
            info!(
                "Status polling recovered after {} retries",
                self.retry_count
            );
        }
        self.retry_count = 0;
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient() -> StatusError {
        StatusError::Api {
            status: 503,
            message: "unavailable".to_string(),
        }
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            exponential_backoff: true,
        };

        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(4), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(40), Duration::from_millis(1000));
    }

    #[test]
    fn test_fixed_delay() {
        let policy = RetryPolicy {
            exponential_backoff: false,
            base_delay: Duration::from_millis(250),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(250));
        assert_eq!(policy.delay_for(5), Duration::from_millis(250));
    }

    #[test]
    fn test_retries_until_limit_then_aborts() {
        let mut recovery = FetchRecovery::new(RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            exponential_backoff: true,
        });

        assert_eq!(
            recovery.handle_error(&transient()),
            RecoveryAction::RetryAfterDelay(Duration::from_millis(10))
        );
        assert_eq!(
            recovery.handle_error(&transient()),
            RecoveryAction::RetryAfterDelay(Duration::from_millis(20))
        );
        assert_eq!(recovery.handle_error(&transient()), RecoveryAction::Abort);
        assert_eq!(recovery.retry_count(), 2);

        recovery.reset();
        assert_eq!(recovery.retry_count(), 0);
        assert!(matches!(
            recovery.handle_error(&transient()),
            RecoveryAction::RetryAfterDelay(_)
        ));
    }

    #[test]
    fn test_non_retryable_error_aborts_immediately() {
        let mut recovery = FetchRecovery::new(RetryPolicy::default());
        let error = StatusError::Api {
            status: 401,
            message: "Unauthorized".to_string(),
        };
        assert_eq!(recovery.handle_error(&error), RecoveryAction::Abort);
        assert_eq!(recovery.retry_count(), 0);
    }

    #[test]
    fn test_no_retry_policy_is_fatal() {
        let mut recovery = FetchRecovery::new(RetryPolicy::none());
        assert_eq!(recovery.handle_error(&transient()), RecoveryAction::Abort);
    }

    #[test]
    fn test_policy_from_config() {
        let config = RetryConfig {
            max_retries: 5,
            base_delay_ms: 200,
            max_delay_ms: 2000,
            exponential_backoff: false,
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(200));
        assert_eq!(policy.max_delay, Duration::from_millis(2000));
        assert!(!policy.exponential_backoff);
    }
}
