//! Backup domain fallback
//!
//! When the primary domain fails, the same request is retried against the next
//! one or two configured domains. The first success wins. If every attempt
//! fails, the primary's error is reported, since it describes the domain the
//! user configured first.
//!
//! Runs on a blocking worker thread, so pauses between attempts use
//! `std::thread::sleep`.
//!
//! # Example
//!
//! ```
//! use comic_dl::client::ClientError;
//! use comic_dl::config::RetryConfig;
//! use comic_dl::retry::with_domain_fallback;
//! use std::time::Duration;
//!
//! let domains = vec!["down.example".to_string(), "up.example".to_string()];
//! let config = RetryConfig { delay: Duration::ZERO, ..RetryConfig::default() };
//!
//! let (domain, pages) = with_domain_fallback(&domains, &config, |domain| {
//!     if domain == "down.example" {
//!         Err(ClientError::new("connection refused"))
//!     } else {
//!         Ok(12)
//!     }
//! })
//! .expect("at least one domain")
//! .unwrap();
//!
//! assert_eq!(domain, "up.example");
//! assert_eq!(pages, 12);
//! ```

use crate::client::ClientError;
use crate::config::RetryConfig;
use crate::error::FailureKind;
use rand::Rng;
use std::time::Duration;

/// Hard cap on alternates tried after the primary, regardless of configuration
pub const MAX_BACKUP_DOMAINS: usize = 2;

/// Trait for errors that can be classified as worth another domain or not
///
/// Site-side failures (timeouts, refused connections, unparseable pages) may
/// succeed on a mirror. Local failures (permissions, full disk) will not.
pub trait IsRetryable {
    /// Returns true if trying another domain might help
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for ClientError {
    fn is_retryable(&self) -> bool {
        !matches!(self.kind(), FailureKind::Permission | FailureKind::DiskSpace)
    }
}

/// All domains failed
#[derive(Debug)]
pub struct FallbackError<E> {
    /// The primary domain
    pub domain: String,
    /// The primary domain's error
    pub error: E,
    /// Number of domains attempted
    pub attempts: usize,
}

/// Primary domain followed by at most `min(max_backups, MAX_BACKUP_DOMAINS)` alternates
///
/// Blank entries and repeats are skipped.
pub fn domain_attempt_order(domains: &[String], max_backups: usize) -> Vec<String> {
    let limit = 1 + max_backups.min(MAX_BACKUP_DOMAINS);
    let mut order: Vec<String> = Vec::with_capacity(limit);

    for domain in domains {
        let domain = domain.trim();
        if domain.is_empty() || order.iter().any(|d| d == domain) {
            continue;
        }
        order.push(domain.to_string());
        if order.len() == limit {
            break;
        }
    }

    order
}

/// Run `attempt` against the primary domain, then against backup domains
///
/// Returns the domain that succeeded together with its result. Stops early on a
/// non-retryable error. An empty domain list yields `None`.
pub fn with_domain_fallback<T, E, F>(
    domains: &[String],
    config: &RetryConfig,
    mut attempt: F,
) -> Option<Result<(String, T), FallbackError<E>>>
where
    F: FnMut(&str) -> Result<T, E>,
    E: IsRetryable + std::fmt::Display,
{
    let order = domain_attempt_order(domains, config.max_backup_domains);
    let mut original: Option<(String, E)> = None;
    let mut attempts = 0;

    for (index, domain) in order.iter().enumerate() {
        if index > 0 && !config.delay.is_zero() {
            let delay = if config.jitter {
                add_jitter(config.delay)
            } else {
                config.delay
            };
            std::thread::sleep(delay);
        }

        attempts += 1;
        match attempt(domain) {
            Ok(value) => {
                if index > 0 {
                    tracing::info!(domain = %domain, attempts, "download succeeded on backup domain");
                }
                return Some(Ok((domain.clone(), value)));
            }
            Err(e) => {
                let retryable = e.is_retryable();
                tracing::warn!(
                    domain = %domain,
                    error = %e,
                    attempt = attempts,
                    max_attempts = order.len(),
                    retryable,
                    "download attempt failed"
                );
                if original.is_none() {
                    original = Some((domain.clone(), e));
                }
                if !retryable {
                    break;
                }
            }
        }
    }

    let (domain, error) = original?;
    tracing::error!(%domain, error = %error, attempts, "all download domains failed");
    Some(Err(FallbackError {
        domain,
        error,
        attempts,
    }))
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The result is uniformly distributed between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
