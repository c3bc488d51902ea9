use crate::config::ProbePolicy;
use crate::db::DatabaseClient;
use tracing::{error, info, warn};

/// Wait until the server accepts a connection.
///
/// Tries up to `policy.max_attempts` times, sleeping `policy.delay` after
/// every failed attempt. Returns `false` once attempts are exhausted; the
/// caller skips the cycle rather than treating this as fatal.
pub async fn wait_for_database(client: &dyn DatabaseClient, policy: &ProbePolicy) -> bool {
    info!("Waiting for database connection...");

    for attempt in 1..=policy.max_attempts {
        match client.ping().await {
            Ok(()) => {
                info!(attempt, "Database connection established");
                return true;
            }
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "Database connection attempt {}/{} failed",
                    attempt,
                    policy.max_attempts
                );
                tokio::time::sleep(policy.delay).await;
            }
        }
    }

    error!("Database not available after {} attempts", policy.max_attempts);
    false
}
