//! Backend health preflight.
//!
//! A cold backend makes every login time out, so the runner checks
//! `/actuator/health` before opening a browser.

use std::time::Duration;

use serde::Deserialize;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Body of `GET /actuator/health`
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_up(&self) -> bool {
        self.status.eq_ignore_ascii_case("UP")
    }
}

/// Poll the backend until it reports `UP` or `timeout_duration` elapses
pub async fn wait_for_backend(api_url: &str, timeout_duration: Duration) -> E2eResult<()> {
    let health_url = format!("{}/actuator/health", api_url.trim_end_matches('/'));
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()?;

    let start = tokio::time::Instant::now();
    let mut attempts = 0;

    while start.elapsed() < timeout_duration {
        attempts += 1;

        match client.get(&health_url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<HealthStatus>().await {
                Ok(health) if health.is_up() => {
                    info!("Backend is healthy at {}", api_url);
                    return Ok(());
                }
                Ok(health) => warn!("Backend status is {}", health.status),
                Err(e) => warn!("Unreadable health response: {}", e),
            },
            Ok(resp) => {
                warn!("Health check returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for backend at {}...", api_url);
                }
                // Connection refused is expected while the backend starts
                if !e.is_connect() {
                    warn!("Health check error: {}", e);
                }
            }
        }

        sleep(Duration::from_millis(500)).await;
    }

    Err(E2eError::HealthCheck(attempts))
}
