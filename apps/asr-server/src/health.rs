use crate::Config;
use anyhow::{bail, Result};
use std::time::Duration;

/// Probe the running server's `/health` endpoint (container health checks)
pub async fn perform_health_check(config: &Config) -> Result<()> {
	let url = format!("http://{}/health", config.probe_addr());

	let response = reqwest::Client::new().get(&url).timeout(Duration::from_secs(10)).send().await?;

	if !response.status().is_success() {
		bail!("Health check failed: HTTP {}", response.status());
	}

	println!("Health check passed");
	Ok(())
}
