//! `dermascan health`

use anyhow::Result;

use super::common::print_json;
use crate::cli::labels;
use crate::{Config, ConnectionMonitor, ConnectionState, DermaError, from_config};

pub async fn execute_health_command(config: &Config, json: bool) -> Result<()> {
    let gateways = from_config(config).map_err(DermaError::from)?;
    let monitor = ConnectionMonitor::new(gateways.health_primary, gateways.health_fallback);
    let check = monitor.check_detailed().await;

    if json {
        print_json(&check)?;
    } else if let Some(report) = &check.report {
        println!("✓ {} ({})", labels::connection_state(check.state), report.endpoint);
        if let Some(status) = &report.status {
            println!("  Server status: {status}");
        }
        match report.model_loaded {
            Some(true) => println!("  Model loaded: yes"),
            Some(false) => println!("  Model loaded: no"),
            None => {}
        }
    } else {
        println!("✗ {}", labels::connection_state(check.state));
        for failure in &check.failures {
            println!("  - {failure}");
        }
    }

    if check.state != ConnectionState::Connected {
        return Err(DermaError::Connection(check.failures.join("; ")).into());
    }
    Ok(())
}
