//! Pre-flight connectivity gate.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use dermascan_gateway::{HealthGateway, HealthReport};

/// Last evaluated reachability of the analysis server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Checking,
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checking => write!(f, "checking"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Detailed result of one check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCheck {
    pub state: ConnectionState,
    /// Report of the endpoint that answered, if any
    pub report: Option<HealthReport>,
    /// One entry per endpoint that failed, in probe order
    pub failures: Vec<String>,
}

/// Probes the primary health endpoint, then at most one fallback.
///
/// Never fails: every gateway error maps to `Disconnected`.
pub struct ConnectionMonitor {
    primary: Arc<dyn HealthGateway>,
    fallback: Option<Arc<dyn HealthGateway>>,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionMonitor {
    pub fn new(primary: Arc<dyn HealthGateway>, fallback: Option<Arc<dyn HealthGateway>>) -> Self {
        let (state_tx, _rx) = watch::channel(ConnectionState::Checking);
        Self {
            primary,
            fallback,
            state_tx,
        }
    }

    /// `Checking` until the first check completes and while one is in flight.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub async fn check(&self) -> ConnectionState {
        self.check_detailed().await.state
    }

    /// Re-run the same check after a failure.
    pub async fn retry(&self) -> ConnectionState {
        self.check().await
    }

    pub async fn check_detailed(&self) -> HealthCheck {
        self.state_tx.send_replace(ConnectionState::Checking);

        let mut failures = Vec::new();
        let probes = std::iter::once(&self.primary).chain(self.fallback.as_ref());

        for gateway in probes {
            debug!(endpoint = %gateway.endpoint(), "Probing health endpoint");
            match gateway.check().await {
                Ok(report) => {
                    info!(endpoint = %gateway.endpoint(), "Analysis server reachable");
                    self.state_tx.send_replace(ConnectionState::Connected);
                    return HealthCheck {
                        state: ConnectionState::Connected,
                        report: Some(report),
                        failures,
                    };
                }
                Err(e) => {
                    warn!(endpoint = %gateway.endpoint(), error = %e, "Health probe failed");
                    failures.push(format!("{}: {}", gateway.endpoint(), e.message()));
                }
            }
        }

        self.state_tx.send_replace(ConnectionState::Disconnected);
        HealthCheck {
            state: ConnectionState::Disconnected,
            report: None,
            failures,
        }
    }
}
