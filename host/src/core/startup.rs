//! Worker startup sequencing

use crate::error::HostError;
use crate::traits::ProcessManager;
use shared::logging::log_error;
use shared::{process_info, process_warn, Component};

#[derive(Debug, Default)]
pub struct StartupReport {
    pub started: Vec<String>,
    /// Running, but the readiness rule was not met
    pub degraded: Vec<String>,
    pub failed: Vec<(String, HostError)>,
}

impl StartupReport {
    pub fn all_ready(&self) -> bool {
        self.degraded.is_empty() && self.failed.is_empty()
    }
}

/// Start each worker in order, waiting for readiness before moving on.
///
/// A failing worker is recorded and skipped; later workers still start.
pub async fn start_in_order<P>(supervisor: &P) -> StartupReport
where
    P: ProcessManager + ?Sized,
{
    let mut report = StartupReport::default();

    for name in supervisor.worker_names() {
        if let Err(e) = supervisor.start(&name).await {
            log_error(&Component::Supervisor, &format!("Starting {name}"), &e);
            report.failed.push((name, e));
            continue;
        }

        match supervisor.wait_ready(&name).await {
            Ok(()) => {
                process_info!(Component::Supervisor, "✅ {} ready", name);
                report.started.push(name);
            }
            Err(e @ HostError::DegradedStart { .. }) => {
                process_warn!(Component::Supervisor, "⚠️ {}", e);
                report.degraded.push(name);
            }
            Err(e) => {
                log_error(&Component::Supervisor, &format!("Waiting for {name}"), &e);
                report.failed.push((name, e));
            }
        }
    }

    report
}
