//! Single-runner guard around the orchestrator.

use logrelay_core::RunResult;
use logrelay_pipeline::Orchestrator;
use tokio::sync::Mutex;

/// Owns the orchestrator and admits one run at a time per process.
pub struct Relay {
    orchestrator: Orchestrator,
    running: Mutex<()>,
}

impl Relay {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            running: Mutex::new(()),
        }
    }

    /// Runs now, or returns `None` when a run is already executing.
    pub async fn try_run(&self) -> Option<RunResult> {
        let _guard = self.running.try_lock().ok()?;
        Some(self.orchestrator.run().await)
    }

    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }
}
