//! Log relay service: configuration, HTTP trigger surface and scheduler.

pub mod app;
pub mod config;
pub mod relay;
pub mod router;
pub mod scheduler;
pub mod telemetry;

pub use config::RelayConfig;
pub use relay::Relay;
pub use router::{router, AppState};
pub use scheduler::RunScheduler;
