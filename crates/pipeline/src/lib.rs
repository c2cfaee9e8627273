//! Relay run orchestration.
//!
//! [`Orchestrator`] drives one run end to end (checkpoint read, fetch,
//! filter, deliver, commit or rollback), reports the result and sends the
//! daily digest when it is due. It is the only component that writes the
//! checkpoint.

pub mod orchestrator;

pub use orchestrator::{Orchestrator, RunSettings, MAX_BATCH_SIZE};
