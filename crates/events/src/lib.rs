//! Outbound side of the log relay.
//!
//! - [`Deliverer`] -- pushes filtered entries to the webhook sink, as one
//!   batch or as a bounded, fail-fast fan-out.
//! - [`HttpWebhookSink`] -- the HTTP [`WebhookSink`].
//! - [`Reporter`] -- run and digest notifications ([`SlackReporter`],
//!   [`TracingReporter`]).
//! - [`DigestSchedule`] / [`DigestReport`] -- once-a-day digest gating and
//!   aggregation over the run history.

pub mod delivery;
pub mod digest;
pub mod reporter;

pub use delivery::dispatch::{Deliverer, DeliveryMode, DEFAULT_CONCURRENCY, MAX_CONCURRENCY};
pub use delivery::slack::SlackReporter;
pub use delivery::webhook::{HttpWebhookSink, WebhookSink};
pub use digest::{DigestReport, DigestSchedule};
pub use reporter::{ReportError, Reporter, TracingReporter};
