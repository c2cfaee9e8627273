//! Outbound channels: the webhook sink that receives log entries and the
//! Slack channel that receives run reports.

pub mod dispatch;
pub mod slack;
pub mod webhook;
