//! Fetches configured URLs, matches each body against a pattern and sends an
//! SMS through Twilio when the configured alert condition holds.
//!
//! A run is single-shot: [`worker::monitor_targets`] checks every target
//! concurrently and returns once all of them finished. Scheduling repeated
//! runs is left to cron or a systemd timer.

pub mod config;
pub mod error;
pub mod notifier;
pub mod worker;

pub use config::{AlertCondition, MonitorTarget, NotificationConfig, RootConfig};
pub use error::Error;
pub use worker::{CheckOutcome, DispatchSummary, monitor_targets};
