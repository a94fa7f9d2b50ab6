use log::{debug, error, info, warn};
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use url::Url;

use crate::config::{MonitorTarget, NotificationConfig, RootConfig};
use crate::error::Error;
use crate::notifier::{Notifier, alert_message};

/// What a single check ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The alert condition held and a notification was attempted.
    Alerted,
    /// The alert condition did not hold.
    Clear,
    /// The check could not complete; the cause was logged.
    Skipped,
}

/// Tally of one run, returned once every check has joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub checked: usize,
    pub alerted: usize,
    pub clear: usize,
    pub skipped: usize,
}

impl DispatchSummary {
    fn record(&mut self, outcome: CheckOutcome) {
        self.checked += 1;
        match outcome {
            CheckOutcome::Alerted => self.alerted += 1,
            CheckOutcome::Clear => self.clear += 1,
            CheckOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Builds the HTTP client shared by every check and notification of a run.
///
/// # Errors
///
/// Fails if the TLS backend cannot be initialised.
pub fn build_client() -> Result<Client, Error> {
    Ok(Client::builder()
        .user_agent(concat!("url-monitor/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Checks every configured target concurrently and waits for all of them.
///
/// One task is spawned per target. A failing or panicking task never
/// affects its siblings; its outcome is counted as skipped.
pub async fn monitor_targets(config: RootConfig, client: Client) -> DispatchSummary {
    let config = Arc::new(config);
    let notifier = Notifier::new(client.clone());
    let tracker = TaskTracker::new();
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();

    info!("Checking {} URLs...", config.urls.len());

    for index in 0..config.urls.len() {
        let config = Arc::clone(&config);
        let client = client.clone();
        let notifier = notifier.clone();
        let outcome_tx = outcome_tx.clone();
        tracker.spawn(async move {
            let outcome = run_check(&client, &notifier, &config.urls[index], &config.twilio).await;
            // The receiver outlives every task
            let _ = outcome_tx.send(outcome);
        });
    }
    drop(outcome_tx);

    tracker.close();
    tracker.wait().await;

    let mut summary = DispatchSummary::default();
    while let Ok(outcome) = outcome_rx.try_recv() {
        summary.record(outcome);
    }

    let unfinished = config.urls.len() - summary.checked;
    if unfinished > 0 {
        error!("{unfinished} checks did not complete");
        for _ in 0..unfinished {
            summary.record(CheckOutcome::Skipped);
        }
    }

    info!(
        "Checked {} URLs: {} alerted, {} clear, {} skipped",
        summary.checked, summary.alerted, summary.clear, summary.skipped
    );
    summary
}

/// Runs one check and logs its failure instead of returning it.
pub async fn run_check(
    client: &Client,
    notifier: &Notifier,
    target: &MonitorTarget,
    twilio: &NotificationConfig,
) -> CheckOutcome {
    match check_target(client, notifier, target, twilio).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Error checking {}: {e}", target.url);
            CheckOutcome::Skipped
        }
    }
}

async fn check_target(
    client: &Client,
    notifier: &Notifier,
    target: &MonitorTarget,
    twilio: &NotificationConfig,
) -> Result<CheckOutcome, Error> {
    let body_matches = fetch_and_match(client, target).await?;
    debug!(
        "{}: pattern {} (alert if {})",
        target.url,
        if body_matches { "matched" } else { "not matched" },
        target.alert_if
    );

    if target.alert_if.is_triggered_by(body_matches) {
        warn!("{}: alert triggered for {}", target.url, target.description);
        notifier.notify(target, &alert_message(target), twilio).await;
        Ok(CheckOutcome::Alerted)
    } else {
        info!("{}: OK", target.url);
        Ok(CheckOutcome::Clear)
    }
}

/// Fetches the target once and reports whether its pattern occurs in the body.
async fn fetch_and_match(client: &Client, target: &MonitorTarget) -> Result<bool, Error> {
    let url = Url::parse(&target.url)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::UnsupportedScheme {
            description: target.description.clone(),
            scheme: url.scheme().to_string(),
        });
    }

    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        // The body of an error page is still matched against the pattern
        warn!("{}: responded with {status}", target.url);
    }

    let body = response.bytes().await?;
    Ok(target.pattern.is_match(&body))
}
