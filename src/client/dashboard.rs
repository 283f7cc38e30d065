//! Dashboard controller: relays start/stop and keeps the view fresh.
//!
//! Control commands never change the believed bot state themselves; a
//! successful command only triggers an immediate status refresh. Polls run
//! as independent tasks so a hung request never stalls the timer, and the
//! ticket check in `ClientState` decides which result reaches the view.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::render::{render_summary, render_trade_rows};
use super::state::{ClientState, PollOutcome};
use super::view::DashboardView;
use super::BotApi;
use crate::types::{Command, DashboardError, Mode, Result, StartRequest};

#[derive(Clone)]
pub struct Dashboard {
    api: Arc<dyn BotApi>,
    view: Arc<dyn DashboardView>,
    state: Arc<Mutex<ClientState>>,
    stale_after: chrono::Duration,
}

impl Dashboard {
    pub fn new(
        api: Arc<dyn BotApi>,
        view: Arc<dyn DashboardView>,
        stale_after: Duration,
    ) -> Self {
        let stale_after = chrono::Duration::from_std(stale_after)
            .unwrap_or_else(|_| chrono::Duration::seconds(15));
        Self {
            api,
            view,
            state: Arc::new(Mutex::new(ClientState::new())),
            stale_after,
        }
    }

    /// Snapshot of the client-side state.
    pub fn snapshot(&self) -> ClientState {
        self.lock_state().clone()
    }

    // The state is never left half-updated, so a poisoned lock is still usable.
    fn lock_state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Ask the bot to start. On success, refresh immediately.
    pub async fn start(&self, mode: Mode, config_path: Option<&str>) -> Result<PollOutcome> {
        let request = StartRequest::new(mode, config_path);
        match self.api.start(&request).await {
            Ok(ack) => {
                info!(mode = %mode, ack = %ack.status, "Start command accepted");
                Ok(self.refresh_status().await)
            }
            Err(e) => {
                self.report_control_failure(Command::Start, &e);
                Err(e)
            }
        }
    }

    /// Ask the bot to stop. On success, refresh immediately.
    pub async fn stop(&self) -> Result<PollOutcome> {
        match self.api.stop().await {
            Ok(ack) => {
                info!(ack = %ack.status, "Stop command accepted");
                Ok(self.refresh_status().await)
            }
            Err(e) => {
                self.report_control_failure(Command::Stop, &e);
                Err(e)
            }
        }
    }

    fn report_control_failure(&self, command: Command, error: &DashboardError) {
        warn!(%command, error = %error, "Control command failed");
        self.view.notify_failure(&format!("Failed to {command} bot"));
    }

    /// Fetch the current status and redraw if this poll is still the newest.
    pub async fn refresh_status(&self) -> PollOutcome {
        let ticket = self.lock_state().begin_poll();
        debug!(seq = ticket.seq, "Polling status");

        match self.api.status().await {
            Ok(status) => {
                let mut state = self.lock_state();
                let summary = render_summary(&status);
                let rows = render_trade_rows(status.trades());
                let outcome = state.complete_poll(ticket, status);
                match outcome {
                    // Drawn under the lock so two applied polls cannot paint out of order.
                    PollOutcome::Applied => self.view.show_status(&summary, &rows),
                    _ => debug!(seq = ticket.seq, "Discarding superseded status"),
                }
                outcome
            }
            Err(e) => {
                warn!(seq = ticket.seq, error = %e, "Status poll failed; keeping last data");
                let mut state = self.lock_state();
                let outcome = state.fail_poll(ticket, e.to_string());
                if outcome == PollOutcome::Failed {
                    self.view.show_stale(state.last_success(), state.last_error());
                }
                outcome
            }
        }
    }

    /// Flag old data even when polls hang instead of failing.
    pub fn check_staleness(&self) -> bool {
        let state = self.lock_state();
        let stale = state.last_error().is_none()
            && state.is_stale(Utc::now(), self.stale_after);
        if stale {
            self.view.show_stale(state.last_success(), None);
        }
        stale
    }

    /// Poll once now, then every `every`, until `shutdown` resolves.
    /// Polls still in flight at shutdown are aborted.
    pub async fn run<F>(&self, every: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls = JoinSet::new();
        tokio::pin!(shutdown);

        info!(interval_secs = every.as_secs(), "Status polling started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.check_staleness();
                    let dashboard = self.clone();
                    polls.spawn(async move {
                        dashboard.refresh_status().await;
                    });
                }
                Some(joined) = polls.join_next(), if !polls.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "Status poll task panicked");
                    }
                }
                _ = &mut shutdown => {
                    break;
                }
            }
        }

        if !polls.is_empty() {
            debug!(pending = polls.len(), "Aborting in-flight polls");
        }
        polls.shutdown().await;
        info!("Status polling stopped");
    }
}
