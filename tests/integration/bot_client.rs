//! Status client against a fake bot over real HTTP.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use botdash::client::dashboard::Dashboard;
use botdash::client::render::TradeRow;
use botdash::client::state::{BotBelief, PollOutcome};
use botdash::client::view::DashboardView;
use botdash::client::{BotApi, HttpBotClient};
use botdash::types::{BotStatus, CommandAck, DashboardError, Mode, Result, StartRequest};

use crate::support::{base_url, spawn_fake_bot};

#[derive(Default)]
struct RecordingView {
    statuses: Mutex<Vec<(String, Vec<TradeRow>)>>,
    failures: Mutex<Vec<String>>,
    stale: Mutex<Vec<Option<String>>>,
}

impl DashboardView for RecordingView {
    fn show_status(&self, summary: &str, rows: &[TradeRow]) {
        self.statuses
            .lock()
            .unwrap()
            .push((summary.to_string(), rows.to_vec()));
    }

    fn notify_failure(&self, message: &str) {
        self.failures.lock().unwrap().push(message.to_string());
    }

    fn show_stale(&self, _last_success: Option<DateTime<Utc>>, error: Option<&str>) {
        self.stale.lock().unwrap().push(error.map(str::to_string));
    }
}

fn dashboard_for(api: Arc<dyn BotApi>) -> (Dashboard, Arc<RecordingView>) {
    let view = Arc::new(RecordingView::default());
    let dash = Dashboard::new(api, view.clone(), Duration::from_secs(15));
    (dash, view)
}

fn http_client(url: &str) -> Arc<HttpBotClient> {
    Arc::new(HttpBotClient::new(url, Duration::from_secs(5)).unwrap())
}

#[tokio::test]
async fn start_success_triggers_refresh() {
    let (addr, bot) = spawn_fake_bot().await;
    let (dash, view) = dashboard_for(http_client(&base_url(addr)));

    let outcome = dash.start(Mode::Simulate, Some("config.json")).await.unwrap();
    assert_eq!(outcome, PollOutcome::Applied);
    assert_eq!(bot.status_calls(), 1);

    let bodies = bot.start_bodies.lock().unwrap().clone();
    assert_eq!(
        bodies,
        vec![serde_json::json!({"mode": "simulate", "config": "config.json"})]
    );

    let statuses = view.statuses.lock().unwrap();
    assert_eq!(
        statuses[0].0,
        "Running: true  Balance: 123.40  Aggressiveness: 0.5"
    );
    let rows = &statuses[0].1;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].price, "42000.00");
    assert_eq!(rows[0].amount, "0.0010");
    assert!(!rows[0].is_de_emphasized());
    assert!(rows[1].is_de_emphasized());
    assert_eq!(dash.snapshot().belief(), BotBelief::Running);
}

#[tokio::test]
async fn start_rejected_skips_refresh() {
    let (addr, bot) = spawn_fake_bot().await;
    bot.reject_start.store(true, Ordering::SeqCst);
    let (dash, view) = dashboard_for(http_client(&base_url(addr)));

    let err = dash.start(Mode::Live, None).await.unwrap_err();
    assert!(matches!(
        err,
        DashboardError::ControlRejected { status: 500, .. }
    ));
    assert_eq!(bot.status_calls(), 0);
    assert_eq!(*view.failures.lock().unwrap(), vec!["Failed to start bot"]);
    assert_eq!(dash.snapshot().belief(), BotBelief::Unknown);
}

#[tokio::test]
async fn stop_then_status_reports_stopped() {
    let (addr, bot) = spawn_fake_bot().await;
    let (dash, view) = dashboard_for(http_client(&base_url(addr)));

    dash.start(Mode::Simulate, None).await.unwrap();
    assert_eq!(bot.start_bodies.lock().unwrap()[0], serde_json::json!({"mode": "simulate"}));

    dash.stop().await.unwrap();
    assert_eq!(bot.status_calls(), 2);
    assert_eq!(dash.snapshot().belief(), BotBelief::Stopped);

    let statuses = view.statuses.lock().unwrap();
    let last = statuses.last().unwrap();
    assert_eq!(last.0, "Running: false  Balance: 0.00  Aggressiveness: ");
    assert!(last.1.is_empty());
}

#[tokio::test]
async fn stop_rejected_notifies() {
    let (addr, bot) = spawn_fake_bot().await;
    bot.reject_stop.store(true, Ordering::SeqCst);
    let (dash, view) = dashboard_for(http_client(&base_url(addr)));

    assert!(dash.stop().await.is_err());
    assert_eq!(bot.status_calls(), 0);
    assert_eq!(*view.failures.lock().unwrap(), vec!["Failed to stop bot"]);
}

#[tokio::test]
async fn unreachable_bot_is_control_failure() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (dash, view) = dashboard_for(http_client(&base_url(addr)));
    let err = dash.start(Mode::Simulate, None).await.unwrap_err();
    assert!(matches!(err, DashboardError::Transport(_)));
    assert_eq!(view.failures.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn undecodable_status_leaves_data_stale() {
    let (addr, bot) = spawn_fake_bot().await;
    let (dash, view) = dashboard_for(http_client(&base_url(addr)));

    assert_eq!(dash.refresh_status().await, PollOutcome::Applied);
    bot.garbage_status.store(true, Ordering::SeqCst);
    assert_eq!(dash.refresh_status().await, PollOutcome::Failed);

    assert_eq!(view.statuses.lock().unwrap().len(), 1);
    assert!(view.failures.lock().unwrap().is_empty());
    let stale = view.stale.lock().unwrap();
    assert_eq!(stale.len(), 1);
    assert!(stale[0].as_deref().unwrap().contains("decode"));
    assert_eq!(dash.snapshot().belief(), BotBelief::Stopped);
}

/// First call is slow, later calls answer immediately.
struct SlowFirstApi {
    calls: AtomicUsize,
}

#[async_trait]
impl BotApi for SlowFirstApi {
    async fn start(&self, _request: &StartRequest) -> Result<CommandAck> {
        Ok(CommandAck::default())
    }

    async fn stop(&self) -> Result<CommandAck> {
        Ok(CommandAck::default())
    }

    async fn status(&self) -> Result<BotStatus> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        Ok(BotStatus {
            running: n == 0,
            balance: Some(n as f64 + 1.0),
            ..Default::default()
        })
    }
}

#[tokio::test]
async fn overlapping_polls_never_regress() {
    let api = Arc::new(SlowFirstApi {
        calls: AtomicUsize::new(0),
    });
    let (dash, view) = dashboard_for(api);

    let (older, newer) = tokio::join!(dash.refresh_status(), dash.refresh_status());
    assert_eq!(older, PollOutcome::Superseded);
    assert_eq!(newer, PollOutcome::Applied);

    let statuses = view.statuses.lock().unwrap();
    assert_eq!(statuses.len(), 1);
    assert!(statuses[0].0.contains("Balance: 2.00"));

    let snap = dash.snapshot();
    assert_eq!(snap.belief(), BotBelief::Stopped);
    assert!(!snap.poll_in_flight());
}
