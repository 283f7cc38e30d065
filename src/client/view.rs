//! Output sinks for the dashboard.
//!
//! `DashboardView` is what the controller draws into. `TerminalView` writes
//! to stdout/stderr; tests use a recording view.

use chrono::{DateTime, Utc};

use super::render::{render_trade_table, TradeRow};

/// Where rendered status and user notices go.
pub trait DashboardView: Send + Sync {
    /// Replace both views wholesale with a freshly applied status.
    fn show_status(&self, summary: &str, rows: &[TradeRow]);

    /// Blocking, user-visible notice for a failed control command.
    fn notify_failure(&self, message: &str);

    /// The data on screen is out of date.
    fn show_stale(&self, last_success: Option<DateTime<Utc>>, error: Option<&str>);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalView;

impl DashboardView for TerminalView {
    fn show_status(&self, summary: &str, rows: &[TradeRow]) {
        println!("{summary}");
        println!("{}", render_trade_table(rows));
    }

    fn notify_failure(&self, message: &str) {
        eprintln!("!! {message}");
    }

    fn show_stale(&self, last_success: Option<DateTime<Utc>>, error: Option<&str>) {
        let since = last_success
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());
        match error {
            Some(e) => eprintln!("(stale: last update {since}; {e})"),
            None => eprintln!("(stale: last update {since})"),
        }
    }
}
