//! Pure renderers for the status summary line and the trade table.
//!
//! Nothing here touches the network or the client state, so a poll result
//! can be rendered (and tested) in isolation. Absent optional fields never
//! cause a failure.

use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::types::{BotStatus, Trade};

/// Marker attached to rows of closed trades.
pub const DE_EMPHASIS_CLASS: &str = "table-secondary";

/// One formatted row of the trade table.
#[derive(Debug, Clone, PartialEq, Tabled)]
pub struct TradeRow {
    #[tabled(rename = "Action")]
    pub action: String,
    #[tabled(rename = "Price")]
    pub price: String,
    #[tabled(rename = "Amount")]
    pub amount: String,
    #[tabled(rename = "Reason")]
    pub reason: String,
    #[tabled(rename = "PnL")]
    pub pnl: String,
    #[tabled(rename = "State")]
    pub state: &'static str,
    /// `Some(DE_EMPHASIS_CLASS)` for closed trades.
    #[tabled(skip)]
    pub marker: Option<&'static str>,
}

impl TradeRow {
    pub fn is_de_emphasized(&self) -> bool {
        self.marker.is_some()
    }
}

impl From<&Trade> for TradeRow {
    fn from(t: &Trade) -> Self {
        Self {
            action: t.action.clone(),
            price: format!("{:.2}", t.price),
            amount: format!("{:.4}", t.amount),
            reason: t.reason.clone(),
            pnl: format!("{:.2}", t.pnl),
            state: if t.open { "open" } else { "closed" },
            marker: (!t.open).then_some(DE_EMPHASIS_CLASS),
        }
    }
}

/// `Running: {running}  Balance: {balance:.2}  Aggressiveness: {aggr}`.
///
/// A missing balance renders as `0.00`; a missing aggressiveness as empty.
pub fn render_summary(status: &BotStatus) -> String {
    let aggressiveness = status
        .aggressiveness
        .map(|a| a.to_string())
        .unwrap_or_default();
    format!(
        "Running: {}  Balance: {:.2}  Aggressiveness: {}",
        status.running,
        status.balance.unwrap_or(0.0),
        aggressiveness,
    )
}

/// One row per trade, server order preserved.
pub fn render_trade_rows(trades: &[Trade]) -> Vec<TradeRow> {
    trades.iter().map(TradeRow::from).collect()
}

/// Text table for terminal output. Zero rows still prints the header.
pub fn render_trade_table(rows: &[TradeRow]) -> String {
    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}
