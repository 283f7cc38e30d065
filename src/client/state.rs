//! Client-side belief about the bot.
//!
//! The dashboard never reads state back from its view. Everything it knows
//! lives here: the last applied status, which polls are in flight, and how
//! fresh the data is. Poll results carry a ticket so an older response that
//! resolves late can never overwrite a newer one.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

use crate::types::BotStatus;

/// What the client believes the bot is doing. Not authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotBelief {
    /// No poll has succeeded yet.
    Unknown,
    Running,
    Stopped,
}

impl fmt::Display for BotBelief {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotBelief::Unknown => write!(f, "UNKNOWN"),
            BotBelief::Running => write!(f, "RUNNING"),
            BotBelief::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// Issued to a poll when it starts; handed back with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTicket {
    pub seq: u64,
    pub issued_at: DateTime<Utc>,
}

/// What happened to a poll result handed back to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Result became the current status.
    Applied,
    /// A later-issued poll was already applied; the result is dropped.
    Superseded,
    /// Poll failed; the previous status is kept.
    Failed,
}

#[derive(Debug, Clone)]
pub struct ClientState {
    last_known: Option<BotStatus>,
    belief: BotBelief,
    issued_seq: u64,
    applied_seq: u64,
    in_flight: usize,
    last_success: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientState {
    pub fn new() -> Self {
        Self {
            last_known: None,
            belief: BotBelief::Unknown,
            issued_seq: 0,
            applied_seq: 0,
            in_flight: 0,
            last_success: None,
            last_error: None,
        }
    }

    /// Register a new poll and return its ticket.
    pub fn begin_poll(&mut self) -> PollTicket {
        self.issued_seq += 1;
        self.in_flight += 1;
        PollTicket {
            seq: self.issued_seq,
            issued_at: Utc::now(),
        }
    }

    /// Hand back a successful poll result.
    pub fn complete_poll(&mut self, ticket: PollTicket, status: BotStatus) -> PollOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);

        if ticket.seq <= self.applied_seq {
            return PollOutcome::Superseded;
        }

        self.applied_seq = ticket.seq;
        self.belief = if status.running {
            BotBelief::Running
        } else {
            BotBelief::Stopped
        };
        self.last_known = Some(status);
        self.last_success = Some(ticket.issued_at);
        self.last_error = None;
        PollOutcome::Applied
    }

    /// Hand back a failed poll. Stale data stays on screen.
    pub fn fail_poll(&mut self, ticket: PollTicket, error: impl Into<String>) -> PollOutcome {
        self.in_flight = self.in_flight.saturating_sub(1);
        // A failure older than the applied snapshot says nothing new.
        if ticket.seq <= self.applied_seq {
            return PollOutcome::Superseded;
        }
        self.last_error = Some(error.into());
        PollOutcome::Failed
    }

    pub fn last_known(&self) -> Option<&BotStatus> {
        self.last_known.as_ref()
    }

    pub fn belief(&self) -> BotBelief {
        self.belief
    }

    pub fn poll_in_flight(&self) -> bool {
        self.in_flight > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Stale when the last poll failed, or the last success is older than `max_age`.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        if self.last_error.is_some() {
            return true;
        }
        match self.last_success {
            Some(at) => now - at > max_age,
            None => false,
        }
    }
}
