//! Transient success/error alerts

use serde::{Deserialize, Serialize};

pub use wiki_core::AlertKind;

/// A visible alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

impl Alert {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Error,
            message: message.into(),
        }
    }
}

/// Two-state alert automaton
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AlertState {
    #[default]
    Idle,
    Showing { alert: Alert, generation: u64 },
}

/// Holder of the alert automaton.
///
/// Every `show` starts a new generation. The scheduled transition back to
/// `Idle` carries the generation it was armed for, so a late expiry can
/// never hide an alert that replaced it.
#[derive(Debug, Clone, Default)]
pub struct AlertSlot {
    state: AlertState,
    issued: u64,
}

impl AlertSlot {
    /// Show `alert`, replacing whatever is visible; returns its generation
    pub fn show(&mut self, alert: Alert) -> u64 {
        self.issued += 1;
        self.state = AlertState::Showing {
            alert,
            generation: self.issued,
        };
        self.issued
    }

    /// Return to `Idle` if the visible alert belongs to `generation`
    pub fn expire(&mut self, generation: u64) -> Option<Alert> {
        let armed_for_current = matches!(
            self.state,
            AlertState::Showing { generation: current, .. } if current == generation
        );
        if !armed_for_current {
            return None;
        }

        match std::mem::take(&mut self.state) {
            AlertState::Showing { alert, .. } => Some(alert),
            AlertState::Idle => None,
        }
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    pub fn current(&self) -> Option<&Alert> {
        match &self.state {
            AlertState::Showing { alert, .. } => Some(alert),
            AlertState::Idle => None,
        }
    }

    pub fn is_showing(&self) -> bool {
        matches!(self.state, AlertState::Showing { .. })
    }
}
