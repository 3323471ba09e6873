//! Per-server connection state machine.
//!
//! ```text
//! Idle -> Connecting -> Connected -> Listing -> Ready -> Invoking -> Ready
//!                                       ^         |
//!                                       +---------+  (refresh)
//! ```
//!
//! Any state may drop back to `Idle` (failure, disconnect) or restart at
//! `Connecting` (reconnect).

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    #[default]
    Idle,
    Connecting,
    Connected,
    Listing,
    Ready,
    Invoking,
}

impl ServerStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Listing => "listing",
            Self::Ready => "ready",
            Self::Invoking => "invoking",
        }
    }

    #[must_use]
    pub fn can_transition(self, next: Self) -> bool {
        use ServerStatus::{Connected, Connecting, Idle, Invoking, Listing, Ready};
        matches!(
            (self, next),
            (_, Idle | Connecting)
                | (Connecting, Connected)
                | (Connected | Ready, Listing)
                | (Listing | Invoking, Ready)
                | (Ready, Invoking)
        )
    }

    /// Tools may be invoked.
    #[must_use]
    pub fn accepts_calls(self) -> bool {
        matches!(self, Self::Ready | Self::Invoking)
    }

    /// A request for this server is in progress.
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Connecting | Self::Listing | Self::Invoking)
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::ServerStatus::*;

    #[test]
    fn happy_path_is_allowed() {
        let path = [Idle, Connecting, Connected, Listing, Ready, Invoking, Ready, Listing, Ready];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn skipping_steps_is_rejected() {
        assert!(!Idle.can_transition(Ready));
        assert!(!Connecting.can_transition(Invoking));
        assert!(!Listing.can_transition(Invoking));
        assert!(Invoking.can_transition(Idle));
        assert!(Ready.can_transition(Connecting));
    }
}
