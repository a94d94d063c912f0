use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{errors::LeashError, ChannelId, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Info,
    Failure,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self { message: message.into(), severity }
    }
}

/// What a successful pull did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pulled {
    Joined(ChannelId),
    /// The handler left voice and the follower was disconnected with them.
    Disconnected,
}

impl fmt::Display for Pulled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pulled::Joined(_) => f.write_str("Pulled into your handler's channel"),
            Pulled::Disconnected => f.write_str("Your handler left voice, you were disconnected too"),
        }
    }
}

pub type PullResult = Result<Pulled, LeashError>;

impl From<&PullResult> for Notification {
    fn from(res: &PullResult) -> Self {
        match res {
            Ok(p @ Pulled::Joined(_)) => Notification::new(p.to_string(), Severity::Success),
            Ok(p @ Pulled::Disconnected) => Notification::new(p.to_string(), Severity::Info),
            Err(e) => Notification::from(e),
        }
    }
}

impl From<&LeashError> for Notification {
    fn from(e: &LeashError) -> Self {
        let severity = match e {
            LeashError::LeashReleased => Severity::Info,
            _ => Severity::Failure,
        };
        Notification::new(e.to_string(), severity)
    }
}

/// Result of assigning or clearing a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeashChange {
    Leashed(UserId),
    Unleashed(UserId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_follow_outcome() {
        let joined: PullResult = Ok(Pulled::Joined(ChannelId::new()));
        assert_eq!(Notification::from(&joined).severity, Severity::Success);

        let released: PullResult = Err(LeashError::LeashReleased);
        assert_eq!(Notification::from(&released).severity, Severity::Info);

        let full: PullResult = Err(LeashError::ChannelFull(ChannelId::new()));
        let n = Notification::from(&full);
        assert_eq!(n.severity, Severity::Failure);
        assert_eq!(n.message, "Your handler's channel is full");
    }
}
