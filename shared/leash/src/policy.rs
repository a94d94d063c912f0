//! Leash policy: who the follower is tied to and how eagerly it follows.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// User-owned leash settings. One instance per acting user, persisted by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyState {
    /// The followed user. Never the acting user.
    #[serde(default)]
    pub handler: Option<UserId>,
    /// Follow right away when a handler is assigned (default: true).
    #[serde(default = "default_pull_on_leash_set")]
    pub pull_on_leash_set: bool,
    /// Ignore voice-state events; only explicit pulls move the follower.
    #[serde(default)]
    pub only_manual_trigger: bool,
    /// Disconnect the follower when the handler leaves voice entirely.
    #[serde(default)]
    pub leash_release_on_leave: bool,
    /// Pull back when someone else moves the follower away.
    #[serde(default)]
    pub auto_pull_back: bool,
    /// Retry the handler's full channel as soon as a member leaves it.
    #[serde(default)]
    pub wait_for_space: bool,
}

impl Default for PolicyState {
    fn default() -> Self {
        Self {
            handler: None,
            pull_on_leash_set: default_pull_on_leash_set(),
            only_manual_trigger: false,
            leash_release_on_leave: false,
            auto_pull_back: false,
            wait_for_space: false,
        }
    }
}

fn default_pull_on_leash_set() -> bool {
    true
}

impl PolicyState {
    /// Drop a handler that points at the acting user. Returns true if it changed anything.
    pub fn sanitize(&mut self, self_id: UserId) -> bool {
        if self.handler == Some(self_id) {
            self.handler = None;
            return true;
        }
        false
    }

    /// Event-driven follows are live: a handler is set and manual-only mode is off.
    pub fn follows_events(&self) -> bool {
        self.handler.is_some() && !self.only_manual_trigger
    }

    pub fn get(&self, toggle: PolicyToggle) -> bool {
        match toggle {
            PolicyToggle::PullOnLeashSet => self.pull_on_leash_set,
            PolicyToggle::OnlyManualTrigger => self.only_manual_trigger,
            PolicyToggle::LeashReleaseOnLeave => self.leash_release_on_leave,
            PolicyToggle::AutoPullBack => self.auto_pull_back,
            PolicyToggle::WaitForSpace => self.wait_for_space,
        }
    }

    pub fn set(&mut self, toggle: PolicyToggle, value: bool) {
        let slot = match toggle {
            PolicyToggle::PullOnLeashSet => &mut self.pull_on_leash_set,
            PolicyToggle::OnlyManualTrigger => &mut self.only_manual_trigger,
            PolicyToggle::LeashReleaseOnLeave => &mut self.leash_release_on_leave,
            PolicyToggle::AutoPullBack => &mut self.auto_pull_back,
            PolicyToggle::WaitForSpace => &mut self.wait_for_space,
        };
        *slot = value;
    }
}

/// The boolean settings a settings surface can flip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyToggle {
    PullOnLeashSet,
    OnlyManualTrigger,
    LeashReleaseOnLeave,
    AutoPullBack,
    WaitForSpace,
}

impl PolicyToggle {
    pub const ALL: [PolicyToggle; 5] = [
        PolicyToggle::PullOnLeashSet,
        PolicyToggle::OnlyManualTrigger,
        PolicyToggle::LeashReleaseOnLeave,
        PolicyToggle::AutoPullBack,
        PolicyToggle::WaitForSpace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyToggle::PullOnLeashSet => "pull_on_leash_set",
            PolicyToggle::OnlyManualTrigger => "only_manual_trigger",
            PolicyToggle::LeashReleaseOnLeave => "leash_release_on_leave",
            PolicyToggle::AutoPullBack => "auto_pull_back",
            PolicyToggle::WaitForSpace => "wait_for_space",
        }
    }
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_correct() {
        let policy = PolicyState::default();
        assert_eq!(policy.handler, None);
        assert!(policy.pull_on_leash_set);
        assert!(!policy.only_manual_trigger);
        assert!(!policy.leash_release_on_leave);
        assert!(!policy.auto_pull_back);
        assert!(!policy.wait_for_space);
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let policy: PolicyState = serde_json::from_str(r#"{"wait_for_space": true}"#).unwrap();
        assert!(policy.wait_for_space);
        assert!(policy.pull_on_leash_set);
        assert_eq!(policy.handler, None);
    }

    #[test]
    fn sanitize_drops_self_handler() {
        let me = UserId::new();
        let mut policy = PolicyState { handler: Some(me), ..Default::default() };
        assert!(policy.sanitize(me));
        assert_eq!(policy.handler, None);

        let other = UserId::new();
        policy.handler = Some(other);
        assert!(!policy.sanitize(me));
        assert_eq!(policy.handler, Some(other));
    }

    #[test]
    fn follows_events_needs_handler_and_automatic_mode() {
        let mut policy = PolicyState::default();
        assert!(!policy.follows_events());
        policy.handler = Some(UserId::new());
        assert!(policy.follows_events());
        policy.only_manual_trigger = true;
        assert!(!policy.follows_events());
    }

    #[test]
    fn toggles_round_trip_by_name_and_value() {
        let mut policy = PolicyState::default();
        for toggle in PolicyToggle::ALL {
            assert_eq!(PolicyToggle::from_str(toggle.as_str()), Some(toggle));
            let before = policy.get(toggle);
            policy.set(toggle, !before);
            assert_eq!(policy.get(toggle), !before);
        }
        assert_eq!(PolicyToggle::from_str("leash"), None);
    }
}
