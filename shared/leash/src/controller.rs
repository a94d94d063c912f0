//! Leash decision engine.
//!
//! Decides, per explicit request or per voice-state batch, whether the acting
//! user joins the handler's channel, stays put, or disconnects. Every decision
//! ends in exactly one notification and at most one action on the host.
//!
//! Host query failures never escape: a failing voice-state lookup (including
//! the target's member count) reads as "handler not connected", a channel the
//! directory can't resolve reads as "not permitted", and failed
//! join/disconnect calls are logged and dropped.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    errors::{HostResult, LeashError},
    events::VoiceStateEvent,
    host::LeashHost,
    notify::{LeashChange, Notification, PullResult, Pulled},
    policy::PolicyState,
    voice::find_user_channel,
    ChannelId, UserId,
};

/// Where a pull should go.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PullTarget {
    /// Wherever the handler currently is.
    #[default]
    Locate,
    Channel(ChannelId),
    /// The handler is known to have left voice.
    Absent,
}

/// What a status indicator needs to render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LeashStatus {
    pub handler: Option<UserId>,
    pub handler_channel: Option<ChannelId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Toggled {
    pub change: LeashChange,
    /// Set when assigning the handler pulled right away.
    pub pull: Option<PullResult>,
}

pub struct LeashController<H> {
    self_id: UserId,
    host: H,
}

impl<H: LeashHost> LeashController<H> {
    pub fn new(self_id: UserId, host: H) -> Self {
        Self { self_id, host }
    }

    #[inline]
    pub fn self_id(&self) -> UserId {
        self.self_id
    }

    #[inline]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Channel the handler is connected to in any scope, or `None`.
    pub fn locate_handler_channel(&self, handler: UserId) -> Option<ChannelId> {
        self.locate(handler)
    }

    pub fn status(&self, policy: &PolicyState) -> LeashStatus {
        LeashStatus {
            handler: policy.handler,
            handler_channel: policy.handler.and_then(|h| self.locate(h)),
        }
    }

    // -------------------------------------------------------------------------
    // Entry points
    // -------------------------------------------------------------------------

    /// Run the pull decision. Returns `None` (and does nothing) without a handler.
    pub fn trigger_pull(&self, policy: &PolicyState, target: PullTarget) -> Option<PullResult> {
        let handler = policy.handler?;

        let target = match target {
            PullTarget::Locate => self.locate(handler),
            PullTarget::Channel(id) => Some(id),
            PullTarget::Absent => None,
        };
        let current = self.locate(self.self_id);

        let res = self.decide(policy, target, current);
        debug!(%handler, ?target, ?current, ?res, "leash pull decided");

        self.host.show(&Notification::from(&res));
        Some(res)
    }

    /// Assign `user` as handler, or clear the leash if they already are.
    pub fn toggle_leash(&self, policy: &mut PolicyState, user: UserId) -> Result<Toggled, LeashError> {
        if policy.handler == Some(user) {
            policy.handler = None;
            info!(handler = %user, "leash removed");
            return Ok(Toggled { change: LeashChange::Unleashed(user), pull: None });
        }

        if user == self.self_id {
            let err = LeashError::CannotLeashSelf;
            self.host.show(&Notification::from(&err));
            return Err(err);
        }

        policy.handler = Some(user);
        info!(handler = %user, "leash attached");

        let pull = if policy.pull_on_leash_set {
            self.trigger_pull(policy, PullTarget::Locate)
        } else {
            None
        };
        Ok(Toggled { change: LeashChange::Leashed(user), pull })
    }

    /// Clear the handler. Returns who it was.
    pub fn unleash(&self, policy: &mut PolicyState) -> Option<UserId> {
        let prev = policy.handler.take();
        if let Some(handler) = prev {
            info!(%handler, "leash released by user");
        }
        prev
    }

    /// Handle one batch of voice-state changes. At most one pull runs per batch.
    ///
    /// The handler's last transition in the batch decides the pull; otherwise
    /// the first event about someone else that calls for one does.
    pub fn on_voice_state_updates(&self, policy: &PolicyState, events: &[VoiceStateEvent]) -> Option<PullResult> {
        if !policy.follows_events() {
            return None;
        }
        let handler = policy.handler?;

        let latest = events.iter().rev().find(|ev| ev.user_id == handler && ev.is_transition());
        if let Some(ev) = latest {
            let target = ev.channel_id.map_or(PullTarget::Absent, PullTarget::Channel);
            return self.trigger_pull(policy, target);
        }

        let target = events
            .iter()
            .filter(|ev| ev.is_transition())
            .find_map(|ev| self.follow_target(policy, handler, ev))?;
        self.trigger_pull(policy, target)
    }

    // -------------------------------------------------------------------------
    // Decision
    // -------------------------------------------------------------------------

    fn decide(&self, policy: &PolicyState, target: Option<ChannelId>, current: Option<ChannelId>) -> PullResult {
        match (target, current) {
            (Some(t), Some(c)) if t == c => Err(LeashError::AlreadyWithHandler),
            (Some(t), _) => self.join_target(policy, t, current),
            (None, Some(_)) if policy.leash_release_on_leave => {
                self.fire("disconnect", self.host.disconnect());
                info!("handler left voice, disconnected");
                Ok(Pulled::Disconnected)
            }
            (None, Some(_)) => Err(LeashError::LeashReleased),
            (None, None) => Err(LeashError::HandlerAbsent),
        }
    }

    fn join_target(&self, policy: &PolicyState, target: ChannelId, current: Option<ChannelId>) -> PullResult {
        let channel = match self.host.channel(target) {
            Ok(ch) => ch,
            Err(e) => {
                warn!(channel = %target, "channel lookup failed: {e}");
                return Err(LeashError::InsufficientPermission(target));
            }
        };

        if !channel.kind.is_private_call() && !self.host.can_connect(&channel) {
            return Err(LeashError::InsufficientPermission(target));
        }

        if channel.is_limited() {
            let members = match self.host.voice_states_for_channel(target) {
                Ok(states) => states.len(),
                Err(e) => {
                    warn!(channel = %target, "member count unavailable, treating handler as not connected: {e}");
                    return self.decide(policy, None, current);
                }
            };
            if channel.is_full(members) && !self.host.can_manage_members(&channel) {
                return Err(LeashError::ChannelFull(target));
            }
        }

        self.fire("join_channel", self.host.join_channel(target));
        info!(channel = %target, "pulled toward handler");
        Ok(Pulled::Joined(target))
    }

    /// Which pull, if any, an event about someone other than the handler calls for.
    ///
    /// A self-move that already landed in the handler's channel is skipped
    /// instead of re-pulled: it is the echo of our own join.
    fn follow_target(&self, policy: &PolicyState, handler: UserId, ev: &VoiceStateEvent) -> Option<PullTarget> {
        if ev.user_id == self.self_id {
            if !(policy.auto_pull_back && ev.is_move()) {
                return None;
            }
            let handler_channel = self.locate(handler);
            if handler_channel.is_some() && handler_channel == ev.channel_id {
                debug!("moved into handler's channel, nothing to pull back");
                return None;
            }
            return Some(handler_channel.map_or(PullTarget::Absent, PullTarget::Channel));
        }

        if ev.user_id == handler || !(policy.wait_for_space && ev.is_departure()) {
            return None;
        }
        ev.previous_channel_id.and_then(|vacated| self.vacancy_target(handler, vacated))
    }

    /// A member left `vacated`. Retry it if that freed the only slot next to the handler.
    fn vacancy_target(&self, handler: UserId, vacated: ChannelId) -> Option<PullTarget> {
        if self.locate(self.self_id) == Some(vacated) {
            return None;
        }

        let channel = match self.host.channel(vacated) {
            Ok(ch) => ch,
            Err(e) => {
                debug!(channel = %vacated, "vacated channel unknown: {e}");
                return None;
            }
        };
        if !channel.is_limited() {
            return None;
        }

        let remaining = match self.host.voice_states_for_channel(vacated) {
            Ok(states) => states,
            Err(e) => {
                warn!(channel = %vacated, "member list unavailable: {e}");
                return None;
            }
        };

        let one_slot_open = remaining.len() + 1 == channel.user_limit as usize;
        if !one_slot_open || self.host.can_manage_members(&channel) || !remaining.contains_key(&handler) {
            return None;
        }

        debug!(channel = %vacated, "slot opened next to handler");
        Some(PullTarget::Channel(vacated))
    }

    // -------------------------------------------------------------------------
    // Host helpers
    // -------------------------------------------------------------------------

    fn locate(&self, user: UserId) -> Option<ChannelId> {
        match self.host.all_voice_states() {
            Ok(snapshot) => find_user_channel(&snapshot, user),
            Err(e) => {
                warn!(%user, "voice state query failed, treating as not connected: {e}");
                None
            }
        }
    }

    fn fire(&self, action: &'static str, res: HostResult<()>) {
        if let Err(e) = res {
            warn!(action, "host action failed: {e}");
        }
    }
}
