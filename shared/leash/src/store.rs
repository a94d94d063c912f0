use parking_lot::RwLock;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::debug;

use crate::{
    errors::{HostError, HostResult},
    events::VoiceStateEvent,
    host::{ChannelActions, ChannelDirectory, Notifier, SettingsStore, VoiceStateSource},
    notify::Notification,
    perms::Capability,
    policy::PolicyState,
    voice::{find_user_channel, VoiceState, VoiceStateSnapshot},
    Channel, ChannelId, UserId, VoiceScope,
};

/// Action the controller asked the host to perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostCall {
    Join(ChannelId),
    Disconnect,
}

/// Host double kept entirely in memory. Cheap to clone; clones share state.
///
/// Voice-state changes (including the ones caused by the acting user's own
/// join/disconnect) are queued and handed out by [`InMemoryHost::take_events`],
/// the way a real client delivers them on its next update tick.
#[derive(Clone)]
pub struct InMemoryHost {
    self_id: UserId,
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    channels: HashMap<ChannelId, Channel>,
    grants: HashMap<ChannelId, HashSet<Capability>>,
    states: VoiceStateSnapshot,
    pending: Vec<VoiceStateEvent>,
    calls: Vec<HostCall>,
    notifications: Vec<Notification>,
    policy: Option<PolicyState>,
    fail_voice_queries: bool,
    fail_channel_queries: bool,
    fail_actions: bool,
}

impl Inner {
    fn place(&mut self, user: UserId, scope: VoiceScope, channel: Option<ChannelId>) -> VoiceStateEvent {
        let previous = find_user_channel(&self.states, user);
        for states in self.states.values_mut() {
            states.remove(&user);
        }
        if let Some(ch) = channel {
            self.states
                .entry(scope)
                .or_default()
                .insert(user, VoiceState { user_id: user, channel_id: Some(ch) });
        }

        let ev = VoiceStateEvent { user_id: user, scope, channel_id: channel, previous_channel_id: previous };
        if ev.is_transition() {
            self.pending.push(ev);
        }
        ev
    }

    fn scope_of(&self, user: UserId) -> Option<VoiceScope> {
        self.states
            .iter()
            .find(|(_, states)| states.contains_key(&user))
            .map(|(scope, _)| *scope)
    }
}

impl InMemoryHost {
    pub fn new(self_id: UserId) -> Self {
        Self { self_id, inner: Arc::new(RwLock::new(Inner::default())) }
    }

    pub fn self_id(&self) -> UserId {
        self.self_id
    }

    pub fn add_channel(&self, channel: Channel) {
        self.inner.write().channels.insert(channel.id, channel);
    }

    /// Give the acting user `cap` on `channel`.
    pub fn grant(&self, channel: ChannelId, cap: Capability) {
        self.inner.write().grants.entry(channel).or_default().insert(cap);
    }

    pub fn revoke(&self, channel: ChannelId, cap: Capability) {
        if let Some(caps) = self.inner.write().grants.get_mut(&channel) {
            caps.remove(&cap);
        }
    }

    /// Put `user` in `channel` (or take them out of voice with `None`).
    /// Returns the resulting event; real transitions are also queued.
    pub fn place(&self, user: UserId, scope: VoiceScope, channel: Option<ChannelId>) -> VoiceStateEvent {
        self.inner.write().place(user, scope, channel)
    }

    /// Take `user` out of voice wherever they are.
    pub fn remove(&self, user: UserId) -> Option<VoiceStateEvent> {
        let mut g = self.inner.write();
        let scope = g.scope_of(user)?;
        Some(g.place(user, scope, None))
    }

    pub fn channel_of(&self, user: UserId) -> Option<ChannelId> {
        find_user_channel(&self.inner.read().states, user)
    }

    /// Drain queued voice-state events in the order they happened.
    pub fn take_events(&self) -> Vec<VoiceStateEvent> {
        std::mem::take(&mut self.inner.write().pending)
    }

    pub fn fail_voice_queries(&self, fail: bool) {
        self.inner.write().fail_voice_queries = fail;
    }

    /// Fail only the per-channel member query; the global snapshot keeps working.
    pub fn fail_channel_queries(&self, fail: bool) {
        self.inner.write().fail_channel_queries = fail;
    }

    pub fn fail_actions(&self, fail: bool) {
        self.inner.write().fail_actions = fail;
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.inner.read().calls.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.read().notifications.clone()
    }

    /// Last policy handed to [`SettingsStore::save`].
    pub fn saved_policy(&self) -> Option<PolicyState> {
        self.inner.read().policy.clone()
    }

    pub fn clear_log(&self) {
        let mut g = self.inner.write();
        g.calls.clear();
        g.notifications.clear();
    }
}

impl SettingsStore for InMemoryHost {
    fn load(&self) -> HostResult<PolicyState> {
        Ok(self.inner.read().policy.clone().unwrap_or_default())
    }

    fn save(&self, policy: &PolicyState) -> HostResult<()> {
        self.inner.write().policy = Some(policy.clone());
        Ok(())
    }
}

impl VoiceStateSource for InMemoryHost {
    fn all_voice_states(&self) -> HostResult<VoiceStateSnapshot> {
        let g = self.inner.read();
        if g.fail_voice_queries {
            return Err(HostError::Unavailable("voice state store".into()));
        }
        Ok(g.states.clone())
    }

    fn voice_states_for_channel(&self, channel: ChannelId) -> HostResult<HashMap<UserId, VoiceState>> {
        let g = self.inner.read();
        if g.fail_voice_queries || g.fail_channel_queries {
            return Err(HostError::Unavailable("voice state store".into()));
        }
        Ok(g.states
            .values()
            .flat_map(|states| states.values())
            .filter(|st| st.channel_id == Some(channel))
            .map(|st| (st.user_id, *st))
            .collect())
    }
}

impl ChannelDirectory for InMemoryHost {
    fn channel(&self, id: ChannelId) -> HostResult<Channel> {
        self.inner.read().channels.get(&id).cloned().ok_or(HostError::NotFound("channel"))
    }

    fn can(&self, channel: &Channel, cap: Capability) -> bool {
        self.inner
            .read()
            .grants
            .get(&channel.id)
            .is_some_and(|caps| caps.contains(&cap))
    }
}

impl ChannelActions for InMemoryHost {
    fn join_channel(&self, channel: ChannelId) -> HostResult<()> {
        let mut g = self.inner.write();
        g.calls.push(HostCall::Join(channel));
        if g.fail_actions {
            return Err(HostError::Unavailable("join rejected".into()));
        }
        let scope = g.channels.get(&channel).map(|ch| ch.scope).ok_or(HostError::NotFound("channel"))?;
        g.place(self.self_id, scope, Some(channel));
        Ok(())
    }

    fn disconnect(&self) -> HostResult<()> {
        let mut g = self.inner.write();
        g.calls.push(HostCall::Disconnect);
        if g.fail_actions {
            return Err(HostError::Unavailable("disconnect rejected".into()));
        }
        if let Some(scope) = g.scope_of(self.self_id) {
            g.place(self.self_id, scope, None);
        }
        Ok(())
    }
}

impl Notifier for InMemoryHost {
    fn show(&self, notification: &Notification) {
        debug!(severity = ?notification.severity, "{}", notification.message);
        self.inner.write().notifications.push(notification.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServerId;

    #[test]
    fn place_queues_only_real_transitions() {
        let me = UserId::new();
        let host = InMemoryHost::new(me);
        let scope = VoiceScope::Server(ServerId::new());
        let (a, b) = (ChannelId::new(), ChannelId::new());
        let u = UserId::new();

        host.place(u, scope, Some(a));
        host.place(u, scope, Some(a));
        host.place(u, scope, Some(b));
        host.place(u, scope, None);

        let evs = host.take_events();
        assert_eq!(evs.len(), 3);
        assert_eq!(evs[1].previous_channel_id, Some(a));
        assert_eq!(evs[1].channel_id, Some(b));
        assert!(evs[2].is_departure());
        assert!(host.take_events().is_empty());
    }

    #[test]
    fn join_moves_acting_user_and_queues_event() {
        let me = UserId::new();
        let host = InMemoryHost::new(me);
        let ch = Channel::voice(VoiceScope::Server(ServerId::new()), 0);
        let id = ch.id;
        host.add_channel(ch);

        host.join_channel(id).unwrap();
        assert_eq!(host.channel_of(me), Some(id));
        assert_eq!(host.calls(), vec![HostCall::Join(id)]);

        host.disconnect().unwrap();
        assert_eq!(host.channel_of(me), None);
        let evs = host.take_events();
        assert_eq!(evs.len(), 2);
        assert!(evs.iter().all(|ev| ev.user_id == me));
    }

    #[test]
    fn join_unknown_channel_fails_but_is_recorded() {
        let host = InMemoryHost::new(UserId::new());
        let id = ChannelId::new();
        assert_eq!(host.join_channel(id), Err(HostError::NotFound("channel")));
        assert_eq!(host.calls(), vec![HostCall::Join(id)]);
    }

    #[test]
    fn grants_are_per_channel() {
        let host = InMemoryHost::new(UserId::new());
        let a = Channel::voice(VoiceScope::Direct, 0);
        let b = Channel::voice(VoiceScope::Direct, 0);
        host.grant(a.id, Capability::Connect);

        assert!(host.can_connect(&a));
        assert!(!host.can_connect(&b));
        assert!(!host.can_manage_members(&a));

        host.revoke(a.id, Capability::Connect);
        assert!(!host.can_connect(&a));
    }

    #[test]
    fn settings_default_until_saved() {
        let host = InMemoryHost::new(UserId::new());
        assert_eq!(host.load().unwrap(), PolicyState::default());

        let policy = PolicyState { wait_for_space: true, ..Default::default() };
        host.save(&policy).unwrap();
        assert_eq!(host.load().unwrap(), policy);
        assert_eq!(host.saved_policy(), Some(policy));
    }
}
