//! Capability contracts the host application provides to the controller.
//!
//! The controller only ever sees these traits; tests and the simulator plug in
//! [`crate::InMemoryHost`].

use std::collections::HashMap;

use crate::{
    errors::HostResult, notify::Notification, perms::Capability, policy::PolicyState,
    voice::{VoiceState, VoiceStateSnapshot},
    Channel, ChannelId, UserId,
};

/// Persistence for the leash policy. Format is the host's business.
pub trait SettingsStore {
    fn load(&self) -> HostResult<PolicyState>;
    fn save(&self, policy: &PolicyState) -> HostResult<()>;
}

pub trait VoiceStateSource {
    /// Every known voice state, grouped by scope.
    fn all_voice_states(&self) -> HostResult<VoiceStateSnapshot>;

    /// Users currently connected to `channel`.
    fn voice_states_for_channel(&self, channel: ChannelId) -> HostResult<HashMap<UserId, VoiceState>>;
}

pub trait ChannelDirectory {
    fn channel(&self, id: ChannelId) -> HostResult<Channel>;

    /// Whether the acting user holds `cap` on `channel`.
    fn can(&self, channel: &Channel, cap: Capability) -> bool;

    fn can_connect(&self, channel: &Channel) -> bool {
        self.can(channel, Capability::Connect)
    }

    fn can_manage_members(&self, channel: &Channel) -> bool {
        self.can(channel, Capability::ManageMembers)
    }
}

/// Actions on the acting user's own voice connection. Fire-and-forget.
pub trait ChannelActions {
    fn join_channel(&self, channel: ChannelId) -> HostResult<()>;
    fn disconnect(&self) -> HostResult<()>;
}

pub trait Notifier {
    fn show(&self, notification: &Notification);
}

/// Everything the controller needs at runtime.
pub trait LeashHost: VoiceStateSource + ChannelDirectory + ChannelActions + Notifier {}

impl<T> LeashHost for T where T: VoiceStateSource + ChannelDirectory + ChannelActions + Notifier {}
