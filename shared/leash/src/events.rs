use serde::{Deserialize, Serialize};

use crate::{ChannelId, UserId, VoiceScope};

/// One voice-state transition reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceStateEvent {
    pub user_id: UserId,
    pub scope: VoiceScope,
    pub channel_id: Option<ChannelId>,
    pub previous_channel_id: Option<ChannelId>,
}

impl VoiceStateEvent {
    /// Mute/deafen style updates repeat the channel; only real transitions count.
    pub fn is_transition(&self) -> bool {
        self.channel_id != self.previous_channel_id
    }

    /// Moved from one channel straight into another.
    pub fn is_move(&self) -> bool {
        self.is_transition() && self.channel_id.is_some() && self.previous_channel_id.is_some()
    }

    /// Left voice entirely.
    pub fn is_departure(&self) -> bool {
        self.channel_id.is_none() && self.previous_channel_id.is_some()
    }
}
