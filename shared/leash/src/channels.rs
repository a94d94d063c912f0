use serde::{Deserialize, Serialize};

use crate::{ChannelId, VoiceScope};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Server voice channel, gated by capabilities.
    #[default]
    Voice,
    /// One-to-one call.
    DirectCall,
    /// Private group call.
    GroupCall,
}

impl ChannelKind {
    /// Private calls carry no permission model; anyone in the call may rejoin it.
    pub fn is_private_call(&self) -> bool {
        matches!(self, ChannelKind::DirectCall | ChannelKind::GroupCall)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub scope: VoiceScope,
    pub kind: ChannelKind,
    /// 0 = unlimited
    pub user_limit: u32,
}

impl Channel {
    pub fn voice(scope: VoiceScope, user_limit: u32) -> Self {
        Self { id: ChannelId::new(), scope, kind: ChannelKind::Voice, user_limit }
    }

    pub fn direct_call() -> Self {
        Self { id: ChannelId::new(), scope: VoiceScope::Direct, kind: ChannelKind::DirectCall, user_limit: 0 }
    }

    pub fn is_limited(&self) -> bool {
        self.user_limit > 0
    }

    /// True when `members` fills the channel. Unlimited channels are never full.
    pub fn is_full(&self, members: usize) -> bool {
        self.is_limited() && members >= self.user_limit as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_channel_is_never_full() {
        let ch = Channel::voice(VoiceScope::Direct, 0);
        assert!(!ch.is_full(0));
        assert!(!ch.is_full(10_000));
    }

    #[test]
    fn limited_channel_fills_at_limit() {
        let ch = Channel::voice(VoiceScope::Direct, 3);
        assert!(!ch.is_full(2));
        assert!(ch.is_full(3));
        assert!(ch.is_full(4));
    }

    #[test]
    fn only_calls_are_private() {
        assert!(!ChannelKind::Voice.is_private_call());
        assert!(ChannelKind::DirectCall.is_private_call());
        assert!(ChannelKind::GroupCall.is_private_call());
    }
}
