use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{ChannelId, UserId, VoiceScope};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceState {
    pub user_id: UserId,
    pub channel_id: Option<ChannelId>,
}

/// scope -> user -> state, as the host reports it.
pub type VoiceStateSnapshot = HashMap<VoiceScope, HashMap<UserId, VoiceState>>;

/// First channel `user` is connected to in any scope.
pub fn find_user_channel(snapshot: &VoiceStateSnapshot, user: UserId) -> Option<ChannelId> {
    snapshot
        .values()
        .flat_map(|states| states.values())
        .find(|st| st.user_id == user)
        .and_then(|st| st.channel_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServerId;

    #[test]
    fn finds_user_in_any_scope() {
        let (a, b) = (UserId::new(), UserId::new());
        let ch = ChannelId::new();
        let mut snap = VoiceStateSnapshot::new();
        snap.entry(VoiceScope::Server(ServerId::new()))
            .or_default()
            .insert(a, VoiceState { user_id: a, channel_id: Some(ChannelId::new()) });
        snap.entry(VoiceScope::Direct)
            .or_default()
            .insert(b, VoiceState { user_id: b, channel_id: Some(ch) });

        assert_eq!(find_user_channel(&snap, b), Some(ch));
        assert_eq!(find_user_channel(&snap, UserId::new()), None);
    }
}
