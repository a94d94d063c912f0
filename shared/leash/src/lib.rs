pub mod actor;
pub mod channels;
pub mod controller;
pub mod errors;
pub mod events;
pub mod host;
pub mod ids;
pub mod notify;
pub mod perms;
pub mod policy;
pub mod store;
pub mod voice;

pub use actor::{LeashHandle, DEFAULT_MAILBOX};
pub use channels::{Channel, ChannelKind};
pub use controller::{LeashController, LeashStatus, PullTarget, Toggled};
pub use errors::{ActorError, HostError, HostResult, LeashError};
pub use events::VoiceStateEvent;
pub use host::{ChannelActions, ChannelDirectory, LeashHost, Notifier, SettingsStore, VoiceStateSource};
pub use ids::{ChannelId, ServerId, UserId, VoiceScope};
pub use notify::{LeashChange, Notification, PullResult, Pulled, Severity};
pub use perms::Capability;
pub use policy::{PolicyState, PolicyToggle};
pub use store::{HostCall, InMemoryHost};
pub use voice::{VoiceState, VoiceStateSnapshot};
