use thiserror::Error;

use crate::ChannelId;

pub type HostResult<T> = Result<T, HostError>;

/// Failures reported by the host application behind the capability contracts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("host unavailable: {0}")]
    Unavailable(String),
}

/// Why a pull (or a leash change) ended without moving the follower.
///
/// The `Display` text is what the user sees in the notification.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeashError {
    #[error("You are already with your handler")]
    AlreadyWithHandler,

    #[error("You don't have permission to join your handler's channel")]
    InsufficientPermission(ChannelId),

    #[error("Your handler's channel is full")]
    ChannelFull(ChannelId),

    #[error("Your handler is not in a voice channel")]
    HandlerAbsent,

    #[error("Your handler left voice, leash released")]
    LeashReleased,

    #[error("You can't put a leash on yourself")]
    CannotLeashSelf,
}

/// Failures talking to the leash actor.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorError {
    #[error("leash actor stopped")]
    Stopped,

    #[error("leash actor mailbox full")]
    Busy,

    #[error("leash actor dropped reply")]
    NoReply,
}
