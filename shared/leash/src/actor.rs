//! Single-owner task around [`LeashController`].
//!
//! The policy state lives only inside the actor task; UI surfaces and the
//! host's event callback talk to it through a cloneable [`LeashHandle`].
//! Commands are processed strictly in mailbox order.

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use crate::{
    controller::{LeashController, LeashStatus, PullTarget, Toggled},
    errors::{ActorError, LeashError},
    events::VoiceStateEvent,
    host::{LeashHost, SettingsStore},
    notify::PullResult,
    policy::{PolicyState, PolicyToggle},
    UserId,
};

pub const DEFAULT_MAILBOX: usize = 256;

enum Command {
    Deliver {
        events: Vec<VoiceStateEvent>,
        resp_tx: Option<oneshot::Sender<Option<PullResult>>>,
    },
    Pull {
        resp_tx: oneshot::Sender<Option<PullResult>>,
    },
    Toggle {
        user: UserId,
        resp_tx: oneshot::Sender<Result<Toggled, LeashError>>,
    },
    Unleash {
        resp_tx: oneshot::Sender<Option<UserId>>,
    },
    SetToggle {
        toggle: PolicyToggle,
        value: bool,
        resp_tx: oneshot::Sender<PolicyState>,
    },
    Policy {
        resp_tx: oneshot::Sender<PolicyState>,
    },
    Shutdown,
}

/// Public handle: cloneable, threadsafe.
#[derive(Clone)]
pub struct LeashHandle {
    cmd_tx: mpsc::Sender<Command>,
    status_rx: watch::Receiver<LeashStatus>,
}

impl LeashHandle {
    /// Load the policy from the host's settings store and spawn the actor.
    /// Must be called from inside a tokio runtime.
    pub fn start<H>(self_id: UserId, host: H, mailbox: usize) -> Self
    where
        H: LeashHost + SettingsStore + Send + 'static,
    {
        let mut policy = host.load().unwrap_or_else(|e| {
            warn!("leash settings unavailable, using defaults: {e}");
            PolicyState::default()
        });
        let ctl = LeashController::new(self_id, host);
        if policy.sanitize(self_id) {
            warn!("stored handler was the acting user, cleared");
            persist(&ctl, &policy);
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(mailbox.max(1));
        let (status_tx, status_rx) = watch::channel(ctl.status(&policy));

        let actor = LeashActor { ctl, policy, status_tx };
        tokio::spawn(actor.run(cmd_rx));

        Self { cmd_tx, status_rx }
    }

    /// Hand a batch to the actor and wait for its decision.
    pub async fn deliver(&self, events: Vec<VoiceStateEvent>) -> Result<Option<PullResult>, ActorError> {
        self.request(|resp_tx| Command::Deliver { events, resp_tx: Some(resp_tx) }).await
    }

    /// Non-blocking variant for synchronous host callbacks.
    pub fn try_deliver(&self, events: Vec<VoiceStateEvent>) -> Result<(), ActorError> {
        self.cmd_tx
            .try_send(Command::Deliver { events, resp_tx: None })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => ActorError::Busy,
                mpsc::error::TrySendError::Closed(_) => ActorError::Stopped,
            })
    }

    /// Explicit pull toward wherever the handler is (indicator click).
    pub async fn pull(&self) -> Result<Option<PullResult>, ActorError> {
        self.request(|resp_tx| Command::Pull { resp_tx }).await
    }

    /// Context-menu leash toggle on `user`.
    pub async fn toggle(&self, user: UserId) -> Result<Result<Toggled, LeashError>, ActorError> {
        self.request(|resp_tx| Command::Toggle { user, resp_tx }).await
    }

    pub async fn unleash(&self) -> Result<Option<UserId>, ActorError> {
        self.request(|resp_tx| Command::Unleash { resp_tx }).await
    }

    /// Flip one policy setting; returns the policy after the change.
    pub async fn set_toggle(&self, toggle: PolicyToggle, value: bool) -> Result<PolicyState, ActorError> {
        self.request(|resp_tx| Command::SetToggle { toggle, value, resp_tx }).await
    }

    pub async fn policy(&self) -> Result<PolicyState, ActorError> {
        self.request(|resp_tx| Command::Policy { resp_tx }).await
    }

    /// Latest published status.
    pub fn status(&self) -> LeashStatus {
        *self.status_rx.borrow()
    }

    /// Receiver that wakes whenever the status changes.
    pub fn subscribe(&self) -> watch::Receiver<LeashStatus> {
        self.status_rx.clone()
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(Command::Shutdown).await;
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, ActorError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.cmd_tx.send(make(resp_tx)).await.map_err(|_| ActorError::Stopped)?;
        resp_rx.await.map_err(|_| ActorError::NoReply)
    }
}

struct LeashActor<H> {
    ctl: LeashController<H>,
    policy: PolicyState,
    status_tx: watch::Sender<LeashStatus>,
}

impl<H: LeashHost + SettingsStore> LeashActor<H> {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<Command>) {
        while let Some(cmd) = cmd_rx.recv().await {
            if !self.handle(cmd) {
                break;
            }
            self.publish();
        }
        debug!("leash actor stopped");
    }

    /// Returns false on shutdown.
    fn handle(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Deliver { events, resp_tx } => {
                let res = self.ctl.on_voice_state_updates(&self.policy, &events);
                if let Some(tx) = resp_tx {
                    let _ = tx.send(res);
                }
            }
            Command::Pull { resp_tx } => {
                let _ = resp_tx.send(self.ctl.trigger_pull(&self.policy, PullTarget::Locate));
            }
            Command::Toggle { user, resp_tx } => {
                let res = self.ctl.toggle_leash(&mut self.policy, user);
                if res.is_ok() {
                    persist(&self.ctl, &self.policy);
                }
                let _ = resp_tx.send(res);
            }
            Command::Unleash { resp_tx } => {
                let prev = self.ctl.unleash(&mut self.policy);
                if prev.is_some() {
                    persist(&self.ctl, &self.policy);
                }
                let _ = resp_tx.send(prev);
            }
            Command::SetToggle { toggle, value, resp_tx } => {
                if self.policy.get(toggle) != value {
                    self.policy.set(toggle, value);
                    debug!(setting = toggle.as_str(), value, "leash setting changed");
                    persist(&self.ctl, &self.policy);
                }
                let _ = resp_tx.send(self.policy.clone());
            }
            Command::Policy { resp_tx } => {
                let _ = resp_tx.send(self.policy.clone());
            }
            Command::Shutdown => return false,
        }
        true
    }

    fn publish(&self) {
        let next = self.ctl.status(&self.policy);
        self.status_tx.send_if_modified(|cur| {
            if *cur == next {
                return false;
            }
            *cur = next;
            true
        });
    }
}

fn persist<H: LeashHost + SettingsStore>(ctl: &LeashController<H>, policy: &PolicyState) {
    if let Err(e) = ctl.host().save(policy) {
        warn!("failed to persist leash settings: {e}");
    }
}
