use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashMap;
use vp_leash::{Capability, ChannelId, ChannelKind, PolicyState, PolicyToggle, ServerId, UserId, VoiceScope};

/// Scenario file. Users, servers and channels are referred to by name.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    /// The acting user.
    #[serde(rename = "self")]
    pub me: String,
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub policy: PolicyState,
    #[serde(default)]
    pub channels: Vec<ChannelSpec>,
    #[serde(default)]
    pub voice_states: Vec<Placement>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    #[serde(default)]
    pub kind: ChannelKind,
    /// Server the channel belongs to; ignored for calls.
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default)]
    pub user_limit: u32,
    /// Capabilities the acting user holds on the channel.
    #[serde(default = "default_grants")]
    pub grants: Vec<Capability>,
}

fn default_server() -> String {
    "main".to_string()
}

fn default_grants() -> Vec<Capability> {
    vec![Capability::Connect]
}

#[derive(Debug, Clone, Deserialize)]
pub struct Placement {
    pub user: String,
    /// `null` takes the user out of voice.
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Move(Placement),
    Toggle(String),
    Pull,
    Unleash,
    Set { setting: PolicyToggle, value: bool },
}

impl Step {
    pub fn describe(&self) -> String {
        match self {
            Step::Move(p) => match &p.channel {
                Some(ch) => format!("move {} -> {}", p.user, ch),
                None => format!("move {} -> (left voice)", p.user),
            },
            Step::Toggle(user) => format!("toggle leash on {user}"),
            Step::Pull => "pull".to_string(),
            Step::Unleash => "unleash".to_string(),
            Step::Set { setting, value } => format!("set {} = {}", setting.as_str(), value),
        }
    }
}

/// Name <-> id tables. Users are created on first mention; channels must be declared.
#[derive(Default)]
pub struct Names {
    users: HashMap<String, UserId>,
    servers: HashMap<String, ServerId>,
    channels: HashMap<String, (ChannelId, VoiceScope)>,
    user_names: HashMap<UserId, String>,
    channel_names: HashMap<ChannelId, String>,
}

impl Names {
    pub fn user(&mut self, name: &str) -> UserId {
        if let Some(id) = self.users.get(name) {
            return *id;
        }
        let id = UserId::new();
        self.users.insert(name.to_string(), id);
        self.user_names.insert(id, name.to_string());
        id
    }

    pub fn declare_channel(&mut self, spec: &ChannelSpec) -> Result<(ChannelId, VoiceScope)> {
        if self.channels.contains_key(&spec.name) {
            return Err(anyhow!("channel {} declared twice", spec.name));
        }
        let scope = if spec.kind.is_private_call() {
            VoiceScope::Direct
        } else {
            VoiceScope::Server(*self.servers.entry(spec.server.clone()).or_default())
        };
        let id = ChannelId::new();
        self.channels.insert(spec.name.clone(), (id, scope));
        self.channel_names.insert(id, spec.name.clone());
        Ok((id, scope))
    }

    pub fn channel(&self, name: &str) -> Result<(ChannelId, VoiceScope)> {
        self.channels.get(name).copied().ok_or_else(|| anyhow!("unknown channel {name}"))
    }

    pub fn user_name(&self, id: UserId) -> String {
        self.user_names.get(&id).cloned().unwrap_or_else(|| id.to_string())
    }

    pub fn channel_name(&self, id: ChannelId) -> String {
        self.channel_names.get(&id).cloned().unwrap_or_else(|| id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_scenario_with_defaults() {
        let sc: Scenario = serde_json::from_str(
            r#"{
                "self": "me",
                "handler": "boss",
                "channels": [{ "name": "lobby" }, { "name": "call", "kind": "direct_call" }],
                "steps": ["pull", { "move": { "user": "boss", "channel": null } },
                          { "set": { "setting": "wait_for_space", "value": true } }]
            }"#,
        )
        .unwrap();

        assert_eq!(sc.me, "me");
        assert!(sc.policy.pull_on_leash_set);
        assert_eq!(sc.channels[0].grants, vec![Capability::Connect]);
        assert_eq!(sc.channels[0].user_limit, 0);
        assert_eq!(sc.channels[1].kind, ChannelKind::DirectCall);
        assert!(matches!(sc.steps[0], Step::Pull));
        assert_eq!(sc.steps[1].describe(), "move boss -> (left voice)");
        assert_eq!(sc.steps[2].describe(), "set wait_for_space = true");
    }

    #[test]
    fn names_are_stable_and_channels_scoped() {
        let mut names = Names::default();
        let a = names.user("alice");
        assert_eq!(names.user("alice"), a);
        assert_eq!(names.user_name(a), "alice");

        let spec = |name: &str, kind| ChannelSpec {
            name: name.into(),
            kind,
            server: default_server(),
            user_limit: 0,
            grants: default_grants(),
        };
        let (_, voice) = names.declare_channel(&spec("general", ChannelKind::Voice)).unwrap();
        let (_, call) = names.declare_channel(&spec("dm", ChannelKind::DirectCall)).unwrap();
        assert!(matches!(voice, VoiceScope::Server(_)));
        assert_eq!(call, VoiceScope::Direct);

        assert!(names.declare_channel(&spec("general", ChannelKind::Voice)).is_err());
        assert!(names.channel("nowhere").is_err());
    }
}
