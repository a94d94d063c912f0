use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use vp_leash::{
    Channel, HostCall, InMemoryHost, LeashHandle, Notification, PullResult, SettingsStore,
};

use crate::scenario::{Names, Placement, Scenario, Step};

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Upper bound on delivery rounds after each step.
    pub max_rounds: usize,
    pub mailbox: usize,
}

#[derive(Debug, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub step: String,
    pub actions: Vec<String>,
    pub notifications: Vec<Notification>,
    /// Events were still queued when `max_rounds` ran out.
    pub unsettled: bool,
}

#[derive(Debug, Serialize)]
pub struct SimReport {
    pub scenario: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub steps: Vec<StepReport>,
    pub final_channel: Option<String>,
    pub final_handler: Option<String>,
    pub total_joins: usize,
    pub total_disconnects: usize,
}

pub async fn run(scenario: Scenario, opts: RunOptions) -> Result<SimReport> {
    let mut names = Names::default();
    let me = names.user(&scenario.me);
    let host = InMemoryHost::new(me);

    for spec in &scenario.channels {
        let (id, scope) = names.declare_channel(spec)?;
        host.add_channel(Channel { id, scope, kind: spec.kind, user_limit: spec.user_limit });
        for cap in &spec.grants {
            host.grant(id, *cap);
        }
    }
    for p in &scenario.voice_states {
        place(&host, &mut names, p)?;
    }
    // the starting layout is not news to anyone
    host.take_events();

    let mut policy = scenario.policy.clone();
    if let Some(h) = scenario.handler.as_deref() {
        policy.handler = Some(names.user(h));
    }
    host.save(&policy)?;

    let leash = LeashHandle::start(me, host.clone(), opts.mailbox);
    let mut steps = Vec::with_capacity(scenario.steps.len());
    let (mut seen_calls, mut seen_notes) = (0, 0);

    for (index, step) in scenario.steps.iter().enumerate() {
        let desc = step.describe();
        info!(index, "{desc}");

        match step {
            Step::Move(p) => place(&host, &mut names, p)?,
            Step::Toggle(user) => {
                let user = names.user(user);
                match leash.toggle(user).await? {
                    Ok(t) => log_pull(t.pull),
                    Err(e) => warn!("toggle refused: {e}"),
                }
            }
            Step::Pull => log_pull(leash.pull().await?),
            Step::Unleash => {
                leash.unleash().await?;
            }
            Step::Set { setting, value } => {
                leash.set_toggle(*setting, *value).await?;
            }
        }

        let mut unsettled = true;
        for _ in 0..opts.max_rounds {
            let events = host.take_events();
            if events.is_empty() {
                unsettled = false;
                break;
            }
            log_pull(leash.deliver(events).await?);
        }
        if unsettled {
            warn!(index, "events still pending after {} rounds", opts.max_rounds);
        }

        let calls = host.calls();
        let notes = host.notifications();
        steps.push(StepReport {
            index,
            step: desc,
            actions: calls[seen_calls..].iter().map(|c| describe_call(&names, c)).collect(),
            notifications: notes[seen_notes..].to_vec(),
            unsettled,
        });
        seen_calls = calls.len();
        seen_notes = notes.len();
    }

    let final_policy = leash.policy().await?;
    leash.shutdown().await;

    let calls = host.calls();
    Ok(SimReport {
        scenario: scenario.name.clone(),
        generated_at: Utc::now(),
        steps,
        final_channel: host.channel_of(me).map(|c| names.channel_name(c)),
        final_handler: final_policy.handler.map(|h| names.user_name(h)),
        total_joins: calls.iter().filter(|c| matches!(c, HostCall::Join(_))).count(),
        total_disconnects: calls.iter().filter(|c| matches!(c, HostCall::Disconnect)).count(),
    })
}

fn place(host: &InMemoryHost, names: &mut Names, p: &Placement) -> Result<()> {
    let user = names.user(&p.user);
    match p.channel.as_deref() {
        Some(name) => {
            let (id, scope) = names.channel(name)?;
            host.place(user, scope, Some(id));
        }
        None => {
            host.remove(user);
        }
    }
    Ok(())
}

fn describe_call(names: &Names, call: &HostCall) -> String {
    match call {
        HostCall::Join(ch) => format!("join {}", names.channel_name(*ch)),
        HostCall::Disconnect => "disconnect".to_string(),
    }
}

fn log_pull(res: Option<PullResult>) {
    match res {
        Some(Ok(p)) => info!("{p}"),
        Some(Err(e)) => info!("no move: {e}"),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPTS: RunOptions = RunOptions { max_rounds: 8, mailbox: vp_leash::DEFAULT_MAILBOX };

    fn scenario(json: &str) -> Scenario {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn waits_for_space_then_joins() {
        let sc = scenario(
            r#"{
                "self": "me",
                "handler": "boss",
                "policy": { "wait_for_space": true },
                "channels": [
                    { "name": "lobby" },
                    { "name": "meeting", "user_limit": 2 }
                ],
                "voice_states": [
                    { "user": "me", "channel": "lobby" },
                    { "user": "boss", "channel": "meeting" },
                    { "user": "guest", "channel": "meeting" }
                ],
                "steps": [
                    "pull",
                    { "move": { "user": "guest", "channel": null } }
                ]
            }"#,
        );

        let report = run(sc, OPTS).await.unwrap();
        assert!(report.steps[0].actions.is_empty());
        assert_eq!(report.steps[0].notifications.len(), 1);
        assert_eq!(report.steps[1].actions, vec!["join meeting".to_string()]);
        assert_eq!(report.final_channel.as_deref(), Some("meeting"));
        assert_eq!(report.total_joins, 1);
    }

    #[tokio::test]
    async fn toggle_follow_and_release() {
        let sc = scenario(
            r#"{
                "self": "me",
                "policy": { "leash_release_on_leave": true },
                "channels": [{ "name": "a" }, { "name": "b" }],
                "voice_states": [{ "user": "boss", "channel": "a" }],
                "steps": [
                    { "toggle": "boss" },
                    { "move": { "user": "boss", "channel": "b" } },
                    { "move": { "user": "boss", "channel": null } },
                    { "toggle": "boss" }
                ]
            }"#,
        );

        let report = run(sc, OPTS).await.unwrap();
        assert_eq!(report.steps[0].actions, vec!["join a".to_string()]);
        assert_eq!(report.steps[1].actions, vec!["join b".to_string()]);
        assert_eq!(report.steps[2].actions, vec!["disconnect".to_string()]);
        assert!(report.steps.iter().all(|s| !s.unsettled));
        assert_eq!(report.final_channel, None);
        assert_eq!(report.final_handler, None);
        assert_eq!(report.total_disconnects, 1);
    }

    #[tokio::test]
    async fn unknown_channel_is_an_error() {
        let sc = scenario(
            r#"{ "self": "me", "steps": [{ "move": { "user": "x", "channel": "nowhere" } }] }"#,
        );
        assert!(run(sc, OPTS).await.is_err());
    }
}
