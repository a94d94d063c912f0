use serde::{Deserialize, Serialize};

/// Capabilities the controller asks the host about, always for the acting user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// May connect to the channel at all.
    Connect,
    /// May move/manage members; also lets the holder exceed a channel's user limit.
    ManageMembers,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Connect => "connect",
            Capability::ManageMembers => "manage_members",
        }
    }
    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "connect" => Capability::Connect,
            "manage_members" => Capability::ManageMembers,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for cap in [Capability::Connect, Capability::ManageMembers] {
            assert_eq!(Capability::from_str(cap.as_str()), Some(cap));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert_eq!(Capability::from_str("speak"), None);
        assert_eq!(Capability::from_str(""), None);
    }
}
