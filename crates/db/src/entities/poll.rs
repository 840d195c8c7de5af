//! Poll entity and vote ledger types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Anti-abuse protection mode of a poll.
///
/// Selects which viewer identity field is used to deduplicate votes.
/// Immutable after creation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Protection {
    /// Every vote is an independent tally contribution.
    None,
    /// At most one vote per client IP address.
    Ip,
    /// At most one vote per authenticated username.
    Authenticated,
}

impl Protection {
    /// Returns the viewer identity value used for vote deduplication,
    /// or `None` when this mode does not deduplicate ([`Self::None`])
    /// or the viewer lacks the required field.
    #[must_use]
    pub fn dedup_identity<'a>(self, viewer: &'a Identity) -> Option<&'a str> {
        match self {
            Self::None => None,
            Self::Ip => viewer.ip.as_deref(),
            Self::Authenticated => viewer.username.as_deref(),
        }
    }

}

impl FromStr for Protection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(Self::None),
            "IP" => Ok(Self::Ip),
            "AUTHENTICATED" => Ok(Self::Authenticated),
            _ => Err(()),
        }
    }
}

/// Per-request viewer identity, derived by the authentication layer.
///
/// Not persisted. Either field may be absent; an anonymous viewer with no
/// IP can still vote on [`Protection::None`] polls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Identity {
    /// Authenticated username, if any.
    pub username: Option<String>,
    /// Client IP address, if known.
    pub ip: Option<String>,
}

impl Identity {
    /// The identity value recorded as a poll's creator: username when
    /// authenticated, IP address otherwise.
    #[must_use]
    pub fn dedup_key(&self) -> Option<&str> {
        self.username.as_deref().or(self.ip.as_deref())
    }

    /// Whether either identity field matches the given creator identity.
    #[must_use]
    pub fn owns(&self, created_by: &str) -> bool {
        self.username.as_deref() == Some(created_by) || self.ip.as_deref() == Some(created_by)
    }
}

/// One recorded vote in a poll's ledger.
///
/// `identity` is the voter's deduplication identity under [`Protection::Ip`]
/// and [`Protection::Authenticated`]; anonymous entries (unprotected polls)
/// carry no identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEntry {
    /// The chosen option, always a member of the poll's deck.
    #[serde(rename = "v")]
    pub value: String,

    /// Voter identity used for deduplication, absent for anonymous votes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
}

impl VoteEntry {
    /// An anonymous, non-deduplicated entry.
    #[must_use]
    pub fn anonymous(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            identity: None,
        }
    }

    /// An entry tied to a deduplication identity.
    #[must_use]
    pub fn identified(value: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            identity: Some(identity.into()),
        }
    }
}

/// A poll document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    /// Opaque unique identifier, assigned at creation.
    pub id: String,

    /// Required poll title.
    pub title: String,

    /// Optional free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered option labels; defines the legal vote values. Immutable.
    pub deck: Vec<String>,

    /// Vote deduplication policy. Immutable.
    pub protection: Protection,

    /// Creator's deduplication identity. Used only for ownership checks
    /// and never serialized into API output.
    #[serde(default, skip_serializing)]
    pub created_by: String,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// The vote ledger. Mutated only by the vote operation.
    #[serde(default)]
    pub votes: Vec<VoteEntry>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_protection_from_str() {
        assert_eq!("NONE".parse::<Protection>().unwrap(), Protection::None);
        assert_eq!("IP".parse::<Protection>().unwrap(), Protection::Ip);
        assert_eq!(
            "AUTHENTICATED".parse::<Protection>().unwrap(),
            Protection::Authenticated
        );
        assert!("UNKNOWN".parse::<Protection>().is_err());
        assert!("ip".parse::<Protection>().is_err());
    }

    #[test]
    fn test_protection_serde_round_trip() {
        let json = serde_json::to_string(&Protection::Authenticated).unwrap();
        assert_eq!(json, "\"AUTHENTICATED\"");
        let parsed: Protection = serde_json::from_str("\"IP\"").unwrap();
        assert_eq!(parsed, Protection::Ip);
    }

    #[test]
    fn test_dedup_identity_per_mode() {
        let viewer = Identity {
            username: Some("adrien".to_string()),
            ip: Some("1.1.1.1".to_string()),
        };

        assert_eq!(Protection::None.dedup_identity(&viewer), None);
        assert_eq!(Protection::Ip.dedup_identity(&viewer), Some("1.1.1.1"));
        assert_eq!(
            Protection::Authenticated.dedup_identity(&viewer),
            Some("adrien")
        );

        let anonymous = Identity::default();
        assert_eq!(Protection::Ip.dedup_identity(&anonymous), None);
        assert_eq!(Protection::Authenticated.dedup_identity(&anonymous), None);
    }

    #[test]
    fn test_identity_dedup_key_prefers_username() {
        let both = Identity {
            username: Some("adrien".to_string()),
            ip: Some("1.1.1.1".to_string()),
        };
        assert_eq!(both.dedup_key(), Some("adrien"));

        let ip_only = Identity {
            username: None,
            ip: Some("1.1.1.1".to_string()),
        };
        assert_eq!(ip_only.dedup_key(), Some("1.1.1.1"));

        assert_eq!(Identity::default().dedup_key(), None);
    }

    #[test]
    fn test_identity_owns_matches_either_field() {
        let viewer = Identity {
            username: Some("adrien".to_string()),
            ip: Some("1.1.1.1".to_string()),
        };
        assert!(viewer.owns("adrien"));
        assert!(viewer.owns("1.1.1.1"));
        assert!(!viewer.owns("nobody"));
    }

    #[test]
    fn test_created_by_is_never_serialized() {
        let poll = Poll {
            id: "p1".to_string(),
            title: "t".to_string(),
            description: None,
            deck: vec!["1".to_string(), "2".to_string()],
            protection: Protection::None,
            created_by: "adrien".to_string(),
            created_at: Utc::now(),
            votes: vec![VoteEntry::anonymous("1")],
        };

        let json = serde_json::to_value(&poll).unwrap();
        assert!(json.get("createdBy").is_none());
        assert!(json.get("created_by").is_none());
        assert_eq!(json["deck"], serde_json::json!(["1", "2"]));
    }

    #[test]
    fn test_anonymous_entry_serializes_without_identity() {
        let entry = VoteEntry::anonymous("2");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({ "v": "2" }));

        let tagged = VoteEntry::identified("2", "1.1.1.1");
        let json = serde_json::to_value(&tagged).unwrap();
        assert_eq!(json, serde_json::json!({ "v": "2", "identity": "1.1.1.1" }));
    }
}
