//! Poll service.

use chrono::{DateTime, Utc};
use quickpoll_common::{AppError, AppResult, IdGenerator};
use quickpoll_db::{
    SharedPollStore,
    entities::{Identity, Poll, Protection, VoteEntry},
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Poll service for business logic.
#[derive(Clone)]
pub struct PollService {
    store: SharedPollStore,
    id_gen: IdGenerator,
}

/// Input for creating a poll.
///
/// Fields default so that missing request values reach validation instead of
/// failing deserialization; `deck` accepts any JSON scalars and is coerced to
/// text labels.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreatePollInput {
    pub title: String,
    pub description: Option<String>,
    pub deck: Vec<JsonValue>,
    pub protection: Option<String>,
}

/// Input for casting a vote.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VoteInput {
    pub vote: Option<JsonValue>,
}

/// One aggregated tally group in a [`PollView`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoteGroup {
    /// The option label.
    pub option: String,
    /// Number of ledger entries for this option.
    pub count: u64,
}

/// Viewer-personalized, aggregated projection of a poll.
///
/// The raw ledger is replaced by per-option tallies; `voted` and `owns` are
/// present only when they apply to the viewer, and the creator identity is
/// stripped.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollView {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub deck: Vec<String>,
    pub protection: Protection,
    pub created_at: DateTime<Utc>,
    pub votes_count: usize,
    pub votes: Vec<VoteGroup>,
    /// The viewer's own recorded choice, when deduplication found one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voted: Option<String>,
    /// Present (and `true`) only for the poll's creator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owns: Option<bool>,
}

/// Coerce a JSON scalar to a text label. Composite values have no label.
fn coerce_label(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

/// Apply one vote to a poll's ledger and return the new ledger.
///
/// Pure: the stored poll is untouched, persistence is the caller's job.
/// Under [`Protection::Ip`] / [`Protection::Authenticated`], a repeat vote
/// from the same identity replaces the existing entry in place, so the
/// ledger never holds two entries for one identity. Re-voting the same
/// value is a valid idempotent no-op, not an error.
pub fn apply_vote(poll: &Poll, viewer: &Identity, choice: &str) -> AppResult<Vec<VoteEntry>> {
    if !poll.deck.iter().any(|card| card == choice) {
        return Err(AppError::InvalidVoteOption(choice.to_string()));
    }

    let dedup = match poll.protection {
        Protection::None => None,
        Protection::Ip | Protection::Authenticated => Some(
            poll.protection
                .dedup_identity(viewer)
                .ok_or(AppError::Unauthorized)?,
        ),
    };

    let mut votes = poll.votes.clone();
    match dedup {
        None => votes.push(VoteEntry::anonymous(choice)),
        Some(identity) => {
            if let Some(entry) = votes
                .iter_mut()
                .find(|entry| entry.identity.as_deref() == Some(identity))
            {
                entry.value = choice.to_string();
            } else {
                votes.push(VoteEntry::identified(choice, identity));
            }
        }
    }

    Ok(votes)
}

/// Aggregate a poll into its viewer-personalized projection.
///
/// Tally groups are ordered by count descending; ties keep the order in
/// which each option's first vote entered the ledger.
#[must_use]
pub fn project(poll: Poll, viewer: &Identity) -> PollView {
    let voted = poll
        .protection
        .dedup_identity(viewer)
        .and_then(|key| {
            poll.votes
                .iter()
                .find(|entry| entry.identity.as_deref() == Some(key))
        })
        .map(|entry| entry.value.clone());

    let owns = viewer.owns(&poll.created_by).then_some(true);

    let mut groups: Vec<VoteGroup> = Vec::new();
    for entry in &poll.votes {
        match groups.iter_mut().find(|group| group.option == entry.value) {
            Some(group) => group.count += 1,
            None => groups.push(VoteGroup {
                option: entry.value.clone(),
                count: 1,
            }),
        }
    }
    // stable sort: equal counts keep first-appearance order
    groups.sort_by(|a, b| b.count.cmp(&a.count));

    PollView {
        id: poll.id,
        title: poll.title,
        description: poll.description,
        deck: poll.deck,
        protection: poll.protection,
        created_at: poll.created_at,
        votes_count: poll.votes.len(),
        votes: groups,
        voted,
        owns,
    }
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub const fn new(store: SharedPollStore) -> Self {
        Self {
            store,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a poll.
    ///
    /// Returns the stored poll as-is; callers needing tallies must project
    /// separately.
    pub async fn create(&self, viewer: &Identity, input: CreatePollInput) -> AppResult<Poll> {
        if input.title.is_empty() {
            return Err(AppError::WrongParams("title is required".to_string()));
        }
        if input.deck.is_empty() {
            return Err(AppError::WrongParams("deck must not be empty".to_string()));
        }

        let deck = input
            .deck
            .iter()
            .map(coerce_label)
            .collect::<Option<Vec<String>>>()
            .ok_or_else(|| AppError::WrongParams("deck entries must be scalar values".to_string()))?;

        let protection: Protection = input
            .protection
            .as_deref()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| {
                AppError::WrongParams(
                    "protection must be one of NONE, IP, AUTHENTICATED".to_string(),
                )
            })?;

        let created_by = viewer
            .dedup_key()
            .ok_or_else(|| AppError::WrongParams("viewer identity is required".to_string()))?
            .to_string();

        let poll = Poll {
            id: self.id_gen.generate(),
            title: input.title,
            description: input.description,
            deck,
            protection,
            created_by,
            created_at: Utc::now(),
            votes: Vec::new(),
        };

        let poll = self.store.insert(poll).await?;
        tracing::debug!(poll_id = %poll.id, protection = ?poll.protection, "Created poll");
        Ok(poll)
    }

    /// Cast a vote and return the projection of the updated poll.
    ///
    /// `Ok(None)` is the no-op outcome: the poll does not exist, or it was
    /// deleted between the ledger read and the conditional write. It is
    /// neither success nor failure and callers map it to "nothing changed".
    pub async fn vote(
        &self,
        viewer: &Identity,
        poll_id: &str,
        input: VoteInput,
    ) -> AppResult<Option<PollView>> {
        if poll_id.is_empty() {
            return Err(AppError::WrongParams("poll id is required".to_string()));
        }
        let choice = input
            .vote
            .as_ref()
            .and_then(coerce_label)
            .ok_or_else(|| AppError::WrongParams("vote is required".to_string()))?;

        let Some(poll) = self.store.find_by_id(poll_id).await? else {
            return Ok(None);
        };

        let votes = apply_vote(&poll, viewer, &choice)?;

        let Some(updated) = self.store.update_votes(poll_id, votes).await? else {
            return Ok(None);
        };

        tracing::debug!(poll_id = %poll_id, "Recorded vote");
        Ok(Some(project(updated, viewer)))
    }

    /// Delete a poll owned by the viewer.
    ///
    /// Returns whether a poll was actually removed. An unauthorized viewer
    /// and a missing poll are indistinguishable here.
    pub async fn delete(&self, viewer: &Identity, poll_id: &str) -> AppResult<bool> {
        let identities: Vec<&str> = viewer
            .username
            .as_deref()
            .into_iter()
            .chain(viewer.ip.as_deref())
            .collect();
        if identities.is_empty() {
            return Ok(false);
        }

        let affected = self.store.remove_owned(poll_id, &identities).await?;
        if affected > 0 {
            tracing::debug!(poll_id = %poll_id, "Deleted poll");
        }
        Ok(affected > 0)
    }

    /// All polls, projected for the viewer.
    pub async fn get_all(&self, viewer: &Identity) -> AppResult<Vec<PollView>> {
        let polls = self.store.find_all().await?;
        Ok(polls.into_iter().map(|poll| project(poll, viewer)).collect())
    }

    /// One poll by id, projected for the viewer.
    pub async fn get_by_id(&self, viewer: &Identity, poll_id: &str) -> AppResult<Option<PollView>> {
        Ok(self
            .store
            .find_by_id(poll_id)
            .await?
            .map(|poll| project(poll, viewer)))
    }
}
