//! In-memory document store adapters.
//!
//! Documents are kept whole in a `BTreeMap` keyed by ULID, so iteration
//! yields creation order. Conditional operations take the write lock for
//! their full read-modify-write span, which is what the vote/delete race
//! guard needs.

use async_trait::async_trait;
use quickpoll_common::AppResult;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{PollStore, UserStore};
use crate::entities::{Poll, User, VoteEntry};

/// In-memory [`PollStore`].
#[derive(Debug, Default)]
pub struct MemoryPollStore {
    polls: RwLock<BTreeMap<String, Poll>>,
}

impl MemoryPollStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PollStore for MemoryPollStore {
    async fn find_all(&self) -> AppResult<Vec<Poll>> {
        let polls = self.polls.read().await;
        Ok(polls.values().cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Poll>> {
        let polls = self.polls.read().await;
        Ok(polls.get(id).cloned())
    }

    async fn insert(&self, poll: Poll) -> AppResult<Poll> {
        let mut polls = self.polls.write().await;
        polls.insert(poll.id.clone(), poll.clone());
        Ok(poll)
    }

    async fn update_votes(&self, id: &str, votes: Vec<VoteEntry>) -> AppResult<Option<Poll>> {
        let mut polls = self.polls.write().await;
        let Some(poll) = polls.get_mut(id) else {
            return Ok(None);
        };
        poll.votes = votes;
        Ok(Some(poll.clone()))
    }

    async fn remove_owned(&self, id: &str, identities: &[&str]) -> AppResult<u64> {
        let mut polls = self.polls.write().await;
        let owned = polls
            .get(id)
            .is_some_and(|poll| identities.contains(&poll.created_by.as_str()));
        if !owned {
            return Ok(0);
        }
        polls.remove(id);
        Ok(1)
    }
}

/// In-memory [`UserStore`].
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<BTreeMap<String, User>>,
}

impl MemoryUserStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn insert(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::Protection;
    use chrono::Utc;

    fn test_poll(id: &str, created_by: &str) -> Poll {
        Poll {
            id: id.to_string(),
            title: "title".to_string(),
            description: None,
            deck: vec!["1".to_string(), "2".to_string()],
            protection: Protection::None,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
            votes: vec![],
        }
    }

    #[tokio::test]
    async fn test_find_all_in_insertion_key_order() {
        let store = MemoryPollStore::new();
        store.insert(test_poll("a", "adrien")).await.unwrap();
        store.insert(test_poll("b", "adrien")).await.unwrap();
        store.insert(test_poll("c", "adrien")).await.unwrap();

        let ids: Vec<String> = store
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_update_votes_returns_affected_document() {
        let store = MemoryPollStore::new();
        store.insert(test_poll("a", "adrien")).await.unwrap();

        let updated = store
            .update_votes("a", vec![VoteEntry::anonymous("1")])
            .await
            .unwrap();
        let updated = updated.unwrap();
        assert_eq!(updated.votes.len(), 1);

        let stored = store.find_by_id("a").await.unwrap().unwrap();
        assert_eq!(stored.votes, updated.votes);
    }

    #[tokio::test]
    async fn test_update_votes_on_missing_poll_is_unaffected() {
        let store = MemoryPollStore::new();
        let updated = store
            .update_votes("gone", vec![VoteEntry::anonymous("1")])
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn test_remove_owned_requires_creator_match() {
        let store = MemoryPollStore::new();
        store.insert(test_poll("a", "adrien")).await.unwrap();

        assert_eq!(store.remove_owned("a", &["nobody"]).await.unwrap(), 0);
        assert!(store.find_by_id("a").await.unwrap().is_some());

        assert_eq!(
            store.remove_owned("a", &["nobody", "adrien"]).await.unwrap(),
            1
        );
        assert!(store.find_by_id("a").await.unwrap().is_none());

        // already gone
        assert_eq!(store.remove_owned("a", &["adrien"]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_user_store_lookup_by_username() {
        let store = MemoryUserStore::new();
        let user = User {
            id: "u1".to_string(),
            username: "adrien".to_string(),
            password_hash: "hash".to_string(),
            created_at: Utc::now(),
        };
        store.insert(user).await.unwrap();

        assert!(
            store
                .find_by_username("adrien")
                .await
                .unwrap()
                .is_some()
        );
        assert!(store.find_by_username("nobody").await.unwrap().is_none());
        assert!(store.find_by_id("u1").await.unwrap().is_some());
    }
}
