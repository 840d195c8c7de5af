//! Storage abstraction.
//!
//! Business logic is written against these traits; concrete adapters are
//! injected at wiring time. The vote path relies on [`PollStore::update_votes`]
//! re-checking existence under the same guard that applies the write, so a
//! vote racing a delete surfaces as "nothing updated" instead of resurrecting
//! the poll from a stale snapshot.

mod memory;

use async_trait::async_trait;
use quickpoll_common::AppResult;
use std::sync::Arc;

use crate::entities::{Poll, User, VoteEntry};

pub use memory::{MemoryPollStore, MemoryUserStore};

/// Poll document storage.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// All stored polls, in creation order.
    async fn find_all(&self) -> AppResult<Vec<Poll>>;

    /// A single poll by id.
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Poll>>;

    /// Persist a new poll and return the stored document.
    async fn insert(&self, poll: Poll) -> AppResult<Poll>;

    /// Replace a poll's vote ledger, only if the poll still exists.
    ///
    /// Returns the updated document, or `None` when no document was
    /// affected (the poll was deleted concurrently).
    async fn update_votes(&self, id: &str, votes: Vec<VoteEntry>) -> AppResult<Option<Poll>>;

    /// Remove a poll only if its creator identity is one of `identities`.
    ///
    /// Returns the number of removed documents (0 or 1). A missing poll and
    /// a non-matching creator are indistinguishable here.
    async fn remove_owned(&self, id: &str, identities: &[&str]) -> AppResult<u64>;
}

/// User account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// A single user by id.
    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>>;

    /// A single user by login name.
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Persist a new user and return the stored document.
    async fn insert(&self, user: User) -> AppResult<User>;
}

/// Shared handle to a poll store implementation.
pub type SharedPollStore = Arc<dyn PollStore>;

/// Shared handle to a user store implementation.
pub type SharedUserStore = Arc<dyn UserStore>;
