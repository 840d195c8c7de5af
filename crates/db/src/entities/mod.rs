//! Persisted entity types.

pub mod poll;
pub mod user;

pub use poll::{Identity, Poll, Protection, VoteEntry};
pub use user::User;
