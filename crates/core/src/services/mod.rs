//! Business logic services.

#![allow(missing_docs)]

pub mod poll;
pub mod user;

pub use poll::{CreatePollInput, PollService, PollView, VoteGroup, VoteInput, apply_vote, project};
pub use user::{AuthSession, RegisterInput, UserService, UserView};
