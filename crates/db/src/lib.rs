//! Storage layer for quickpoll.
//!
//! Defines the persisted entities ([`entities`]) and the storage abstraction
//! ([`store`]) the business logic is written against. The concrete adapters
//! shipped here keep whole documents in process memory; the service layer
//! never depends on more than the [`store::PollStore`] / [`store::UserStore`]
//! contracts.

pub mod entities;
pub mod store;

pub use store::{
    MemoryPollStore, MemoryUserStore, PollStore, SharedPollStore, SharedUserStore, UserStore,
};
