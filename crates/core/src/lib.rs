//! Core business logic for quickpoll.

pub mod services;

pub use services::*;
