//! Local chat session mirror
//!
//! The backend owns every session. This is the copy the chat view renders
//! and classifies against, refreshed wholesale on load.

pub mod store;

pub use store::ChatHistory;
