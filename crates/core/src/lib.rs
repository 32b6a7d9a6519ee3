//! # vnchat Core
//!
//! Domain types, traits, and error definitions for the vnchat dialogue director.
//! This crate depends only on serde, thiserror and async-trait. It
//! defines the vocabulary every other crate speaks.
//!
//! ## Design Philosophy
//!
//! The model backend is a trait defined here; implementations live in
//! `vnchat-providers`. The director emits plain [`SceneCommand`] values
//! instead of mutating a renderer, and reads the display log as plain
//! [`TranscriptEntry`] values. This keeps the pipeline testable with
//! scripted providers and hand-built transcripts.

pub mod command;
pub mod error;
pub mod message;
pub mod provider;
pub mod session;
pub mod transcript;

// Re-export key types at crate root for ergonomics
pub use command::{ArgValue, CommandArg, CommandKind, SceneCommand};
pub use error::{Error, ProviderError, Result};
pub use message::{PromptMessage, Role};
pub use provider::{ChatRequest, ChatResponse, Provider, Usage};
pub use session::{SessionClock, SessionToken};
pub use transcript::TranscriptEntry;
