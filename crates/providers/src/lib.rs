//! Model endpoint clients for vnchat.
//!
//! All providers implement the `vnchat_core::Provider` trait.
//! [`RetryOnEmpty`] wraps any of them with the bounded empty-reply retry
//! the turn runner relies on.

pub mod openai_compat;
pub mod retry;

pub use openai_compat::OpenAiCompatProvider;
pub use retry::RetryOnEmpty;
