//! Prompt construction pipeline.
//!
//! | Stage | Input | Output |
//! |-------|-------|--------|
//! | History | Transcript | Role-tagged messages, oldest first |
//! | Activation | Lore catalog + search window | Activated entries |
//! | Assembly | Templates, characters, history, lore | Final message list |

pub mod activation;
pub mod assembler;
pub mod history;

pub use activation::{LoreActivationEngine, activate};
pub use assembler::{PromptInput, assemble, insert_from_back, sort_lore};
pub use history::HistoryCompactor;
