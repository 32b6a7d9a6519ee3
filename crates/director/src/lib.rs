//! The dialogue director — from player utterance to scene commands.
//!
//! A turn flows through the crate like this:
//!
//! 1. **Context**: story documents are loaded into a [`StoryContext`]
//!    (settings, lookup tables, character cards, world books)
//! 2. **Prompt**: history is compacted, lore is activated against the recent
//!    window, and everything is assembled into one message list
//! 3. **Model**: the prompt goes to the configured provider, retried on
//!    empty replies
//! 4. **Tags**: each reply paragraph is scanned for directives and cleaned
//! 5. **Stage**: directives are resolved through the tables and turned into
//!    ordered [`SceneCommand`](vnchat_core::SceneCommand)s
//!
//! [`TurnRunner`] drives all five steps for one utterance.

pub mod catalog;
pub mod context;
pub mod paginate;
pub mod prompt;
pub mod stage;
pub mod tables;
pub mod tags;
pub mod turn;

#[cfg(test)]
mod test_helpers;

pub use catalog::{CardCatalog, CharacterCard, DocumentKind, LoreEntry, LorePosition};
pub use context::{ContextSummary, StoryContext};
pub use paginate::TextPaginator;
pub use prompt::{HistoryCompactor, LoreActivationEngine, PromptInput};
pub use stage::{DialogueOrchestrator, Roster, ScreenEntity};
pub use tables::{CharacterTable, KeyValueTable, LookupTables, SceneTable};
pub use tags::{DirectiveBundle, Live2DDirective, TagExtractor};
pub use turn::{ChannelFlags, TurnOutcome, TurnRequest, TurnRunner};
