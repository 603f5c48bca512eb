//! Dialogue state machinery
//!
//! Rule-ordered classifiers that read the assistant's outgoing text and the
//! user's terse replies, carrying one pending action across a turn boundary.

pub mod extractor;
pub mod instruction;
pub mod resolver;
pub mod rules;

pub use extractor::extract;
pub use instruction::state_instruction;
pub use resolver::{resolve, ShortReply, ShortReplyResolver, ShortReplyVocabulary};
pub use rules::{Rule, RuleSet};
