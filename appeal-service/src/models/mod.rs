//! Domain models for the appeal service.

pub mod appeal;
pub mod conversation;
pub mod run;

pub use appeal::{AppealResult, Decision, SubmittedAppeal};
pub use conversation::{Conversation, ConversationTurn, Role};
pub use run::{FileMetadata, RagRequest, RagResponse, Run, RunRequest, RunStatus, Tool};
