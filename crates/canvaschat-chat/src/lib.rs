//! Conversation orchestration for canvaschat
//!
//! This crate provides per-modality conversation state management, the
//! orchestrators that coordinate state with a provider client, the
//! turn-limiting and rehydration protocol, SVG extraction, and the
//! consumer-facing message dispatcher.

pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod modality;
pub mod orchestrator;
pub mod svg;

// Re-export commonly used types
pub use conversation::{Conversation, ConversationManager};
pub use dispatch::MessageDispatcher;
pub use error::ChatError;
pub use modality::{
    Exchange, ImageModality, ImageOutput, ImageParams, ModalityAdapter, SvgModality, SvgOutput,
    SvgParams, TextModality, TextParams,
};
pub use orchestrator::{Orchestrator, SendOptions, SendResult};
pub use svg::{extract_svg, SvgExtractionError};
