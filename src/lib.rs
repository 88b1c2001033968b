//! Gemini-backed creative studio
//!
//! Edits images from text instructions, restyles and refines interior-design
//! photos, turns still images into videos through a long-running operation
//! poller, and runs multi-turn chat sessions.

pub mod ai;
pub mod error;
pub mod media;
pub mod models;
pub mod prompts;
pub mod session;
pub mod studio;
pub mod video;

pub use error::{Error, Result};
