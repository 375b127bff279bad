//! rchat-tui: Terminal UI components
//!
//! Presentation of chat messages (markdown and highlighted code), paced
//! reveal of replies, and the ratatui widgets the chat screen is built from.

pub mod feedback;
pub mod highlight;
pub mod input;
pub mod markdown;
pub mod present;
pub mod reveal;
pub mod theme;
pub mod widgets;

pub use feedback::{Feedback, Reaction};
pub use present::{Presentation, detect_code_block, present};
pub use reveal::{DEFAULT_REVEAL_INTERVAL, RevealPacer};
pub use theme::Theme;
