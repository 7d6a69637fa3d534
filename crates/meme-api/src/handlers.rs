//! Request handlers.

pub mod health;
pub mod meme;

pub use health::*;
pub use meme::*;
