//! Local sink implementations

#[cfg(feature = "console")]
pub mod console;
pub mod json;

#[cfg(feature = "console")]
pub use console::{ConsoleAppender, Stream};
pub use json::JsonAppender;

pub use crate::core::Appender;
