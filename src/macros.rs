//! Emission macros building the attribute map inline.
//!
//! Attribute keys are written as identifiers and become the template's
//! placeholder names, so `name = "world"` fills `{name}`.
//!
//! # Examples
//!
//! ```no_run
//! use otlp_log_emitter::prelude::*;
//! use otlp_log_emitter::{emit, warning};
//!
//! let emitter = Emitter::builder().build();
//!
//! // Level picked by the emitter's level policy
//! emit!(emitter, "hello {name}", name = "world")?;
//!
//! // Explicit level
//! emit!(emitter, Level::Error, "payment {id} failed", id = 42)?;
//! warning!(emitter, "disk at {pct}%", pct = 91.5)?;
//! # Ok::<(), EmitterError>(())
//! ```

/// Emit a record, with an optional explicit level.
///
/// Expands to [`Emitter::emit`](crate::Emitter::emit) and returns its
/// `Result<LogRecord>`.
#[macro_export]
macro_rules! emit {
    ($emitter:expr, $template:literal $(, $key:ident = $value:expr)* $(,)?) => {
        $emitter.emit(
            $template,
            ::core::option::Option::None,
            $crate::core::Attributes::new()$(.with(stringify!($key), $value))*,
        )
    };
    ($emitter:expr, $level:expr, $template:literal $(, $key:ident = $value:expr)* $(,)?) => {
        $emitter.emit(
            $template,
            ::core::option::Option::Some($level),
            $crate::core::Attributes::new()$(.with(stringify!($key), $value))*,
        )
    };
}

/// Emit a debug-level record.
#[macro_export]
macro_rules! debug {
    ($emitter:expr, $($arg:tt)+) => {
        $crate::emit!($emitter, $crate::Level::Debug, $($arg)+)
    };
}

/// Emit an info-level record.
#[macro_export]
macro_rules! info {
    ($emitter:expr, $($arg:tt)+) => {
        $crate::emit!($emitter, $crate::Level::Info, $($arg)+)
    };
}

/// Emit a warning-level record.
#[macro_export]
macro_rules! warning {
    ($emitter:expr, $($arg:tt)+) => {
        $crate::emit!($emitter, $crate::Level::Warning, $($arg)+)
    };
}

/// Emit an error-level record.
#[macro_export]
macro_rules! error {
    ($emitter:expr, $($arg:tt)+) => {
        $crate::emit!($emitter, $crate::Level::Error, $($arg)+)
    };
}

/// Emit a critical-level record.
#[macro_export]
macro_rules! critical {
    ($emitter:expr, $($arg:tt)+) => {
        $crate::emit!($emitter, $crate::Level::Critical, $($arg)+)
    };
}
