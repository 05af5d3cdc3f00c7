//! Severity resolution for records emitted without an explicit level
//!
//! An explicit level always wins. When the caller leaves the level out, a
//! [`LevelPolicy`] decides. [`UniformRandomLevel`] picks uniformly over
//! [`Level::ALL`], which is useful for demo and traffic-generation setups;
//! production deployments usually install a [`FixedLevel`] instead.

use super::log_level::Level;
use rand::seq::SliceRandom;

/// Strategy for the level of records emitted without one
pub trait LevelPolicy: Send + Sync {
    /// Level to use when the caller did not specify one
    fn fallback(&self) -> Level;

    /// Resolve the effective level of a record
    fn resolve(&self, explicit: Option<Level>) -> Level {
        explicit.unwrap_or_else(|| self.fallback())
    }

    fn name(&self) -> &str;
}

/// Uniformly random fallback over every level
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformRandomLevel;

impl LevelPolicy for UniformRandomLevel {
    fn fallback(&self) -> Level {
        *Level::ALL
            .choose(&mut rand::thread_rng())
            .unwrap_or(&Level::Info)
    }

    fn name(&self) -> &str {
        "uniform_random"
    }
}

/// Fixed fallback level
#[derive(Debug, Clone, Copy)]
pub struct FixedLevel(pub Level);

impl Default for FixedLevel {
    fn default() -> Self {
        FixedLevel(Level::Info)
    }
}

impl LevelPolicy for FixedLevel {
    fn fallback(&self) -> Level {
        self.0
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Resolve with the uniform random fallback
pub fn resolve_level(explicit: Option<Level>) -> Level {
    UniformRandomLevel.resolve(explicit)
}
