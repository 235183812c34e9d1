//! Migration state machine
//!
//! `Evaluating -> Applying -> Migrated` or `Evaluating -> Blocked`. There is
//! no resumable state: a blocked migration starts over from `Evaluating`.

use crate::error::MigrationError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationState {
    Evaluating,
    Applying,
    Migrated,
    Blocked,
}

impl MigrationState {
    /// Whether no further transition is possible
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Migrated | Self::Blocked)
    }
}

impl Display for MigrationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Evaluating => "EVALUATING",
            Self::Applying => "APPLYING",
            Self::Migrated => "MIGRATED",
            Self::Blocked => "BLOCKED",
        };
        f.write_str(name)
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: MigrationState) -> Vec<MigrationState> {
    use MigrationState::{Applying, Blocked, Evaluating, Migrated};
    match from {
        Evaluating => vec![Applying, Blocked],
        Applying => vec![Migrated],
        Migrated | Blocked => vec![],
    }
}

/// Validates a state transition
pub fn validate_transition(from: MigrationState, to: MigrationState) -> Result<(), MigrationError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(MigrationError::IllegalTransition { from, to })
    }
}

/// States a migration went through, starting at `Evaluating`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trail(Vec<MigrationState>);

impl Trail {
    #[must_use]
    pub fn new() -> Self {
        Self(vec![MigrationState::Evaluating])
    }

    #[inline]
    #[must_use]
    pub fn current(&self) -> MigrationState {
        self.0.last().copied().unwrap_or(MigrationState::Evaluating)
    }

    /// Move to `to` if the transition is legal
    pub fn advance(&mut self, to: MigrationState) -> Result<(), MigrationError> {
        let from = self.current();
        validate_transition(from, to)?;
        tracing::debug!("migration state {} -> {}", from, to);
        self.0.push(to);
        Ok(())
    }

    #[must_use]
    pub fn states(&self) -> &[MigrationState] {
        &self.0
    }
}

impl Default for Trail {
    fn default() -> Self {
        Self::new()
    }
}
