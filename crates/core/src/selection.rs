//! Employee selection and the session context that carries it.
//!
//! Filter-based selection replaces the current set rather than extending it.
//! Every operation is idempotent for identical arguments.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::calculator::AdjustmentConfig;
use crate::employee::Employee;
use crate::error::CoreError;
use crate::types::DbId;

/// The set of employees targeted by a pending adjustment.
///
/// Ordered so that previews built from it are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    ids: BTreeSet<DbId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids(ids: impl IntoIterator<Item = DbId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Select every employee in the roster.
    pub fn select_all(&mut self, roster: &[Employee]) {
        self.ids = roster.iter().map(|e| e.id).collect();
    }

    pub fn deselect_all(&mut self) {
        self.ids.clear();
    }

    /// Replace the selection with the employees of one department.
    pub fn select_by_department(&mut self, roster: &[Employee], department: &str) {
        self.ids = roster
            .iter()
            .filter(|e| e.department == department)
            .map(|e| e.id)
            .collect();
    }

    /// Replace the selection with the employees holding one position.
    pub fn select_by_position(&mut self, roster: &[Employee], position: &str) {
        self.ids = roster
            .iter()
            .filter(|e| e.position == position)
            .map(|e| e.id)
            .collect();
    }

    /// Add the employee if absent, remove it if present.
    pub fn toggle(&mut self, employee_id: DbId) {
        if !self.ids.remove(&employee_id) {
            self.ids.insert(employee_id);
        }
    }

    pub fn contains(&self, employee_id: DbId) -> bool {
        self.ids.contains(&employee_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = DbId> + '_ {
        self.ids.iter().copied()
    }

    /// Reject an empty selection before any work is done.
    pub fn ensure_not_empty(&self) -> Result<(), CoreError> {
        if self.ids.is_empty() {
            return Err(CoreError::Validation(
                "At least one employee must be selected".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Declarative selection
// ---------------------------------------------------------------------------

/// A selection described by value, for callers that do not hold a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SelectionRequest {
    All,
    Employees { employee_ids: Vec<DbId> },
    Department { department: String },
    Position { position: String },
}

impl SelectionRequest {
    /// Whether resolving this request needs the employee roster.
    pub fn needs_roster(&self) -> bool {
        !matches!(self, Self::Employees { .. })
    }

    /// Resolve into a [`Selection`] using the selection engine operations.
    pub fn resolve(&self, roster: &[Employee]) -> Selection {
        let mut selection = Selection::new();
        match self {
            Self::All => selection.select_all(roster),
            Self::Employees { employee_ids } => {
                for id in employee_ids {
                    if !selection.contains(*id) {
                        selection.toggle(*id);
                    }
                }
            }
            Self::Department { department } => selection.select_by_department(roster, department),
            Self::Position { position } => selection.select_by_position(roster, position),
        }
        selection
    }
}

// ---------------------------------------------------------------------------
// Session context
// ---------------------------------------------------------------------------

/// Request-scoped state of one adjustment workflow: what is selected and the
/// adjustment about to be previewed. Threaded explicitly through engine calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentSession {
    pub selection: Selection,
    pub config: Option<AdjustmentConfig>,
}

impl AdjustmentSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pending configuration, or a validation error when none is set.
    pub fn require_config(&self) -> Result<&AdjustmentConfig, CoreError> {
        self.config.as_ref().ok_or_else(|| {
            CoreError::Validation("No adjustment configured for this session".to_string())
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
