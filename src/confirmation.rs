// ✋ Duplicate Confirmation - per-session state of flagged entries
//
// NEW → AWAITING_CONFIRMATION → { CONFIRMED (merge into matched record),
//                                 CANCELLED (keep as independent entry) }
// A batch is resolved once every flagged entry is terminal.

use crate::deduplication::{DuplicateDetectionResult, PotentialDuplicate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationState {
    New,
    AwaitingConfirmation,
    Confirmed,
    Cancelled,
}

impl ConfirmationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConfirmationState::Confirmed | ConfirmationState::Cancelled)
    }

    pub fn can_transition_to(&self, next: ConfirmationState) -> bool {
        use ConfirmationState::*;
        matches!(
            (self, next),
            (New, AwaitingConfirmation) | (AwaitingConfirmation, Confirmed) | (AwaitingConfirmation, Cancelled)
        )
    }
}

/// What the caller should do with a resolved entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Resolution {
    /// Add the quantity to the matched record
    Merge { movement_id: String },

    /// Record the entry as a new movement
    CreateNew,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfirmationError {
    #[error("No pending confirmation for session '{0}'")]
    NoPendingBatch(String),

    #[error("Entry #{0} is not awaiting confirmation")]
    UnknownEntry(usize),

    #[error("Entry #{entry_index} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        entry_index: usize,
        from: ConfirmationState,
        to: ConfirmationState,
    },

    #[error("Movement '{0}' is not a candidate for this entry")]
    UnknownCandidate(String),

    #[error("Batch still has {0} unresolved entries")]
    Unresolved(usize),
}

// ============================================================================
// PENDING ENTRY / BATCH
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub entry_index: usize,
    pub item_name: String,
    pub quantity: f64,
    pub candidates: Vec<PotentialDuplicate>,
    pub state: ConfirmationState,
    pub resolution: Option<Resolution>,
}

impl PendingEntry {
    fn transition(&mut self, to: ConfirmationState) -> Result<(), ConfirmationError> {
        if !self.state.can_transition_to(to) {
            return Err(ConfirmationError::InvalidTransition {
                entry_index: self.entry_index,
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Merge into `movement_id`, or the best candidate when None
    fn confirm(&mut self, movement_id: Option<&str>) -> Result<Resolution, ConfirmationError> {
        let target = match movement_id {
            Some(id) => self
                .candidates
                .iter()
                .find(|c| c.source_movement_id == id)
                .ok_or_else(|| ConfirmationError::UnknownCandidate(id.to_string()))?,
            None => self
                .candidates
                .first()
                .ok_or(ConfirmationError::UnknownEntry(self.entry_index))?,
        };
        let resolution = Resolution::Merge {
            movement_id: target.source_movement_id.clone(),
        };

        self.transition(ConfirmationState::Confirmed)?;
        self.resolution = Some(resolution.clone());
        Ok(resolution)
    }

    fn cancel(&mut self) -> Result<Resolution, ConfirmationError> {
        self.transition(ConfirmationState::Cancelled)?;
        self.resolution = Some(Resolution::CreateNew);
        Ok(Resolution::CreateNew)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingBatch {
    pub entries: Vec<PendingEntry>,
}

impl PendingBatch {
    /// Every flagged entry enters AWAITING_CONFIRMATION
    pub fn from_result(result: &DuplicateDetectionResult) -> Self {
        let entries = result
            .entries
            .iter()
            .map(|e| {
                let mut entry = PendingEntry {
                    entry_index: e.entry_index,
                    item_name: e.item_name.clone(),
                    quantity: e.quantity,
                    candidates: e.candidates.clone(),
                    state: ConfirmationState::New,
                    resolution: None,
                };
                // New → Awaiting is always legal
                entry.state = ConfirmationState::AwaitingConfirmation;
                entry
            })
            .collect();

        PendingBatch { entries }
    }

    pub fn unresolved(&self) -> usize {
        self.entries.iter().filter(|e| !e.state.is_terminal()).count()
    }

    pub fn is_resolved(&self) -> bool {
        self.unresolved() == 0
    }

    fn entry_mut(&mut self, entry_index: usize) -> Result<&mut PendingEntry, ConfirmationError> {
        self.entries
            .iter_mut()
            .find(|e| e.entry_index == entry_index)
            .ok_or(ConfirmationError::UnknownEntry(entry_index))
    }
}

// ============================================================================
// PENDING CONFIRMATIONS (caller-owned, keyed by session)
// ============================================================================

#[derive(Debug, Default)]
pub struct PendingConfirmations {
    sessions: HashMap<String, PendingBatch>,
}

impl PendingConfirmations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start confirmation for a session; replaces any earlier pending batch.
    /// Returns how many entries await an answer.
    pub fn register(&mut self, session_id: &str, result: &DuplicateDetectionResult) -> usize {
        if !result.has_duplicates {
            self.sessions.remove(session_id);
            return 0;
        }

        let batch = PendingBatch::from_result(result);
        let waiting = batch.unresolved();
        self.sessions.insert(session_id.to_string(), batch);
        waiting
    }

    pub fn get(&self, session_id: &str) -> Option<&PendingBatch> {
        self.sessions.get(session_id)
    }

    fn batch_mut(&mut self, session_id: &str) -> Result<&mut PendingBatch, ConfirmationError> {
        self.sessions
            .get_mut(session_id)
            .ok_or_else(|| ConfirmationError::NoPendingBatch(session_id.to_string()))
    }

    pub fn confirm(
        &mut self,
        session_id: &str,
        entry_index: usize,
        movement_id: Option<&str>,
    ) -> Result<Resolution, ConfirmationError> {
        self.batch_mut(session_id)?.entry_mut(entry_index)?.confirm(movement_id)
    }

    pub fn cancel(&mut self, session_id: &str, entry_index: usize) -> Result<Resolution, ConfirmationError> {
        self.batch_mut(session_id)?.entry_mut(entry_index)?.cancel()
    }

    /// Merge every still-waiting entry into its best candidate
    pub fn confirm_all(&mut self, session_id: &str) -> Result<usize, ConfirmationError> {
        let batch = self.batch_mut(session_id)?;
        let mut count = 0;
        for entry in batch.entries.iter_mut().filter(|e| !e.state.is_terminal()) {
            entry.confirm(None)?;
            count += 1;
        }
        Ok(count)
    }

    /// Keep every still-waiting entry as a new movement
    pub fn cancel_all(&mut self, session_id: &str) -> Result<usize, ConfirmationError> {
        let batch = self.batch_mut(session_id)?;
        let mut count = 0;
        for entry in batch.entries.iter_mut().filter(|e| !e.state.is_terminal()) {
            entry.cancel()?;
            count += 1;
        }
        Ok(count)
    }

    pub fn is_resolved(&self, session_id: &str) -> bool {
        self.sessions.get(session_id).map_or(true, PendingBatch::is_resolved)
    }

    /// Remove a fully resolved batch and hand back its decisions
    pub fn take_resolved(&mut self, session_id: &str) -> Result<Vec<(usize, Resolution)>, ConfirmationError> {
        let batch = self
            .sessions
            .get(session_id)
            .ok_or_else(|| ConfirmationError::NoPendingBatch(session_id.to_string()))?;

        let unresolved = batch.unresolved();
        if unresolved > 0 {
            return Err(ConfirmationError::Unresolved(unresolved));
        }

        let batch = self
            .sessions
            .remove(session_id)
            .ok_or_else(|| ConfirmationError::NoPendingBatch(session_id.to_string()))?;
        Ok(batch
            .entries
            .into_iter()
            .filter_map(|e| e.resolution.map(|r| (e.entry_index, r)))
            .collect())
    }

    /// Abandon a session's pending batch
    pub fn discard(&mut self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }
}

// ============================================================================
// TESTS
// ============================================================================
