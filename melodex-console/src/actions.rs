//! Per-row actions
//!
//! Actions are bound to a row key when the row first appears and dropped when
//! it disappears. Rows that survive a re-render keep their bindings, so there
//! is no rebind step after rendering.

use serde::Serialize;
use std::collections::HashMap;

use crate::render::RenderDiff;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Edit,
    Delete,
    Approve,
    Reject,
    Play,
}

impl ActionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Edit => "edit",
            ActionKind::Delete => "delete",
            ActionKind::Approve => "approve",
            ActionKind::Reject => "reject",
            ActionKind::Play => "play",
        }
    }
}

/// Bindings from record id to the actions its row offers
#[derive(Debug, Clone, Default)]
pub struct ActionBinder {
    bindings: HashMap<i64, Vec<ActionKind>>,
    bind_ops: u64,
}

impl ActionBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a render diff: bind inserted rows, unbind removed ones
    ///
    /// Rows keyed by position have no id to act on and get no actions.
    pub fn sync(&mut self, diff: &RenderDiff, actions: &[ActionKind]) {
        for key in &diff.removed {
            if let Some(id) = key.id() {
                self.bindings.remove(&id);
            }
        }
        if actions.is_empty() {
            return;
        }
        for key in &diff.inserted {
            if let Some(id) = key.id() {
                self.bindings.insert(id, actions.to_vec());
                self.bind_ops += 1;
            }
        }
    }

    pub fn is_bound(&self, id: i64, kind: ActionKind) -> bool {
        self.bindings
            .get(&id)
            .map(|actions| actions.contains(&kind))
            .unwrap_or(false)
    }

    pub fn actions_for(&self, id: i64) -> &[ActionKind] {
        self.bindings.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn bound_count(&self) -> usize {
        self.bindings.len()
    }

    /// Total bind operations performed, for checking bind-once behavior
    pub fn bind_ops(&self) -> u64 {
        self.bind_ops
    }
}

/// User confirmation before destructive operations
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Fixed answer, for `--yes` and tests
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirm for AutoConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}
