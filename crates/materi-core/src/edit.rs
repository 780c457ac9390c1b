//! # Line-Item Edit Session
//!
//! Tracks line-item edits between saves so a save applies a minimal diff.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   loaded from DB                        added in the builder           │
//! │        │                                        │                       │
//! │        ▼                                        ▼                       │
//! │   ┌──────────┐  edit   ┌──────────┐      ┌───────────────┐             │
//! │   │Unmodified│────────►│ Modified │      │ PendingCreate │             │
//! │   └────┬─────┘         └────┬─────┘      └───────┬───────┘             │
//! │        │ remove             │ remove             │ remove               │
//! │        ▼                    ▼                    ▼                       │
//! │   ┌──────────┐◄─────────────┘              (dropped, never              │
//! │   │ Deleted  │                              reaches the DB)            │
//! │   └──────────┘                                                          │
//! │                                                                         │
//! │   On save:  PendingCreate → INSERT   Modified → UPDATE                  │
//! │             Deleted       → DELETE   Unmodified → nothing               │
//! │                                                                         │
//! │   After save: survivors become Unmodified, Deleted entries vanish.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::pricing::Priced;
use crate::types::QuoteLineItem;

// =============================================================================
// Identity
// =============================================================================

/// Items that carry a stable string id.
pub trait Identified {
    fn id(&self) -> &str;
}

impl Identified for QuoteLineItem {
    fn id(&self) -> &str {
        &self.id
    }
}

// =============================================================================
// Edit State
// =============================================================================

/// Persistence state of one item within an editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    /// Stored and unchanged since the last save.
    Unmodified,
    /// Stored and changed since the last save.
    Modified,
    /// Stored and removed by the user; deleted on save.
    Deleted,
    /// Not yet stored; inserted on save.
    PendingCreate,
}

impl EditState {
    /// Maps the `isNew` / `isModified` / `isDeleted` flags sent by the quote
    /// builder to a state.
    ///
    /// Returns `None` for an item that is both new and deleted: it never
    /// existed, so there is nothing to do.
    pub fn from_flags(is_new: bool, is_modified: bool, is_deleted: bool) -> Option<Self> {
        match (is_new, is_deleted) {
            (true, true) => None,
            (true, false) => Some(EditState::PendingCreate),
            (false, true) => Some(EditState::Deleted),
            (false, false) if is_modified => Some(EditState::Modified),
            (false, false) => Some(EditState::Unmodified),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry<T> {
    item: T,
    state: EditState,
}

// =============================================================================
// Save Plan
// =============================================================================

/// The minimal set of writes a save must perform.
#[derive(Debug, Clone, PartialEq)]
pub struct SavePlan<T> {
    pub inserts: Vec<T>,
    pub updates: Vec<T>,
    pub deletes: Vec<String>,
}

impl<T> Default for SavePlan<T> {
    fn default() -> Self {
        SavePlan {
            inserts: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
        }
    }
}

impl<T: Identified> SavePlan<T> {
    /// Builds a plan from items paired with their state.
    pub fn from_states<I>(items: I) -> Self
    where
        I: IntoIterator<Item = (T, EditState)>,
    {
        let mut plan = SavePlan::default();
        for (item, state) in items {
            plan.push(item, state);
        }
        plan
    }

    fn push(&mut self, item: T, state: EditState) {
        match state {
            EditState::PendingCreate => self.inserts.push(item),
            EditState::Modified => self.updates.push(item),
            EditState::Deleted => self.deletes.push(item.id().to_string()),
            EditState::Unmodified => {}
        }
    }
}

impl<T> SavePlan<T> {
    /// True when the save would not touch the database.
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Total number of writes.
    pub fn len(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }
}

// =============================================================================
// Edit Session
// =============================================================================

/// The line items of one quote as seen by an editor.
#[derive(Debug, Clone)]
pub struct EditSession<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Default for EditSession<T> {
    fn default() -> Self {
        EditSession {
            entries: Vec::new(),
        }
    }
}

impl<T: Identified + Clone> EditSession<T> {
    /// Starts a session over items already stored.
    pub fn load(items: impl IntoIterator<Item = T>) -> Self {
        EditSession {
            entries: items
                .into_iter()
                .map(|item| Entry {
                    item,
                    state: EditState::Unmodified,
                })
                .collect(),
        }
    }

    /// Adds a not-yet-stored item.
    pub fn add(&mut self, item: T) {
        self.entries.push(Entry {
            item,
            state: EditState::PendingCreate,
        });
    }

    /// Applies `edit` to the item with `id`.
    ///
    /// Returns `false` if there is no live item with that id.
    pub fn modify<F>(&mut self, id: &str, edit: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.item.id() == id && e.state != EditState::Deleted)
        else {
            return false;
        };

        edit(&mut entry.item);
        if entry.state == EditState::Unmodified {
            entry.state = EditState::Modified;
        }
        true
    }

    /// Removes the item with `id`.
    ///
    /// A stored item is marked for deletion; a pending one is dropped.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.item.id() == id && e.state != EditState::Deleted)
        else {
            return false;
        };

        if self.entries[pos].state == EditState::PendingCreate {
            self.entries.remove(pos);
        } else {
            self.entries[pos].state = EditState::Deleted;
        }
        true
    }

    /// Items that will exist after the next save.
    pub fn live_items(&self) -> impl Iterator<Item = &T> {
        self.entries
            .iter()
            .filter(|e| e.state != EditState::Deleted)
            .map(|e| &e.item)
    }

    /// The writes the next save must perform.
    pub fn plan(&self) -> SavePlan<T> {
        SavePlan::from_states(self.entries.iter().map(|e| (e.item.clone(), e.state)))
    }

    /// Records that the last [`plan`](Self::plan) was persisted.
    pub fn mark_saved(&mut self) {
        self.entries.retain(|e| e.state != EditState::Deleted);
        for entry in &mut self.entries {
            entry.state = EditState::Unmodified;
        }
    }
}

impl<T: Identified + Clone + Priced> EditSession<T> {
    /// Reprices every live item against a new global margin.
    ///
    /// Stored items become `Modified` since their computed fields changed.
    pub fn reprice_all(&mut self, global_margin: f64) {
        for entry in &mut self.entries {
            if entry.state == EditState::Deleted {
                continue;
            }
            entry.item.reprice(global_margin);
            if entry.state == EditState::Unmodified {
                entry.state = EditState::Modified;
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
