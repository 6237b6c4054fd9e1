//! Group registry: user-defined groups keyed by identity key.
//!
//! The registry owns its [`GroupDb`] and an in-memory copy of the stored
//! state. Mutations take `&mut self`, so writes are serialized by ownership
//! (wrap the registry in a `Mutex` to share it). Each mutation commits one
//! SQLite transaction before memory is touched; a failed write leaves both
//! sides at the last committed state.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::db::{AppGroup, DbError, GroupColor, GroupDb, GroupId};

/// Colours handed to new groups, in order.
pub const GROUP_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("No group with id {0}")]
    InvalidReference(GroupId),

    #[error("Group name must not be empty")]
    EmptyName,

    #[error("Identity key must not be empty")]
    EmptyKey,

    #[error("Failed to persist group change: {0}")]
    Persistence(#[from] DbError),
}

pub type GroupResult<T> = Result<T, GroupError>;

#[derive(Debug)]
pub struct GroupRegistry {
    db: GroupDb,
    groups: BTreeMap<GroupId, AppGroup>,
    assignments: BTreeMap<String, GroupId>,
}

impl GroupRegistry {
    /// Open (or create) the store at `path` and load it.
    pub fn open(path: &Path) -> GroupResult<Self> {
        Self::from_db(GroupDb::open(path)?)
    }

    /// Registry over a private in-memory database.
    pub fn in_memory() -> GroupResult<Self> {
        Self::from_db(GroupDb::open_in_memory()?)
    }

    /// Load state from `db`, dropping assignments whose group is gone.
    pub fn from_db(mut db: GroupDb) -> GroupResult<Self> {
        let pruned = db.prune_orphan_assignments()?;
        if pruned > 0 {
            warn!(pruned, "dropped assignments to missing groups");
        }
        let groups = db.list_groups()?.into_iter().map(|g| (g.id, g)).collect();
        let assignments =
            db.list_assignments()?.into_iter().map(|a| (a.identity_key, a.group_id)).collect();
        Ok(Self { db, groups, assignments })
    }

    /// Underlying store, for inspection.
    pub fn database(&self) -> &GroupDb {
        &self.db
    }

    /// Create a group with the next free palette colour.
    ///
    /// Display names need not be unique; blank names are rejected.
    pub fn create_group(&mut self, display_name: &str) -> GroupResult<AppGroup> {
        let display_name = non_blank(display_name).ok_or(GroupError::EmptyName)?;
        let color = self.next_color();
        let id = self.db.insert_group(display_name, color.as_ref())?;
        let group = AppGroup { id, display_name: display_name.to_string(), color };
        self.groups.insert(id, group.clone());
        debug!(group = %id, name = display_name, "created group");
        Ok(group)
    }

    /// Rename a group; its assignments are untouched.
    pub fn rename_group(&mut self, id: GroupId, new_name: &str) -> GroupResult<()> {
        let new_name = non_blank(new_name).ok_or(GroupError::EmptyName)?;
        self.require(id)?;
        self.db.rename_group(id, new_name)?;
        if let Some(group) = self.groups.get_mut(&id) {
            group.display_name = new_name.to_string();
        }
        Ok(())
    }

    pub fn set_group_color(&mut self, id: GroupId, color: Option<GroupColor>) -> GroupResult<()> {
        self.require(id)?;
        self.db.set_group_color(id, color.as_ref())?;
        if let Some(group) = self.groups.get_mut(&id) {
            group.color = color;
        }
        Ok(())
    }

    /// Delete a group and clear every assignment to it. Returns the number of
    /// cleared assignments.
    pub fn delete_group(&mut self, id: GroupId) -> GroupResult<usize> {
        self.require(id)?;
        let cleared = self.db.delete_group(id)?;
        self.groups.remove(&id);
        self.assignments.retain(|_, group_id| *group_id != id);
        debug!(group = %id, cleared, "deleted group");
        Ok(cleared)
    }

    /// Assign `identity_key` to `group_id`, replacing any earlier assignment.
    pub fn assign(&mut self, identity_key: &str, group_id: GroupId) -> GroupResult<()> {
        if identity_key.trim().is_empty() {
            return Err(GroupError::EmptyKey);
        }
        self.require(group_id)?;
        self.db.upsert_assignment(identity_key, group_id)?;
        self.assignments.insert(identity_key.to_string(), group_id);
        Ok(())
    }

    /// Remove the assignment for `identity_key`. Returns whether one existed.
    pub fn unassign(&mut self, identity_key: &str) -> GroupResult<bool> {
        let existed = self.db.delete_assignment(identity_key)?;
        self.assignments.remove(identity_key);
        Ok(existed)
    }

    pub fn lookup(&self, identity_key: &str) -> Option<GroupId> {
        self.assignments.get(identity_key).copied()
    }

    pub fn group(&self, id: GroupId) -> Option<&AppGroup> {
        self.groups.get(&id)
    }

    /// Group assigned to `identity_key`, if any.
    pub fn group_for(&self, identity_key: &str) -> Option<&AppGroup> {
        self.lookup(identity_key).and_then(|id| self.group(id))
    }

    /// All groups ordered by id.
    pub fn groups(&self) -> impl Iterator<Item = &AppGroup> {
        self.groups.values()
    }

    pub fn assignments(&self) -> &BTreeMap<String, GroupId> {
        &self.assignments
    }

    /// Identity keys assigned to `id`, sorted.
    pub fn members(&self, id: GroupId) -> Vec<&str> {
        self.assignments
            .iter()
            .filter(|(_, group_id)| **group_id == id)
            .map(|(key, _)| key.as_str())
            .collect()
    }

    fn require(&self, id: GroupId) -> GroupResult<()> {
        if self.groups.contains_key(&id) {
            Ok(())
        } else {
            Err(GroupError::InvalidReference(id))
        }
    }

    /// First palette colour no group uses; once all are taken, cycle.
    fn next_color(&self) -> Option<GroupColor> {
        let used: Vec<&str> =
            self.groups.values().filter_map(|g| g.color.as_ref()).map(GroupColor::as_str).collect();
        let pick = GROUP_PALETTE
            .iter()
            .find(|candidate| !used.iter().any(|u| u.eq_ignore_ascii_case(candidate)))
            .copied()
            .unwrap_or(GROUP_PALETTE[used.len() % GROUP_PALETTE.len()]);
        pick.parse().ok()
    }
}

fn non_blank(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
