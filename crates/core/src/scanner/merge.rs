//! Duplicate merging by identity key.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::model::{AppEntry, Architecture};

/// One normalized entry competing for its identity key.
///
/// `view_rank` and `key_path` record where the entry sits in the canonical
/// enumeration order (view precedence, then registry key), which is what
/// "encountered first" means when everything else ties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeCandidate {
    pub entry: AppEntry,
    pub view_rank: usize,
    pub key_path: String,
}

impl MergeCandidate {
    pub fn new(entry: AppEntry, view_rank: usize, key_path: impl Into<String>) -> Self {
        Self { entry, view_rank, key_path: key_path.into() }
    }

    /// Total preference order; `Ordering::Less` means `self` wins.
    ///
    /// 1. more present fields
    /// 2. x64 over anything else
    /// 3. earlier view, then earlier key path
    /// 4. field-wise comparison of the entries
    pub fn preference(&self, other: &Self) -> Ordering {
        other
            .entry
            .present_fields()
            .cmp(&self.entry.present_fields())
            .then_with(|| is_x64(other).cmp(&is_x64(self)))
            .then_with(|| self.view_rank.cmp(&other.view_rank))
            .then_with(|| self.key_path.cmp(&other.key_path))
            .then_with(|| self.entry.cmp(&other.entry))
    }
}

fn is_x64(candidate: &MergeCandidate) -> bool {
    candidate.entry.architecture == Architecture::X64
}

/// Collapse candidates to one entry per identity key.
///
/// Keys keep the order in which they first appear; the surviving entry for
/// each key depends only on [`MergeCandidate::preference`], never on input
/// order.
pub fn merge_by_identity(candidates: Vec<MergeCandidate>) -> Vec<AppEntry> {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, MergeCandidate> = HashMap::new();

    for candidate in candidates {
        match best.entry(candidate.entry.identity_key().to_string()) {
            Entry::Vacant(slot) => {
                order.push(slot.key().clone());
                slot.insert(candidate);
            }
            Entry::Occupied(mut slot) => {
                if candidate.preference(slot.get()) == Ordering::Less {
                    slot.insert(candidate);
                }
            }
        }
    }

    order.into_iter().filter_map(|key| best.remove(&key)).map(|c| c.entry).collect()
}
