//! Snapshot comparison
//!
//! Decides which records of the current run count as new and which of those
//! are relevant for a notification.

use crate::listing::{ListingRecord, TargetSizes};
use std::collections::HashSet;

/// What to do when there is no previous snapshot to compare against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColdStart {
    /// First run only seeds the snapshot
    #[default]
    Suppress,

    /// First run treats every current record as new
    NotifyAll,
}

impl ColdStart {
    pub fn from_notify_flag(notify_on_cold_start: bool) -> Self {
        if notify_on_cold_start {
            Self::NotifyAll
        } else {
            Self::Suppress
        }
    }
}

/// Returns the records of `current` that have no equal record in `previous`
///
/// Equality covers size, description, date and link. Order of `current` is
/// preserved and duplicates inside `current` are kept.
pub fn new_entries(current: &[ListingRecord], previous: &[ListingRecord]) -> Vec<ListingRecord> {
    let seen: HashSet<&ListingRecord> = previous.iter().collect();

    current
        .iter()
        .filter(|record| !seen.contains(record))
        .cloned()
        .collect()
}

/// Computes the new records worth notifying about
///
/// # Arguments
///
/// * `current` - Records extracted in this run
/// * `previous` - Snapshot from the last run, `None` if there is none
/// * `targets` - Sizes that make a record relevant
/// * `cold_start` - Policy applied when `previous` is `None`
///
/// # Returns
///
/// The relevant new records in `current` order. An empty result means
/// nothing should be sent.
pub fn compute_relevant_new(
    current: &[ListingRecord],
    previous: Option<&[ListingRecord]>,
    targets: &TargetSizes,
    cold_start: ColdStart,
) -> Vec<ListingRecord> {
    let previous = match (previous, cold_start) {
        (Some(previous), _) => previous,
        (None, ColdStart::Suppress) => return Vec::new(),
        (None, ColdStart::NotifyAll) => &[],
    };

    new_entries(current, previous)
        .into_iter()
        .filter(|record| targets.contains(&record.size))
        .collect()
}
