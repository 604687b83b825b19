//! Classification of freshly scraped fines against what a binding knows
//!
//! [`diff`] is a pure function: it performs no I/O and keeps no state.

use std::collections::{BTreeSet, HashMap};

use crate::registry::api::FineRecord;

/// Fetched records split by how they relate to stored history
///
/// Each sequence keeps the scrape order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOutcome {
    /// Order numbers the binding has never tracked
    pub new: Vec<FineRecord>,
    /// Tracked orders whose amount or outstanding info changed
    pub updated: Vec<FineRecord>,
    pub unchanged: Vec<FineRecord>,
}

impl DiffOutcome {
    pub fn len(&self) -> usize {
        self.new.len() + self.updated.len() + self.unchanged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classify `fetched` against the binding's `known` order numbers and the
/// `stored` copies keyed by order number
///
/// Duplicate order numbers collapse into one record carrying the last
/// values seen, at the position of the first occurrence. A known order
/// without a stored copy counts as updated so the store gets reconciled.
pub fn diff(
    fetched: &[FineRecord],
    known: &BTreeSet<String>,
    stored: &HashMap<String, FineRecord>,
) -> DiffOutcome {
    let mut outcome = DiffOutcome::default();

    for record in dedupe_last_wins(fetched) {
        if !known.contains(&record.order_number) {
            outcome.new.push(record);
            continue;
        }
        match stored.get(&record.order_number) {
            Some(previous) if !record.differs_from(previous) => outcome.unchanged.push(record),
            _ => outcome.updated.push(record),
        }
    }
    outcome
}

fn dedupe_last_wins(fetched: &[FineRecord]) -> Vec<FineRecord> {
    let mut unique: Vec<FineRecord> = Vec::with_capacity(fetched.len());
    let mut position: HashMap<&str, usize> = HashMap::with_capacity(fetched.len());

    for record in fetched {
        match position.get(record.order_number.as_str()) {
            Some(&index) => unique[index] = record.clone(),
            None => {
                position.insert(record.order_number.as_str(), unique.len());
                unique.push(record.clone());
            }
        }
    }
    unique
}
