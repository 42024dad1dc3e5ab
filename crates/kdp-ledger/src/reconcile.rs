//! Upsert/prune planning for one account
//!
//! The plan is computed from plain values so it can be tested without a
//! database; [`crate::store::Store`] applies it inside a single transaction.

use std::collections::{HashMap, HashSet};

use crate::calendar::{is_last_day_of_month, Clock};
use crate::models::{PortfolioDraft, PortfolioRecord, RoyaltyDraft, RoyaltyRecord};

/// Natural identity used to match incoming rows against stored ones
pub trait Keyed {
    fn identity_key(&self) -> &str;
}

/// A stored row with a persistent id
pub trait Persisted: Keyed {
    fn id(&self) -> i64;
}

impl Keyed for RoyaltyDraft {
    fn identity_key(&self) -> &str {
        &self.book_title
    }
}

impl Keyed for RoyaltyRecord {
    fn identity_key(&self) -> &str {
        &self.book_title
    }
}

impl Persisted for RoyaltyRecord {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Keyed for PortfolioDraft {
    fn identity_key(&self) -> &str {
        &self.portfolio_name
    }
}

impl Keyed for PortfolioRecord {
    fn identity_key(&self) -> &str {
        &self.portfolio_name
    }
}

impl Persisted for PortfolioRecord {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Changes needed to make the stored set equal the incoming set
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilePlan<D> {
    /// Existing id and the values to write over it
    pub updates: Vec<(i64, D)>,
    pub inserts: Vec<D>,
    pub deletes: Vec<i64>,
}

impl<D> ReconcilePlan<D> {
    pub fn is_noop(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty() && self.deletes.is_empty()
    }
}

impl<D> std::fmt::Display for ReconcilePlan<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} updated, {} inserted, {} deleted",
            self.updates.len(),
            self.inserts.len(),
            self.deletes.len()
        )
    }
}

/// Diff `existing` (one account) against `incoming` by identity key.
///
/// - Matching keys become updates that keep the stored id.
/// - New keys become inserts.
/// - Stored keys missing from `incoming` are deleted.
///
/// Stored duplicates of one key (rows written before the unique index
/// existed) keep the lowest id; the others are deleted. Incoming duplicates
/// resolve to the last occurrence.
pub fn plan<E, D>(existing: &[E], incoming: Vec<D>) -> ReconcilePlan<D>
where
    E: Persisted,
    D: Keyed,
{
    let mut sorted: Vec<&E> = existing.iter().collect();
    sorted.sort_by_key(|e| e.id());

    let mut by_key: HashMap<&str, i64> = HashMap::new();
    let mut deletes = Vec::new();
    for record in sorted {
        if by_key.contains_key(record.identity_key()) {
            deletes.push(record.id());
        } else {
            by_key.insert(record.identity_key(), record.id());
        }
    }

    let mut drafts: Vec<D> = Vec::with_capacity(incoming.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    for draft in incoming {
        let seen = positions.get(draft.identity_key()).copied();
        match seen {
            Some(idx) => drafts[idx] = draft,
            None => {
                positions.insert(draft.identity_key().to_string(), drafts.len());
                drafts.push(draft);
            }
        }
    }

    let mut matched: HashSet<i64> = HashSet::new();
    let mut updates = Vec::new();
    let mut inserts = Vec::new();
    for draft in drafts {
        match by_key.get(draft.identity_key()) {
            Some(&id) => {
                matched.insert(id);
                updates.push((id, draft));
            }
            None => inserts.push(draft),
        }
    }

    deletes.extend(by_key.values().filter(|id| !matched.contains(*id)));
    deletes.sort_unstable();

    ReconcilePlan { updates, inserts, deletes }
}

/// Whether a pass run now should capture the last-month snapshot
pub fn snapshot_due(clock: &dyn Clock) -> bool {
    is_last_day_of_month(clock.today())
}
