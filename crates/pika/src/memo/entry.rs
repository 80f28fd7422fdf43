use hashbrown::HashSet;

use crate::memo::{Match, MatchId, MemoKey};

/// The mutable memo cell for one `(clause, start position)` pair.
///
/// An entry exists in the table iff some evaluation has inspected its key.
/// Its `best_match` is monotone: once set it never clears, and replacements
/// are only ever strictly better under the [`Match`] ordering.
#[derive(Debug)]
pub struct MemoEntry {
    key: MemoKey,
    best_match: Option<MatchId>,
    /// Parent keys recorded when a lookup crossed into this entry from a
    /// different start position. The same-position case is covered by the
    /// static seed-parent edges, so it is not recorded here.
    back_refs: HashSet<MemoKey, ahash::RandomState>,
}

impl MemoEntry {
    pub(crate) fn new(key: MemoKey) -> Self {
        Self {
            key,
            best_match: None,
            back_refs: HashSet::with_hasher(ahash::RandomState::new()),
        }
    }

    #[must_use]
    pub const fn key(&self) -> MemoKey {
        self.key
    }

    /// The current best match, if any has been proven.
    #[must_use]
    pub const fn best_match(&self) -> Option<MatchId> {
        self.best_match
    }

    /// Parent keys to re-evaluate when this entry's best match changes, in
    /// addition to the clause's static seed parents.
    pub fn back_refs(&self) -> impl Iterator<Item = MemoKey> + '_ {
        self.back_refs.iter().copied()
    }

    pub(crate) fn add_back_ref(&mut self, parent: MemoKey) {
        self.back_refs.insert(parent);
    }

    /// Install `candidate` as the best match if there is no incumbent or the
    /// candidate is strictly better, recording the change in `updated`.
    /// Returns whether the candidate was installed.
    pub(crate) fn add_new_best_match(
        &mut self,
        candidate: MatchId,
        arena: &[Match],
        updated: &mut UpdatedEntries,
    ) -> bool {
        let accept = match self.best_match {
            None => true,
            Some(incumbent) => {
                arena[candidate.index()].is_better_than(&arena[incumbent.index()])
            }
        };
        if accept {
            self.best_match = Some(candidate);
            updated.insert(self.key);
        }
        accept
    }
}

/// The set of entries whose best match changed during an evaluation round.
///
/// The driver drains it between rounds to find the next frontier; draining is
/// in sorted key order so the fixpoint is independent of hash iteration order.
#[derive(Debug, Default)]
pub struct UpdatedEntries {
    set: HashSet<MemoKey, ahash::RandomState>,
}

impl UpdatedEntries {
    #[must_use]
    pub fn new() -> Self {
        Self {
            set: HashSet::with_hasher(ahash::RandomState::new()),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn insert(&mut self, key: MemoKey) {
        self.set.insert(key);
    }

    /// Remove and return all keys, sorted by `(clause, start)`.
    pub fn drain_sorted(&mut self) -> Vec<MemoKey> {
        let mut keys: Vec<MemoKey> = self.set.drain().collect();
        keys.sort_unstable();
        keys
    }
}
