//! Grammar analysis passes run once at build time.
//!
//! Both passes operate on the finished clause arena: the zero-char-match
//! fixpoint first, then seed-parent installation (which depends on it).

use smallvec::SmallVec;

use crate::grammar::{Clause, ClauseId, ClauseKind};

/// Set `can_match_zero_chars` on every clause.
///
/// Flags start false and are only ever raised, so the iteration computes the
/// least fixpoint; clauses on a cycle that cannot bottom out at a
/// zero-char-matching leaf stay false.
pub(crate) fn compute_can_match_zero_chars(clauses: &mut [Clause]) {
    let mut zero = vec![false; clauses.len()];
    loop {
        let mut changed = false;
        for (idx, clause) in clauses.iter().enumerate() {
            let value = match clause.kind {
                ClauseKind::Terminal(_) => false,
                ClauseKind::Opt | ClauseKind::FollowedBy | ClauseKind::NotFollowedBy => true,
                ClauseKind::OneOrMore => zero[clause.sub_clauses[0].index()],
                ClauseKind::Seq => clause.sub_clauses.iter().all(|sub| zero[sub.index()]),
                ClauseKind::First | ClauseKind::Longest => {
                    clause.sub_clauses.iter().any(|sub| zero[sub.index()])
                }
            };
            if value && !zero[idx] {
                zero[idx] = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    for (clause, value) in clauses.iter_mut().zip(zero) {
        clause.can_match_zero_chars = value;
    }
}

/// Install the inverse of the seed-subclause relation: for each clause, record
/// it as a seed parent on every one of its seed subclauses.
pub(crate) fn install_seed_parents(clauses: &mut [Clause]) {
    let seeds: Vec<SmallVec<[ClauseId; 2]>> = clauses
        .iter()
        .map(|clause| clause.seed_sub_clauses(clauses))
        .collect();
    for (parent_idx, seed_list) in seeds.iter().enumerate() {
        let parent = ClauseId::new(parent_idx);
        for &child in seed_list {
            clauses[child.index()].seed_parents.push(parent);
        }
    }
    for clause in clauses.iter_mut() {
        clause.seed_parents.sort_unstable();
        clause.seed_parents.dedup();
    }
}
