//! Per-user case ordering.
//!
//! Each successful login draws a fresh seed; the case list shown to that
//! user is a deterministic shuffle of the canonical order under the seed.
//! Seeds are process-local and only affect presentation order.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::catalogue::CaseId;
use super::user::Username;

/// Shuffle `case_ids` deterministically under `seed`.
///
/// # Examples
/// ```
/// use casedesk::domain::{CaseId, case_order::permuted};
///
/// let cases: Vec<CaseId> = ["A", "B", "C", "D"]
///     .into_iter()
///     .map(|id| CaseId::new(id).expect("valid"))
///     .collect();
/// assert_eq!(permuted(&cases, 7), permuted(&cases, 7));
/// ```
#[must_use]
pub fn permuted(case_ids: &[CaseId], seed: u64) -> Vec<CaseId> {
    let mut ordered = case_ids.to_vec();
    let mut rng = StdRng::seed_from_u64(seed);
    ordered.shuffle(&mut rng);
    ordered
}

/// Username to ordering seed registry.
#[derive(Debug, Default)]
pub struct CaseOrderSeeds {
    seeds: RwLock<HashMap<Username, u64>>,
}

impl CaseOrderSeeds {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw and store a fresh seed for `username`, replacing any previous one.
    pub fn assign(&self, username: &Username) -> u64 {
        let seed = rand::thread_rng().r#gen::<u64>();
        self.insert(username, seed);
        seed
    }

    pub fn insert(&self, username: &Username, seed: u64) {
        self.seeds
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(username.clone(), seed);
    }

    #[must_use]
    pub fn seed_for(&self, username: &Username) -> Option<u64> {
        self.seeds
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(username)
            .copied()
    }

    /// Seed of `username`, assigning one when the session outlived the
    /// registry (for example across a restart).
    pub fn seed_or_assign(&self, username: &Username) -> u64 {
        match self.seed_for(username) {
            Some(seed) => seed,
            None => self.assign(username),
        }
    }

    pub fn forget(&self, username: &Username) {
        self.seeds
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(username);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn cases() -> Vec<CaseId> {
        (1..=20)
            .map(|n| CaseId::new(format!("Case{n:03}")).expect("valid"))
            .collect()
    }

    #[fixture]
    fn alice() -> Username {
        Username::new("alice").expect("valid")
    }

    #[rstest]
    fn permutation_is_deterministic_and_complete(cases: Vec<CaseId>) {
        let first = permuted(&cases, 42);
        assert_eq!(first, permuted(&cases, 42));

        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(sorted, cases);
    }

    #[rstest]
    fn different_seeds_usually_differ(cases: Vec<CaseId>) {
        let orders: Vec<Vec<CaseId>> = (0..4).map(|seed| permuted(&cases, seed)).collect();
        assert!(orders.windows(2).any(|pair| pair[0] != pair[1]));
    }

    #[rstest]
    fn registry_tracks_seeds_per_user(alice: Username) {
        let seeds = CaseOrderSeeds::new();
        assert_eq!(seeds.seed_for(&alice), None);

        seeds.insert(&alice, 9);
        assert_eq!(seeds.seed_for(&alice), Some(9));
        assert_eq!(seeds.seed_or_assign(&alice), 9);

        seeds.forget(&alice);
        assert_eq!(seeds.seed_for(&alice), None);
    }

    #[rstest]
    fn seed_or_assign_persists_new_seed(alice: Username) {
        let seeds = CaseOrderSeeds::new();
        let assigned = seeds.seed_or_assign(&alice);
        assert_eq!(seeds.seed_for(&alice), Some(assigned));
    }
}
