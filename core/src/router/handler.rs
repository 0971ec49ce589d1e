//! Downstream Action Handlers
//!
//! Once the router has validated an action it hands the trusted part
//! (domain, new commitments, public inputs) to the module registered for
//! that domain in two steps: `check` runs before anything is committed
//! and may refuse the action, `apply` runs only after the ledger batch
//! is durable. A failed submission therefore never reaches `apply`.

use cloak_privacy::{ActionDomain, Address, Commitment, FieldElement, PoolVersion};
use dashmap::DashMap;
use log::debug;

use crate::storage::CommitmentRecord;

/// A validated action as seen by its downstream module
#[derive(Debug, Clone, Copy)]
pub struct RoutedAction<'a> {
    pub sequence: u64,
    pub domain: ActionDomain,
    pub version: PoolVersion,
    pub participant: &'a Address,
    pub commitments: &'a [Commitment],
    pub public_inputs: &'a [FieldElement],
}

pub trait ActionHandler: Send + Sync {
    /// Validate the action without side effects; an error rejects the submission
    fn check(&self, action: &RoutedAction<'_>) -> anyhow::Result<()>;

    /// Record an action the router has committed
    fn apply(&self, action: &RoutedAction<'_>);
}

// ============================================================================
// Commitment Index
// ============================================================================

/// Indexes every new commitment by the action that created it.
///
/// Refuses an action that would re-create a commitment already present.
#[derive(Default)]
pub struct CommitmentIndex {
    entries: DashMap<Commitment, CommitmentRecord>,
    per_domain: DashMap<ActionDomain, u64>,
}

impl CommitmentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from persisted commitment records
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a CommitmentRecord>) -> Self {
        let index = Self::new();
        for record in records {
            index.entries.insert(record.commitment, record.clone());
            *index.per_domain.entry(record.domain).or_insert(0) += 1;
        }
        index
    }

    pub fn locate(&self, commitment: &Commitment) -> Option<CommitmentRecord> {
        self.entries.get(commitment).map(|r| r.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Commitment count per domain, in tag order
    pub fn domain_counts(&self) -> Vec<(ActionDomain, u64)> {
        let mut counts: Vec<(ActionDomain, u64)> =
            self.per_domain.iter().map(|e| (*e.key(), *e.value())).collect();
        counts.sort_by_key(|(d, _)| d.tag());
        counts
    }
}

impl ActionHandler for CommitmentIndex {
    fn check(&self, action: &RoutedAction<'_>) -> anyhow::Result<()> {
        for (i, commitment) in action.commitments.iter().enumerate() {
            if self.entries.contains_key(commitment)
                || action.commitments[..i].contains(commitment)
            {
                anyhow::bail!("commitment {} already exists", commitment);
            }
        }
        Ok(())
    }

    fn apply(&self, action: &RoutedAction<'_>) {
        for commitment in action.commitments {
            self.entries.insert(
                *commitment,
                CommitmentRecord {
                    commitment: *commitment,
                    domain: action.domain,
                    sequence: action.sequence,
                },
            );
        }
        *self.per_domain.entry(action.domain).or_insert(0) += action.commitments.len() as u64;

        debug!(
            "indexed {} commitments for {} action #{}",
            action.commitments.len(),
            action.domain,
            action.sequence
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(v: u64) -> Commitment {
        Commitment(FieldElement::from_u64(v))
    }

    fn action<'a>(
        sequence: u64,
        domain: ActionDomain,
        participant: &'a Address,
        commitments: &'a [Commitment],
    ) -> RoutedAction<'a> {
        RoutedAction {
            sequence,
            domain,
            version: PoolVersion::V3,
            participant,
            commitments,
            public_inputs: &[],
        }
    }

    #[test]
    fn test_index_records_origin() {
        let index = CommitmentIndex::new();
        let who = Address::default();

        index.apply(&action(0, ActionDomain::Swap, &who, &[c(1), c(2)]));
        index.apply(&action(1, ActionDomain::Stake, &who, &[c(3)]));

        let record = index.locate(&c(2)).unwrap();
        assert_eq!(record.domain, ActionDomain::Swap);
        assert_eq!(record.sequence, 0);
        assert_eq!(
            index.domain_counts(),
            vec![(ActionDomain::Stake, 1), (ActionDomain::Swap, 2)]
        );
    }

    #[test]
    fn test_check_rejects_duplicates_without_side_effects() {
        let index = CommitmentIndex::new();
        let who = Address::default();
        let first_commitments = [c(1)];
        let first = action(0, ActionDomain::Payment, &who, &first_commitments);
        index.check(&first).unwrap();
        index.apply(&first);

        assert!(
            index
                .check(&action(1, ActionDomain::Payment, &who, &[c(5), c(1)]))
                .is_err()
        );
        assert!(
            index
                .check(&action(1, ActionDomain::Payment, &who, &[c(6), c(6)]))
                .is_err()
        );
        index
            .check(&action(1, ActionDomain::Payment, &who, &[c(7)]))
            .unwrap();
        assert!(index.locate(&c(7)).is_none());
        assert!(index.locate(&c(5)).is_none());
        assert!(index.locate(&c(6)).is_none());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_seed_from_records() {
        let records = vec![CommitmentRecord {
            commitment: c(9),
            domain: ActionDomain::DarkPool,
            sequence: 3,
        }];
        let index = CommitmentIndex::from_records(&records);
        assert_eq!(index.locate(&c(9)).unwrap().sequence, 3);
        assert_eq!(index.domain_counts(), vec![(ActionDomain::DarkPool, 1)]);
    }
}
