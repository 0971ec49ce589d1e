use std::sync::Arc;

use cloak_privacy::{ActionDomain, Commitment, Nullifier, PoolVersion, Root};

use super::*;
use crate::error::RouterError;
use crate::router::{AuditEvent, EventSink};

#[test]
fn accepted_action_spends_and_advances() {
    let mut h = Harness::new(true);

    let first = bound_action(ActionDomain::Swap, PoolVersion::V3, R0, 101, &[1], &[50]);
    let receipt = h.submit(&first).unwrap();
    assert_eq!(receipt.sequence, 0);
    assert_eq!(receipt.new_root, root(101));
    assert!(h.router.is_nullifier_used(&nul(1)));
    assert_eq!(h.router.current_root(PoolVersion::V3), root(101));

    // identical payload now targets a stale root
    assert!(matches!(
        h.submit(&first),
        Err(RouterError::RootMismatch { expected, got, .. })
            if expected == root(101) && got == root(R0)
    ));

    // live root, spent nullifier
    let replay = bound_action(ActionDomain::Swap, PoolVersion::V3, 101, 102, &[1], &[51]);
    assert!(matches!(
        h.submit(&replay),
        Err(RouterError::NullifierAlreadyUsed(n)) if n == nul(1)
    ));
    assert_eq!(h.router.current_root(PoolVersion::V3), root(101));
}

#[test]
fn roots_advance_linearly() {
    let mut h = Harness::new(true);

    let mut live = R0;
    for i in 0..5u64 {
        let next = 1000 + i;
        let action = bound_action(ActionDomain::Payment, PoolVersion::V3, live, next, &[i + 1], &[]);
        let receipt = h.submit(&action).unwrap();
        assert_eq!(receipt.sequence, i);
        live = next;
    }

    assert_eq!(h.router.current_root(PoolVersion::V3), root(1004));
    assert_eq!(
        h.router.root_history(PoolVersion::V3),
        vec![root(R0), root(1000), root(1001), root(1002), root(1003)]
    );
}

#[test]
fn racing_submissions_on_same_root() {
    let mut h = Harness::new(true);

    let a = bound_action(ActionDomain::Stake, PoolVersion::V3, R0, 301, &[1], &[]);
    let b = bound_action(ActionDomain::Stake, PoolVersion::V3, R0, 302, &[2], &[]);

    h.submit(&a).unwrap();
    assert!(matches!(h.submit(&b), Err(RouterError::RootMismatch { .. })));
    assert!(!h.router.is_nullifier_used(&nul(2)));

    // resubmitted against the new root it goes through
    let b = bound_action(ActionDomain::Stake, PoolVersion::V3, 301, 302, &[2], &[]);
    h.submit(&b).unwrap();
}

#[test]
fn batch_with_spent_nullifier_changes_nothing() {
    let mut h = Harness::new(true);
    h.submit(&bound_action(ActionDomain::Swap, PoolVersion::V3, R0, 101, &[2], &[]))
        .unwrap();
    let events_before = h.events.len();

    let batch = bound_action(ActionDomain::Swap, PoolVersion::V3, 101, 102, &[1, 2, 3], &[60]);
    assert!(matches!(
        h.submit(&batch),
        Err(RouterError::NullifierAlreadyUsed(n)) if n == nul(2)
    ));

    assert!(!h.router.is_nullifier_used(&nul(1)));
    assert!(!h.router.is_nullifier_used(&nul(3)));
    assert_eq!(h.router.current_root(PoolVersion::V3), root(101));
    assert!(h.index.locate(&com(60)).is_none());
    assert_eq!(h.events.len(), events_before);
}

#[test]
fn batch_repeating_a_nullifier_is_rejected() {
    let mut h = Harness::new(true);
    let batch = bound_action(ActionDomain::Swap, PoolVersion::V3, R0, 101, &[4, 4], &[]);

    assert!(matches!(
        h.submit(&batch),
        Err(RouterError::NullifierAlreadyUsed(_))
    ));
    assert!(!h.router.is_nullifier_used(&nul(4)));
}

#[test]
fn proof_bound_to_other_domain_is_rejected() {
    let mut h = Harness::new(true);

    let swap = bound_action(ActionDomain::Swap, PoolVersion::V3, R0, 101, &[1], &[]);
    let mut relabeled = swap.clone();
    relabeled.domain = ActionDomain::Governance;

    assert!(matches!(
        h.submit(&relabeled),
        Err(RouterError::InvalidProof(_))
    ));
    // binding fails before the backend is consulted
    assert_eq!(h.verifier.calls(), 0);
    assert!(!h.router.is_nullifier_used(&nul(1)));

    h.submit(&swap).unwrap();
}

#[test]
fn tampered_statement_is_rejected() {
    let mut h = Harness::new(true);

    let mut action = bound_action(ActionDomain::Swap, PoolVersion::V3, R0, 101, &[1], &[9]);
    action.new_root = root(666);
    assert!(matches!(h.submit(&action), Err(RouterError::InvalidProof(_))));

    let mut action = bound_action(ActionDomain::Swap, PoolVersion::V3, R0, 101, &[1], &[9]);
    action.nullifiers.clear();
    assert!(matches!(h.submit(&action), Err(RouterError::InvalidProof(_))));

    let mut action = bound_action(ActionDomain::Swap, PoolVersion::V3, R0, 101, &[1], &[9]);
    action.public_inputs.truncate(1);
    assert!(matches!(h.submit(&action), Err(RouterError::InvalidProof(_))));

    assert_eq!(h.router.current_root(PoolVersion::V3), root(R0));
}

#[test]
fn rejected_proof_changes_nothing() {
    let mut h = Harness::new(false);

    let action = bound_action(ActionDomain::LimitOrder, PoolVersion::V3, R0, 101, &[1], &[5]);
    assert!(matches!(h.submit(&action), Err(RouterError::InvalidProof(_))));

    assert_eq!(h.verifier.calls(), 1);
    assert!(!h.router.is_nullifier_used(&nul(1)));
    assert_eq!(h.router.current_root(PoolVersion::V3), root(R0));
    assert!(h.store.snapshot().nullifiers.is_empty());
}

#[test]
fn router_without_verifier_is_not_configured() {
    let mut router = ActionRouter::in_memory(settings(PoolVersion::V3));
    router.register_handler(ActionDomain::Swap, Arc::new(CommitmentIndex::new()));

    let action = bound_action(ActionDomain::Swap, PoolVersion::V3, R0, 101, &[1], &[]);
    assert!(matches!(
        router.submit_action(&addr(ALICE), &action),
        Err(RouterError::RouterNotConfigured)
    ));
    assert!(matches!(
        router.set_verification_mode(&addr(ADMIN), 3),
        Err(RouterError::RouterNotConfigured)
    ));
}

#[test]
fn domain_without_handler_is_unknown() {
    let mut router = ActionRouter::in_memory(settings(PoolVersion::V3));
    router
        .set_verifier(&addr(ADMIN), VerifierAdapter::mock(addr(ADMIN), true))
        .unwrap();
    router.register_handler(ActionDomain::Swap, Arc::new(CommitmentIndex::new()));

    let action = bound_action(ActionDomain::BtcSwap, PoolVersion::V3, R0, 101, &[1], &[]);
    assert!(matches!(
        router.submit_action(&addr(ALICE), &action),
        Err(RouterError::UnknownActionDomain(ActionDomain::BtcSwap))
    ));
    assert!(!router.is_nullifier_used(&nul(1)));
    assert_eq!(router.current_root(PoolVersion::V3), root(R0));
}

#[test]
fn handler_refusal_aborts_submission() {
    let mut h = Harness::new(true);
    h.submit(&bound_action(ActionDomain::Payment, PoolVersion::V3, R0, 101, &[1], &[70]))
        .unwrap();

    // commitment 70 already exists
    let dup = bound_action(ActionDomain::Payment, PoolVersion::V3, 101, 102, &[2], &[70]);
    assert!(matches!(
        h.submit(&dup),
        Err(RouterError::HandlerRejected { domain: ActionDomain::Payment, .. })
    ));
    assert!(!h.router.is_nullifier_used(&nul(2)));
    assert_eq!(h.router.current_root(PoolVersion::V3), root(101));
}

#[test]
fn storage_failure_leaves_memory_untouched() {
    let mut h = Harness::new(true);
    h.store.set_fail_commits(true);

    let action = bound_action(ActionDomain::Swap, PoolVersion::V3, R0, 101, &[1], &[50]);
    assert!(matches!(h.submit(&action), Err(RouterError::Storage(_))));
    assert!(!h.router.is_nullifier_used(&nul(1)));
    assert_eq!(h.router.current_root(PoolVersion::V3), root(R0));
    assert!(h.index.locate(&com(50)).is_none());
    assert!(h.index.is_empty());

    // the identical submission goes through once the store recovers
    h.store.set_fail_commits(false);
    let receipt = h.submit(&action).unwrap();
    assert_eq!(receipt.sequence, 0);
    assert_eq!(h.index.locate(&com(50)).map(|r| r.sequence), Some(0));
}

#[test]
fn aliased_nullifier_cannot_respend_note() {
    let mut h = Harness::new(true);
    h.submit(&bound_action(ActionDomain::Swap, PoolVersion::V3, R0, 101, &[1], &[]))
        .unwrap();

    // n + r binds to the same public inputs as n
    let honest = bound_action(ActionDomain::Swap, PoolVersion::V3, 101, 102, &[1], &[]);
    let mut aliased = honest.clone();
    aliased.nullifiers = vec![Nullifier(alias(1))];
    assert!(aliased.statement(PoolVersion::V3).is_bound_by(&honest.public_inputs));

    assert!(matches!(
        h.submit(&aliased),
        Err(RouterError::NonCanonicalElement { what: "nullifier", .. })
    ));
    assert_eq!(h.verifier.calls(), 1);
    assert_eq!(h.router.current_root(PoolVersion::V3), root(101));
    assert!(!h.router.is_nullifier_used(&Nullifier(alias(1))));
    assert_eq!(h.router.status().nullifiers_used, 1);
}

#[test]
fn non_canonical_identifiers_are_refused() {
    let mut h = Harness::new(true);

    let mut action = bound_action(ActionDomain::Payment, PoolVersion::V3, R0, 101, &[1], &[60]);
    action.commitments = vec![Commitment(alias(60))];
    assert!(matches!(
        h.submit(&action),
        Err(RouterError::NonCanonicalElement { what: "commitment", .. })
    ));

    let mut action = bound_action(ActionDomain::Payment, PoolVersion::V3, R0, 101, &[1], &[]);
    action.new_root = Root(alias(101));
    assert!(matches!(
        h.submit(&action),
        Err(RouterError::NonCanonicalElement { what: "root", .. })
    ));

    assert!(h.index.is_empty());
    assert!(!h.router.is_nullifier_used(&nul(1)));
    assert_eq!(h.router.current_root(PoolVersion::V3), root(R0));
}

#[test]
fn nullifiers_are_global_across_versions() {
    let mut h = Harness::new(true);
    h.submit(&bound_action(ActionDomain::Swap, PoolVersion::V3, R0, 101, &[9], &[]))
        .unwrap();

    let legacy = bound_action(ActionDomain::Withdraw, PoolVersion::V2, LEGACY_R0, 201, &[9], &[]);
    assert!(matches!(
        h.submit(&legacy),
        Err(RouterError::NullifierAlreadyUsed(_))
    ));
    assert_eq!(h.router.current_root(PoolVersion::V2), root(LEGACY_R0));
}

#[test]
fn omitted_version_targets_active_pool() {
    let mut h = Harness::new(true);
    let mut action = bound_action(ActionDomain::Stake, PoolVersion::V3, R0, 101, &[1], &[]);
    action.version = None;

    let receipt = h.submit(&action).unwrap();
    assert_eq!(receipt.version, PoolVersion::V3);
}

#[test]
fn accepted_action_is_audited() {
    let mut h = Harness::new(true);
    h.submit(&bound_action(ActionDomain::Stake, PoolVersion::V3, R0, 101, &[1, 2], &[3]))
        .unwrap();

    let events = h.events.recent(10);
    let last = events.last().map(|r| r.event.clone());
    assert_eq!(
        last,
        Some(AuditEvent::ActionExecuted {
            sequence: 0,
            domain: ActionDomain::Stake,
            version: PoolVersion::V3,
            participant: addr(ALICE),
            nullifier_count: 2,
            commitment_count: 1,
        })
    );
}

#[test]
fn verifier_is_set_once_by_admin() {
    let mut h = Harness::new(true);

    assert!(matches!(
        h.router
            .set_verifier(&addr(ADMIN), VerifierAdapter::mock(addr(ADMIN), false)),
        Err(RouterError::VerifierAlreadySet)
    ));
    assert!(matches!(
        h.router
            .set_verifier(&addr(ALICE), VerifierAdapter::mock(addr(ALICE), false)),
        Err(RouterError::Unauthorized(_))
    ));

    let mut open = ActionRouter::in_memory(RouterSettings {
        verifier_set_once: false,
        ..settings(PoolVersion::V3)
    });
    open.set_verifier(&addr(ADMIN), VerifierAdapter::mock(addr(ADMIN), true))
        .unwrap();
    open.set_verifier(&addr(ADMIN), VerifierAdapter::mock(addr(ADMIN), false))
        .unwrap();
}

#[test]
fn verification_mode_switch_through_router() {
    let mut h = Harness::new(true);

    assert!(matches!(
        h.router.set_verification_mode(&addr(ALICE), 3),
        Err(RouterError::Unauthorized(_))
    ));
    // no garaga backend registered
    assert!(matches!(
        h.router.set_verification_mode(&addr(ADMIN), 0),
        Err(RouterError::UnsupportedMode(_))
    ));
    assert!(matches!(
        h.router.set_verification_mode(&addr(ADMIN), 42),
        Err(RouterError::UnsupportedMode(_))
    ));

    assert_eq!(
        h.router.set_verification_mode(&addr(ADMIN), 3).unwrap(),
        VerificationMode::Mock
    );
    assert!(matches!(
        h.events.recent(1)[0].event,
        AuditEvent::VerificationModeChanged {
            mode: VerificationMode::Mock
        }
    ));
}

#[test]
fn extra_sinks_see_every_event() {
    struct Counter(std::sync::atomic::AtomicUsize);
    impl EventSink for Counter {
        fn emit(&self, _event: &AuditEvent) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    let mut h = Harness::new(true);
    let counter = Arc::new(Counter(Default::default()));
    h.router.add_event_sink(counter.clone());

    h.submit(&bound_action(ActionDomain::Swap, PoolVersion::V3, R0, 101, &[1], &[]))
        .unwrap();
    h.submit_intent(500);

    assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[test]
fn status_reports_router_state() {
    let mut h = Harness::new(true);
    h.submit(&bound_action(ActionDomain::Swap, PoolVersion::V3, R0, 101, &[1, 2], &[]))
        .unwrap();
    h.submit_intent(600);

    let status = h.router.status();
    assert_eq!(status.active_version, PoolVersion::V3);
    assert_eq!(status.roots.get(&PoolVersion::V3), Some(&root(101)));
    assert_eq!(status.nullifiers_used, 2);
    assert_eq!(status.pending_intents, 1);
    assert_eq!(status.finalized_intents, 0);
    assert_eq!(status.next_sequence, 1);
    assert_eq!(status.verification_mode, Some(VerificationMode::Mock));
    assert_eq!(status.handled_domains.len(), ActionDomain::ALL.len());
}
