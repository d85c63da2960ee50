//! Races that must resolve to a single winner.

mod helpers;

use std::sync::Arc;

use chrono::Duration;
use futures::future::join_all;

use authvault_core::config::IssuancePolicy;
use authvault_core::error::ErrorKind;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rotation_has_single_winner() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let svc = t.services(IssuancePolicy::Reject);
    let (session, t1) = svc.sessions.open(t.user_id, None).await.expect("open");

    let results = join_all((0..2).map(|_| svc.tokens.rotate(&t1.opaque))).await;

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = results
        .iter()
        .find_map(|r| r.as_ref().err())
        .expect("one loser");
    assert_eq!(loser.kind, ErrorKind::ReplayDetected);

    let chain = svc.tokens.chain(session.id).await.expect("chain");
    assert_eq!(chain.len(), 2);
    assert!(chain.iter().filter(|tok| tok.is_current()).count() <= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issuance_keeps_one_current() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let svc = t.services(IssuancePolicy::Reject);
    let session = svc.sessions.create(t.user_id, None).await.expect("create");

    let results = join_all((0..4).map(|_| svc.tokens.issue_default(session.id))).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.kind, ErrorKind::TokenAlreadyCurrent);
    }

    let tokens = svc.store.session_tokens(session.id).await.expect("tokens");
    assert_eq!(tokens.iter().filter(|tok| tok.is_current()).count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_supersede_keeps_one_current() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let svc = t.services(IssuancePolicy::Supersede);
    let session = svc.sessions.create(t.user_id, None).await.expect("create");

    let results = join_all((0..4).map(|_| svc.tokens.issue_default(session.id))).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let tokens = svc.store.session_tokens(session.id).await.expect("tokens");
    assert_eq!(tokens.len(), 4);
    assert_eq!(tokens.iter().filter(|tok| tok.is_current()).count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cleanup_does_not_abort_concurrent_replays() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let clock = helpers::past_clock();
    let svc = t.services_with_clock(IssuancePolicy::Reject, Arc::new(clock.clone()));

    let mut replayed = Vec::new();
    for _ in 0..8 {
        let (session, issued) = svc.sessions.open(t.user_id, None).await.expect("open");
        let mut previous = issued.opaque;
        let mut current = svc.tokens.rotate(&previous).await.expect("rotate").opaque;
        for _ in 0..4 {
            previous = current;
            current = svc.tokens.rotate(&previous).await.expect("rotate").opaque;
        }
        replayed.push((session.id, previous));
    }
    clock.advance(Duration::days(3));

    let replays = join_all(replayed.iter().map(|(_, opaque)| svc.tokens.rotate(opaque)));
    let (results, report) = tokio::join!(replays, svc.cleanup.run_once());

    report.expect("cleanup");
    for ((session_id, _), result) in replayed.iter().zip(results) {
        let err = result.unwrap_err();
        assert!(
            matches!(err.kind, ErrorKind::ReplayDetected | ErrorKind::InvalidToken),
            "unexpected {:?}",
            err.kind
        );
        if err.kind == ErrorKind::ReplayDetected {
            assert!(svc.sessions.get(*session_id).await.expect("session").is_revoked());
        }
    }
}
