//! Retention cleanup against PostgreSQL.
//!
//! Runs on a clock in 2001 so the purge window never reaches rows other
//! tests write with the system clock.

mod helpers;

use std::sync::Arc;

use chrono::Duration;

use authvault_core::config::IssuancePolicy;

#[tokio::test]
async fn test_cleanup_trims_chain_from_the_old_end() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let clock = helpers::past_clock();
    let svc = t.services_with_clock(IssuancePolicy::Reject, Arc::new(clock.clone()));

    let (session, t1) = svc.sessions.open(t.user_id, None).await.expect("open");
    let t2 = svc.tokens.rotate(&t1.opaque).await.expect("rotate");
    let t3 = svc.tokens.rotate(&t2.opaque).await.expect("rotate");
    let t4 = svc.tokens.rotate(&t3.opaque).await.expect("rotate");

    clock.advance(Duration::days(3));
    let report = svc.cleanup.run_once().await.expect("cleanup");
    assert!(report.deleted >= 3);
    assert!(report.passes >= 3);

    let remaining = svc.tokens.chain(session.id).await.expect("chain");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, t4.record.id);
    assert!(remaining[0].is_current());
}

#[tokio::test]
async fn test_cleanup_keeps_rows_inside_retention() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let clock = helpers::past_clock();
    clock.advance(Duration::days(30));
    let svc = t.services_with_clock(IssuancePolicy::Reject, Arc::new(clock.clone()));

    let (session, t1) = svc.sessions.open(t.user_id, None).await.expect("open");
    svc.tokens.rotate(&t1.opaque).await.expect("rotate");

    // Expired for 12h, retention is 24h.
    clock.advance(Duration::hours(13));
    svc.cleanup.run_once().await.expect("cleanup");

    assert_eq!(svc.tokens.chain(session.id).await.expect("chain").len(), 2);
}
