//! Rotation, replay, and revocation against PostgreSQL.

mod helpers;

use authvault_core::config::IssuancePolicy;
use authvault_core::error::ErrorKind;
use authvault_database::error::classify;
use authvault_entity::token::TokenState;

#[tokio::test]
async fn test_rotation_links_chain() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let svc = t.services(IssuancePolicy::Reject);

    let (session, first) = svc.sessions.open(t.user_id, None).await.expect("open");
    let second = svc.tokens.rotate(&first.opaque).await.expect("rotate");

    assert_eq!(second.previous_id, first.record.id);
    assert_eq!(second.session_id, session.id);
    assert_eq!(second.user_id, t.user_id);

    let chain = svc.tokens.chain(session.id).await.expect("chain");
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].id, first.record.id);
    assert_eq!(chain[0].replaced_by, Some(second.record.id));
    assert!(chain[0].used_at.is_some());
    assert!(chain[1].is_current());

    assert!(!svc.tokens.is_current_and_valid(&first.opaque).await.expect("check"));
    assert!(svc.tokens.is_current_and_valid(&second.opaque).await.expect("check"));
}

#[tokio::test]
async fn test_replay_revokes_session_then_successor_fails() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let svc = t.services(IssuancePolicy::Reject);

    let (session, t1) = svc.sessions.open(t.user_id, Some("jkt-1")).await.expect("open");
    let t2 = svc.tokens.rotate(&t1.opaque).await.expect("rotate");
    assert_eq!(t2.dpop_jkt.as_deref(), Some("jkt-1"));

    let replay = svc.tokens.rotate(&t1.opaque).await.unwrap_err();
    assert_eq!(replay.kind, ErrorKind::ReplayDetected);

    let stored = svc.sessions.get(session.id).await.expect("session");
    assert!(stored.is_revoked());

    let chain = svc.tokens.chain(session.id).await.expect("chain");
    assert!(chain.iter().all(|tok| !tok.is_current()));

    let after = svc.tokens.rotate(&t2.opaque).await.unwrap_err();
    assert_eq!(after.kind, ErrorKind::SessionRevoked);
}

#[tokio::test]
async fn test_session_revocation_leaves_token_rows_untouched() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let svc = t.services(IssuancePolicy::Reject);

    let (session, issued) = svc.sessions.open(t.user_id, None).await.expect("open");
    svc.sessions.revoke(session.id).await.expect("revoke");

    assert!(!svc.tokens.is_current_and_valid(&issued.opaque).await.expect("check"));

    let status = svc.tokens.inspect(&issued.opaque).await.expect("inspect");
    assert!(status.session_revoked);
    assert_eq!(status.state, TokenState::Current);
    assert!(status.token.revoked_at.is_none());
    assert!(!status.is_usable());

    let err = svc.tokens.rotate(&issued.opaque).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::SessionRevoked);
}

#[tokio::test]
async fn test_expired_token_rejected_without_writes() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let clock = helpers::past_clock();
    let svc = t.services_with_clock(IssuancePolicy::Reject, std::sync::Arc::new(clock.clone()));

    let (session, issued) = svc.sessions.open(t.user_id, None).await.expect("open");
    clock.advance(chrono::Duration::hours(2));

    let err = svc.tokens.rotate(&issued.opaque).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenExpired);

    let chain = svc.tokens.chain(session.id).await.expect("chain");
    assert_eq!(chain.len(), 1);
    assert!(chain[0].used_at.is_none());
    assert!(!svc.sessions.get(session.id).await.expect("session").is_revoked());
    assert!(!svc.tokens.is_current_and_valid(&issued.opaque).await.expect("check"));
}

#[tokio::test]
async fn test_unknown_and_revoked_tokens() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let svc = t.services(IssuancePolicy::Reject);

    let err = svc.tokens.rotate("never-issued").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidToken);

    let (session, issued) = svc.sessions.open(t.user_id, None).await.expect("open");
    svc.tokens.revoke(&issued.opaque).await.expect("revoke");
    svc.tokens.revoke(&issued.opaque).await.expect("revoke twice");

    let err = svc.tokens.rotate(&issued.opaque).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ReplayDetected);
    assert!(svc.sessions.get(session.id).await.expect("session").is_revoked());
}

#[tokio::test]
async fn test_key_binding_rules() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let svc = t.services(IssuancePolicy::Reject);

    let session = svc.sessions.create(t.user_id, None).await.expect("create");
    svc.sessions
        .bind_key_thumbprint(session.id, "thumb")
        .await
        .expect("bind");
    svc.sessions
        .bind_key_thumbprint(session.id, "thumb")
        .await
        .expect("same value again");

    let err = svc
        .sessions
        .bind_key_thumbprint(session.id, "other")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AlreadyBound);

    let err = svc
        .sessions
        .create(uuid::Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_replaced_by_cannot_be_repointed() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let svc = t.services(IssuancePolicy::Reject);

    let (_, t1) = svc.sessions.open(t.user_id, None).await.expect("open");
    let t2 = svc.tokens.rotate(&t1.opaque).await.expect("rotate");
    let t3 = svc.tokens.rotate(&t2.opaque).await.expect("rotate");

    let err = sqlx::query("UPDATE refresh_tokens SET replaced_by = $1 WHERE id = $2")
        .bind(t3.record.id)
        .bind(t1.record.id)
        .execute(t.db.pool())
        .await
        .map_err(|e| classify("Failed to repoint token", e))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConstraintViolation);

    let cleared = sqlx::query("UPDATE refresh_tokens SET replaced_by = NULL WHERE id = $1")
        .bind(t1.record.id)
        .execute(t.db.pool())
        .await
        .map_err(|e| classify("Failed to clear successor", e))
        .unwrap_err();
    assert_eq!(cleared.kind, ErrorKind::ConstraintViolation);

    let chain = svc.tokens.chain(t1.record.session_id).await.expect("chain");
    assert_eq!(chain[0].replaced_by, Some(t2.record.id));
}

#[tokio::test]
async fn test_token_cannot_replace_itself() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let svc = t.services(IssuancePolicy::Reject);

    let (_, issued) = svc.sessions.open(t.user_id, None).await.expect("open");

    let err = sqlx::query("UPDATE refresh_tokens SET replaced_by = id WHERE id = $1")
        .bind(issued.record.id)
        .execute(t.db.pool())
        .await
        .map_err(|e| classify("Failed to self-link token", e))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConstraintViolation);

    assert!(svc.tokens.is_current_and_valid(&issued.opaque).await.expect("check"));
}
