//! Users, posts and bookmarks against PostgreSQL.

mod helpers;

use authvault_core::config::IssuancePolicy;
use authvault_core::error::ErrorKind;
use authvault_core::types::PageRequest;
use authvault_database::repositories::{BookmarkRepository, PostRepository, UserRepository};
use authvault_entity::post::{CreatePost, UpdatePost};
use authvault_entity::user::{CreateUser, UpdateUser};

#[tokio::test]
async fn test_user_lifecycle_and_avatar_tri_state() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let users = UserRepository::new(t.db.pool().clone());
    let name = format!("avatar-{}", uuid::Uuid::new_v4().simple());

    let user = users
        .create(&CreateUser {
            user_name: format!("  {name} "),
            image_url: Some("https://img.example/a.png".into()),
        })
        .await
        .expect("create");
    assert_eq!(user.user_name, name);

    let dup = users
        .create(&CreateUser {
            user_name: name.clone(),
            image_url: None,
        })
        .await
        .unwrap_err();
    assert_eq!(dup.kind, ErrorKind::Conflict);

    let kept = users
        .update(
            user.user_id,
            &UpdateUser {
                user_name: Some(format!("{name}-x")),
                image_url: None,
            },
        )
        .await
        .expect("update")
        .expect("exists");
    assert_eq!(kept.image_url.as_deref(), Some("https://img.example/a.png"));
    assert!(kept.updated_at >= user.updated_at);

    let cleared = users
        .update(
            user.user_id,
            &UpdateUser {
                user_name: None,
                image_url: Some(None),
            },
        )
        .await
        .expect("update")
        .expect("exists");
    assert!(cleared.image_url.is_none());

    let found = users
        .find_by_name(&format!("{name}-x"))
        .await
        .expect("find")
        .expect("exists");
    assert_eq!(found.user_id, user.user_id);
    assert!(!users.list(PageRequest::new(500, 0)).await.expect("list").is_empty());

    assert!(users.delete(user.user_id).await.expect("delete"));
    assert!(users.find_by_id(user.user_id).await.expect("find").is_none());
}

#[tokio::test]
async fn test_invalid_user_input_rejected() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let users = UserRepository::new(t.db.pool().clone());

    let err = users
        .create(&CreateUser {
            user_name: "   ".into(),
            image_url: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let err = users
        .create(&CreateUser {
            user_name: "long-avatar".into(),
            image_url: Some("x".repeat(257)),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_posts_and_bookmarks() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let posts = PostRepository::new(t.db.pool().clone());
    let bookmarks = BookmarkRepository::new(t.db.pool().clone());

    let post = posts
        .create(&CreatePost {
            title: "Rotation".into(),
            content: "Tokens rotate.".into(),
            author_id: t.user_id,
        })
        .await
        .expect("create post");

    let updated = posts
        .update(
            post.post_id,
            &UpdatePost {
                title: None,
                content: Some("Tokens rotate once.".into()),
            },
        )
        .await
        .expect("update")
        .expect("exists");
    assert_eq!(updated.title, "Rotation");
    assert_eq!(updated.content, "Tokens rotate once.");

    let mark = bookmarks.add(t.user_id, post.post_id).await.expect("bookmark");
    assert_eq!(mark.post_id, post.post_id);
    let dup = bookmarks.add(t.user_id, post.post_id).await.unwrap_err();
    assert_eq!(dup.kind, ErrorKind::Conflict);

    let listed = bookmarks.list_by_user(t.user_id).await.expect("list");
    assert_eq!(listed.len(), 1);

    // Deleting the post takes its bookmarks with it.
    assert!(posts.delete(post.post_id).await.expect("delete"));
    assert!(bookmarks.list_by_user(t.user_id).await.expect("list").is_empty());
    assert!(!bookmarks.remove(t.user_id, post.post_id).await.expect("remove"));
}

#[tokio::test]
async fn test_deleting_user_cascades_to_sessions_and_tokens() {
    let Some(t) = helpers::TestDb::connect().await else {
        return;
    };
    let svc = t.services(IssuancePolicy::Reject);
    let (session, issued) = svc.sessions.open(t.user_id, None).await.expect("open");
    svc.tokens.rotate(&issued.opaque).await.expect("rotate");

    let users = UserRepository::new(t.db.pool().clone());
    assert!(users.delete(t.user_id).await.expect("delete"));

    assert!(svc.store.find_session(session.id).await.expect("find").is_none());
    assert!(svc.store.session_tokens(session.id).await.expect("tokens").is_empty());
    let err = svc.tokens.rotate(&issued.opaque).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidToken);
}
