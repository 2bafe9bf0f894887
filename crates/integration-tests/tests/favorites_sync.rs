//! Identity bootstrap and favorites synchronization scenarios.
//!
//! Run with: cargo test -p viva-mais-integration-tests --test favorites_sync

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use viva_mais_core::{ExperienceId, FavoritesRecord, NotificationKind, VisitorId};
use viva_mais_integration_tests::{TestContext, favorite_set, favorites_path, test_config};
use viva_mais_sync::backend::{IdentityProvider, MemoryBackend};
use viva_mais_sync::{IdentitySource, Session, SessionConfig, SyncError};

fn exp(s: &str) -> ExperienceId {
    ExperienceId::parse(s).unwrap()
}

fn returning_visitor_config(token: &str) -> SessionConfig {
    SessionConfig {
        initial_auth_token: Some(SecretString::from(token)),
        ..test_config()
    }
}

#[tokio::test]
async fn test_fresh_visitor_first_favorite_creates_record() {
    let ctx = TestContext::new().await;
    assert!(ctx.backend.document(&ctx.path()).is_none());

    ctx.session.add_favorite(exp("exp1")).await.unwrap();

    let stored = ctx.backend.document(&ctx.path()).unwrap();
    assert_eq!(
        serde_json::to_value(&stored).unwrap(),
        json!({"experiences": ["exp1"]})
    );
    ctx.wait_favorites(&favorite_set(&["exp1"])).await;
}

#[tokio::test]
async fn test_existing_favorite_is_not_duplicated() {
    let ctx = TestContext::new().await;
    ctx.backend.put_document(
        &ctx.path(),
        FavoritesRecord {
            experiences: favorite_set(&["exp1", "exp2"]),
        },
    );

    ctx.session.add_favorite(exp("exp2")).await.unwrap();

    let stored = ctx.backend.document(&ctx.path()).unwrap();
    assert_eq!(
        serde_json::to_value(&stored).unwrap(),
        json!({"experiences": ["exp1", "exp2"]})
    );
    ctx.wait_favorites(&favorite_set(&["exp1", "exp2"])).await;
}

#[tokio::test]
async fn test_two_sessions_of_one_visitor_converge() {
    let backend = MemoryBackend::new();
    let visitor = VisitorId::parse("shared-visitor").unwrap();
    backend.register_custom_token("phone", visitor.clone());
    backend.register_custom_token("laptop", visitor.clone());

    // Each device has its own provider session but the same account.
    let phone = TestContext::on(backend.clone(), returning_visitor_config("phone")).await;
    let laptop = TestContext::on(backend.clone(), returning_visitor_config("laptop")).await;
    assert_eq!(phone.visitor, visitor);
    assert_eq!(laptop.visitor, visitor);

    phone.session.add_favorite(exp("exp3")).await.unwrap();
    laptop.wait_favorites(&favorite_set(&["exp3"])).await;

    laptop.session.add_favorite(exp("exp5")).await.unwrap();
    laptop.session.remove_favorite(exp("exp3")).await.unwrap();
    phone.wait_favorites(&favorite_set(&["exp5"])).await;
    laptop.wait_favorites(&favorite_set(&["exp5"])).await;
}

#[tokio::test]
async fn test_sign_out_then_restart_is_a_new_visitor() {
    let ctx = TestContext::new().await;
    ctx.session.add_favorite(exp("exp1")).await.unwrap();
    ctx.wait_favorites(&favorite_set(&["exp1"])).await;

    ctx.session.sign_out().await.unwrap();
    assert!(ctx.session.identity().visitor.is_none());
    assert!(ctx.session.favorites().is_empty());

    ctx.session.start();
    let state = ctx.session.wait_ready().await;
    let next = state.visitor.unwrap();
    assert_ne!(next, ctx.visitor);
    assert!(ctx.session.wait_synced().await.is_empty());

    // The previous visitor's record is untouched.
    assert_eq!(
        ctx.backend.document(&favorites_path(&ctx.visitor)).unwrap(),
        FavoritesRecord::single(exp("exp1"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_rejected_write_notifies_and_expires() {
    let ctx = TestContext::new().await;
    ctx.session.add_favorite(exp("exp1")).await.unwrap();
    ctx.wait_favorites(&favorite_set(&["exp1"])).await;

    ctx.backend.fail_next_writes(1);
    let result = ctx.session.remove_favorite(exp("exp1")).await;

    assert!(matches!(result, Err(SyncError::RemoteWriteFailed(_))));
    assert_eq!(ctx.session.favorites(), favorite_set(&["exp1"]));
    let notification = ctx.session.notification().unwrap();
    assert_eq!(notification.kind, NotificationKind::Error);

    tokio::time::sleep(Duration::from_millis(2900)).await;
    assert!(ctx.session.notification().is_some());
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(ctx.session.notification().is_none());
}

#[tokio::test]
async fn test_provider_outage_yields_usable_local_identity() {
    let backend = MemoryBackend::new();
    backend.fail_sign_in(true);
    let session = Session::with_backend(backend.clone(), test_config());
    session.start();

    let state = session.wait_ready().await;
    assert_eq!(state.source, Some(IdentitySource::Local));

    // The provider recovers and another tab signs in: the remote identity
    // takes over.
    backend.fail_sign_in(false);
    let user = backend.sign_in_anonymously().await.unwrap();
    let mut rx = session.watch_identity();
    let state = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.visitor.as_ref() == Some(&user.uid)),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    assert!(state.is_remote());
}

#[tokio::test]
async fn test_environment_without_provider_is_degraded() {
    let config = SessionConfig::from_lookup(|key| match key {
        "VIVA_APP_ID" => Some("vivamais".to_string()),
        _ => None,
    })
    .unwrap();
    let session = Session::connect(config);
    session.start();

    let state = session.identity();
    assert!(session.is_degraded());
    assert!(state.ready);
    assert!(state.visitor.is_some());

    let result = session.add_favorite(exp("exp1")).await;
    assert!(matches!(result, Err(SyncError::NotReady)));
}
