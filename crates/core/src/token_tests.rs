// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::*;
use crate::cache::InMemoryCache;

fn service() -> TokenService {
    TokenService::new(
        "test-secret-at-least-16-bytes",
        Duration::from_secs(3600),
        Duration::from_secs(604_800),
        Arc::new(InMemoryCache::new()),
    )
}

#[tokio::test]
async fn issued_access_token_validates_to_same_subject() {
    let svc = service();
    let user_id = Uuid::new_v4();
    let pair = svc.issue(user_id, Role::Student).await.unwrap();

    let claim = svc.validate(&pair.access).await.unwrap();
    assert_eq!(claim.user_id, user_id);
    assert_eq!(claim.role, Role::Student);
    assert_eq!(claim.kind, TokenKind::Access);
}

#[tokio::test]
async fn rotate_replaces_refresh_token_and_revokes_the_old_one() {
    let svc = service();
    let user_id = Uuid::new_v4();
    let first = svc.issue(user_id, Role::Student).await.unwrap();

    let rotated = svc.rotate(&first.refresh).await.unwrap();
    assert_ne!(rotated.refresh, first.refresh);

    // The old refresh token was single-use; rotating it again must fail.
    let result = svc.rotate(&first.refresh).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn rotate_rejects_an_access_token() {
    let svc = service();
    let pair = svc.issue(Uuid::new_v4(), Role::Proctor).await.unwrap();
    let result = svc.rotate(&pair.access).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn revoke_makes_a_valid_token_fail_validation() {
    let svc = service();
    let pair = svc.issue(Uuid::new_v4(), Role::Admin).await.unwrap();
    svc.revoke(&pair.access).await.unwrap();
    let result = svc.validate(&pair.access).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn garbage_token_fails_validation() {
    let svc = service();
    let result = svc.validate("not-a-real-token").await;
    assert!(result.is_err());
}
