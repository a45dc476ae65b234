//! Ownership checks on mutating operations: a missing secret and a
//! non-owned secret must be indistinguishable to the caller.

mod common;

use common::{create_request, seed_user, setup};
use secureshare::domain::SecretId;
use secureshare::errors::SecureShareError;
use secureshare::services::UpdateSecretRequest;

fn is_unauthorized(err: &SecureShareError) -> bool {
    matches!(err, SecureShareError::Unauthorized { .. })
}

#[tokio::test]
async fn non_owner_and_nonexistent_update_yield_same_error_kind() {
    let app = setup().await;
    let stranger = seed_user(&app.pool, "stranger@example.com").await;
    let secret = app.service.create_secret(&app.owner, create_request("mine")).await.unwrap();

    let not_yours = app
        .service
        .update_secret(&secret.id, &stranger, UpdateSecretRequest::default())
        .await
        .unwrap_err();
    let not_there = app
        .service
        .update_secret(&SecretId::new(), &stranger, UpdateSecretRequest::default())
        .await
        .unwrap_err();

    assert!(is_unauthorized(&not_yours));
    assert!(is_unauthorized(&not_there));
    // Same presentation status as well: no existence leak
    assert_eq!(not_yours.status_code(), not_there.status_code());
}

#[tokio::test]
async fn non_owner_and_nonexistent_delete_yield_same_error_kind() {
    let app = setup().await;
    let stranger = seed_user(&app.pool, "stranger@example.com").await;
    let secret = app.service.create_secret(&app.owner, create_request("mine")).await.unwrap();

    let not_yours = app.service.delete_secret(&secret.id, &stranger).await.unwrap_err();
    let not_there = app.service.delete_secret(&SecretId::new(), &stranger).await.unwrap_err();

    assert!(is_unauthorized(&not_yours));
    assert!(is_unauthorized(&not_there));

    // The secret was not touched
    let view = app.service.get_secret(&secret.id, false).await.unwrap();
    assert!(view.metadata.is_active);
}

#[tokio::test]
async fn share_and_access_log_listing_are_owner_gated() {
    let app = setup().await;
    let stranger = seed_user(&app.pool, "stranger@example.com").await;
    let secret = app.service.create_secret(&app.owner, create_request("mine")).await.unwrap();

    let err = app
        .service
        .share_secret(&secret.id, &stranger, "friend@example.com")
        .await
        .unwrap_err();
    assert!(is_unauthorized(&err));

    let err = app.service.list_access_logs(&secret.id, &stranger, 10).await.unwrap_err();
    assert!(is_unauthorized(&err));

    // The owner can do both
    app.service.share_secret(&secret.id, &app.owner, "friend@example.com").await.unwrap();
    app.service.list_access_logs(&secret.id, &app.owner, 10).await.unwrap();
}

#[tokio::test]
async fn owner_update_changes_settings() {
    let app = setup().await;
    let mut request = create_request("mine");
    request.password = Some("old-pass".to_string());
    let secret = app.service.create_secret(&app.owner, request).await.unwrap();

    // Clear the password and cap the views
    let updated = app
        .service
        .update_secret(
            &secret.id,
            &app.owner,
            UpdateSecretRequest {
                password: Some(None),
                max_views: Some(Some(2)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(!updated.has_password());
    assert_eq!(updated.max_views, Some(2));

    // Accessible without a password now
    let accessed = app
        .service
        .access_secret(&secret.id, common::access_from("10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(accessed.current_views, 1);
}
