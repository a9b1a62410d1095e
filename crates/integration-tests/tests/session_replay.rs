//! End-to-end tests for the anonymous-action capture and replay flow.

#![allow(clippy::unwrap_used)]

use gilded_mango_client::context::{GatedOutcome, LOGIN_ROUTE};
use gilded_mango_client::session::{AuthError, PasswordIssue, SessionStatus};
use gilded_mango_integration_tests::{TestHarness, catalog_item};

use std::sync::atomic::Ordering;

// =============================================================================
// Capture and replay
// =============================================================================

#[tokio::test]
async fn test_anonymous_add_to_cart_replays_after_login() {
    let harness = TestHarness::with_catalog(vec![catalog_item(
        "P1", "Air Runner", "Nike", "Footwear", 90,
    )]);
    let ctx = &harness.context;
    ctx.init().await.unwrap();

    let item = catalog_item("P1", "Air Runner", "Nike", "Footwear", 90);
    let outcome = ctx
        .add_to_cart(
            &item,
            Some("M".to_string()),
            "Black".to_string(),
            1,
            "/product/P1",
        )
        .unwrap();

    // Anonymous: the action is captured, not executed.
    assert_eq!(
        outcome,
        GatedOutcome::AuthRequired {
            login_route: LOGIN_ROUTE
        }
    );
    assert!(ctx.collections().cart_entries().is_empty());
    assert!(ctx.queue().has_cart_intent());

    ctx.session()
        .login("maya@example.com", "Sunlit9Harbor")
        .await
        .unwrap();

    // Replay happened synchronously with the transition.
    let collections = ctx.collections();
    let entries = collections.cart_entries();
    assert_eq!(entries.len(), 1);
    let entry = entries.first().unwrap();
    assert_eq!(entry.product_id.as_str(), "P1");
    assert_eq!(entry.size.as_deref(), Some("M"));
    assert_eq!(entry.color, "Black");
    assert_eq!(entry.quantity, 1);
    drop(collections);

    // The visitor lands back where they were.
    assert_eq!(ctx.queue().take_return_to().as_deref(), Some("/product/P1"));
}

#[tokio::test]
async fn test_duplicate_auth_events_do_not_double_add() {
    let harness = TestHarness::new();
    let ctx = &harness.context;
    ctx.init().await.unwrap();

    let item = catalog_item("P1", "Air Runner", "Nike", "Footwear", 90);
    ctx.add_to_cart(&item, Some("M".to_string()), "Black".to_string(), 1, "/shop")
        .unwrap();

    ctx.session()
        .login("maya@example.com", "Sunlit9Harbor")
        .await
        .unwrap();
    assert_eq!(ctx.collections().total_items(), 1);

    // A second authentication fires the event again; the intent is already
    // consumed, so nothing merges twice.
    ctx.session().logout().unwrap();
    ctx.session()
        .login("maya@example.com", "Sunlit9Harbor")
        .await
        .unwrap();
    assert_eq!(ctx.collections().total_items(), 1);
}

#[tokio::test]
async fn test_cart_and_wishlist_intents_both_survive() {
    let harness = TestHarness::new();
    let ctx = &harness.context;
    ctx.init().await.unwrap();

    let shoe = catalog_item("P1", "Air Runner", "Nike", "Footwear", 90);
    let hoodie = catalog_item("P2", "Classic Hoodie", "adidas", "Apparel", 60);

    ctx.add_to_cart(&shoe, Some("M".to_string()), "Black".to_string(), 2, "/shop")
        .unwrap();
    ctx.add_to_wishlist(&hoodie, "/shop").unwrap();

    ctx.session()
        .login("maya@example.com", "Sunlit9Harbor")
        .await
        .unwrap();

    let collections = ctx.collections();
    assert_eq!(collections.total_items(), 2);
    assert_eq!(collections.wishlist_entries().len(), 1);
    assert_eq!(
        collections.wishlist_entries().first().unwrap().product_id.as_str(),
        "P2"
    );
}

#[tokio::test]
async fn test_same_kind_capture_overwrites_previous() {
    let harness = TestHarness::new();
    let ctx = &harness.context;
    ctx.init().await.unwrap();

    let first = catalog_item("P1", "Air Runner", "Nike", "Footwear", 90);
    let second = catalog_item("P2", "Samba", "adidas", "Footwear", 80);

    ctx.add_to_cart(&first, None, "Black".to_string(), 1, "/product/P1")
        .unwrap();
    ctx.add_to_cart(&second, None, "White".to_string(), 3, "/product/P2")
        .unwrap();

    ctx.session()
        .login("maya@example.com", "Sunlit9Harbor")
        .await
        .unwrap();

    // Last write wins: only the second intent replayed.
    let collections = ctx.collections();
    let entries = collections.cart_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries.first().unwrap().product_id.as_str(), "P2");
    assert_eq!(entries.first().unwrap().quantity, 3);
}

#[tokio::test]
async fn test_restore_on_relaunch_replays_pending_intent() {
    let harness = TestHarness::new();
    let ctx = &harness.context;
    ctx.init().await.unwrap();

    // Log in once so a token lands in the durable store.
    ctx.session()
        .login("maya@example.com", "Sunlit9Harbor")
        .await
        .unwrap();

    // An intent captured out-of-band is waiting when the app relaunches.
    let item = catalog_item("P3", "Gazelle", "adidas", "Footwear", 85);
    ctx.queue()
        .capture_cart_intent(
            &gilded_mango_client::intents::CartIntent {
                product: (&item).into(),
                size: None,
                color: "Red".to_string(),
                quantity: 1,
            },
            "/product/P3",
        )
        .unwrap();

    let relaunched = harness.relaunched_context();
    relaunched.init().await.unwrap();

    assert_eq!(relaunched.session().status(), SessionStatus::Authenticated);
    assert_eq!(relaunched.collections().total_items(), 1);
}

// =============================================================================
// Registration and validation
// =============================================================================

#[tokio::test]
async fn test_weak_password_rejected_without_network() {
    let harness = TestHarness::new();
    let ctx = &harness.context;
    ctx.init().await.unwrap();

    let before = harness.auth.calls.load(Ordering::SeqCst);
    let err = ctx
        .session()
        .register("Noor", "noor@example.com", "nodigits")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AuthError::WeakPassword(PasswordIssue::MissingUppercase)
    ));
    assert_eq!(harness.auth.calls.load(Ordering::SeqCst), before);
    assert_eq!(ctx.session().status(), SessionStatus::Anonymous);
}

#[tokio::test]
async fn test_register_authenticates_and_replays() {
    let harness = TestHarness::new();
    let ctx = &harness.context;
    ctx.init().await.unwrap();

    let item = catalog_item("P1", "Air Runner", "Nike", "Footwear", 90);
    ctx.add_to_wishlist(&item, "/shop").unwrap();

    let email = format!("{}@example.com", uuid::Uuid::new_v4());
    let profile = ctx
        .session()
        .register("Noor", &email, "Sunlit9Harbor")
        .await
        .unwrap();

    assert_eq!(profile.name, "Noor");
    assert_eq!(ctx.session().status(), SessionStatus::Authenticated);
    assert_eq!(ctx.collections().wishlist_entries().len(), 1);
}

#[tokio::test]
async fn test_rejected_login_leaves_intent_queued() {
    let harness = TestHarness::new();
    let ctx = &harness.context;
    ctx.init().await.unwrap();

    let item = catalog_item("P1", "Air Runner", "Nike", "Footwear", 90);
    ctx.add_to_cart(&item, None, "Black".to_string(), 1, "/shop")
        .unwrap();

    let err = ctx
        .session()
        .login("maya@example.com", "wrong-password")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Rejected(_)));
    assert_eq!(
        ctx.session().last_error().as_deref(),
        Some("Invalid credentials")
    );

    // The intent waits for the next successful authentication.
    assert!(ctx.queue().has_cart_intent());
    assert!(ctx.collections().cart_entries().is_empty());
}

// =============================================================================
// Avatar cache across logout
// =============================================================================

#[tokio::test]
async fn test_logout_then_login_renders_cached_avatar_first() {
    let harness = TestHarness::new();
    let ctx = &harness.context;
    ctx.init().await.unwrap();

    ctx.session()
        .login("maya@example.com", "Sunlit9Harbor")
        .await
        .unwrap();
    // The host fetched the avatar image and cached the bytes.
    ctx.session()
        .cache_avatar_bytes("image/png", b"maya-pixels")
        .unwrap();

    ctx.session().logout().unwrap();
    assert_eq!(ctx.session().status(), SessionStatus::Anonymous);

    // Before the next login's network response, the cached avatar is already
    // renderable on this device.
    let cached = ctx.session().cached_avatar().unwrap();
    assert!(cached.starts_with("data:image/png;base64,"));

    ctx.session()
        .login("maya@example.com", "Sunlit9Harbor")
        .await
        .unwrap();
    assert_eq!(ctx.session().cached_avatar().unwrap(), cached);
}
