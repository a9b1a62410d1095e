//! Cart and wishlist merge semantics driven through the application context.

#![allow(clippy::unwrap_used)]

use gilded_mango_client::collections::MAX_LINE_QUANTITY;
use gilded_mango_client::context::GatedOutcome;
use gilded_mango_core::Price;
use gilded_mango_integration_tests::{TestHarness, catalog_item};

async fn signed_in_harness() -> TestHarness {
    let harness = TestHarness::new();
    harness.context.init().await.unwrap();
    harness
        .context
        .session()
        .login("maya@example.com", "Sunlit9Harbor")
        .await
        .unwrap();
    harness
}

#[tokio::test]
async fn test_repeated_adds_sum_quantities_clamped_to_ten() {
    let harness = signed_in_harness().await;
    let ctx = &harness.context;
    let item = catalog_item("P1", "Air Runner", "Nike", "Footwear", 90);

    let mut last = 0;
    for _ in 0..4 {
        match ctx
            .add_to_cart(&item, Some("M".to_string()), "Black".to_string(), 3, "/shop")
            .unwrap()
        {
            GatedOutcome::Completed { quantity } => last = quantity,
            GatedOutcome::AuthRequired { .. } => panic!("signed in"),
        }
    }

    // 3+3+3+3 clamps at the line ceiling.
    assert_eq!(last, MAX_LINE_QUANTITY);
    assert_eq!(ctx.collections().total_items(), MAX_LINE_QUANTITY);
    assert_eq!(ctx.collections().cart_entries().len(), 1);
}

#[tokio::test]
async fn test_remove_then_add_starts_fresh() {
    let harness = signed_in_harness().await;
    let ctx = &harness.context;
    let item = catalog_item("P1", "Air Runner", "Nike", "Footwear", 90);

    ctx.add_to_cart(&item, Some("M".to_string()), "Black".to_string(), 9, "/shop")
        .unwrap();

    let key = ctx.collections().cart_entries().first().unwrap().key();
    ctx.collections().cart_remove(&key).unwrap();

    let outcome = ctx
        .add_to_cart(&item, Some("M".to_string()), "Black".to_string(), 1, "/shop")
        .unwrap();
    assert_eq!(outcome, GatedOutcome::Completed { quantity: 1 });
}

#[tokio::test]
async fn test_distinct_sizes_and_colors_are_distinct_lines() {
    let harness = signed_in_harness().await;
    let ctx = &harness.context;
    let item = catalog_item("P1", "Air Runner", "Nike", "Footwear", 90);

    ctx.add_to_cart(&item, Some("M".to_string()), "Black".to_string(), 1, "/shop")
        .unwrap();
    ctx.add_to_cart(&item, Some("L".to_string()), "Black".to_string(), 1, "/shop")
        .unwrap();
    ctx.add_to_cart(&item, Some("M".to_string()), "White".to_string(), 1, "/shop")
        .unwrap();
    // Same identity as the first line.
    ctx.add_to_cart(&item, Some("M".to_string()), "Black".to_string(), 1, "/shop")
        .unwrap();

    let collections = ctx.collections();
    assert_eq!(collections.cart_entries().len(), 3);
    assert_eq!(collections.total_items(), 4);
}

#[tokio::test]
async fn test_totals_follow_quantity_updates() {
    let harness = signed_in_harness().await;
    let ctx = &harness.context;

    let shoe = catalog_item("P1", "Air Runner", "Nike", "Footwear", 90);
    let hoodie = catalog_item("P2", "Classic Hoodie", "adidas", "Apparel", 60);
    ctx.add_to_cart(&shoe, None, "Black".to_string(), 2, "/shop")
        .unwrap();
    ctx.add_to_cart(&hoodie, None, "White".to_string(), 1, "/shop")
        .unwrap();

    assert_eq!(ctx.collections().total_items(), 3);
    assert_eq!(ctx.collections().total_price(), Price::from_major(240));

    // Setting below 1 removes the line.
    let key = ctx.collections().cart_entries().first().unwrap().key();
    ctx.collections().cart_set_quantity(&key, 0).unwrap();

    assert_eq!(ctx.collections().total_items(), 1);
    assert_eq!(ctx.collections().total_price(), Price::from_major(60));
}

#[tokio::test]
async fn test_wishlist_duplicate_add_is_idempotent() {
    let harness = signed_in_harness().await;
    let ctx = &harness.context;
    let item = catalog_item("P1", "Air Runner", "Nike", "Footwear", 90);

    ctx.add_to_wishlist(&item, "/shop").unwrap();
    ctx.add_to_wishlist(&item, "/shop").unwrap();

    assert_eq!(ctx.collections().wishlist_entries().len(), 1);
}

#[tokio::test]
async fn test_cart_survives_relaunch_without_auth() {
    let harness = signed_in_harness().await;
    let ctx = &harness.context;
    let item = catalog_item("P1", "Air Runner", "Nike", "Footwear", 90);
    ctx.add_to_cart(&item, Some("M".to_string()), "Black".to_string(), 2, "/shop")
        .unwrap();

    // Log out, then relaunch: the token is gone but the cart is not.
    ctx.session().logout().unwrap();
    let relaunched = harness.relaunched_context();
    relaunched.init().await.unwrap();

    assert_eq!(relaunched.collections().total_items(), 2);
    assert!(relaunched.session().profile().is_none());
}
