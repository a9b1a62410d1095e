//! Catalog filtering scenarios across both input channels.

#![allow(clippy::unwrap_used)]

use gilded_mango_client::catalog::{FilterCommand, LinkQuery, SortKey};
use gilded_mango_core::Price;
use gilded_mango_integration_tests::{TestHarness, catalog_item};

#[tokio::test]
async fn test_footwear_sorted_ascending_with_load_more() {
    // 25 items tagged Footwear with distinct prices.
    let products: Vec<_> = (0..25)
        .map(|i| catalog_item(&format!("P{i}"), "Runner", "Nike", "Footwear", 100 - i))
        .collect();
    let harness = TestHarness::with_catalog(products);
    let ctx = &harness.context;
    ctx.init().await.unwrap();
    ctx.load_catalog().await.unwrap();

    {
        let mut catalog = ctx.catalog();
        catalog
            .apply(FilterCommand::SetCategories(vec!["Footwear".to_string()]))
            .unwrap();
        catalog.apply(FilterCommand::SetSort(SortKey::PriceLow)).unwrap();

        assert_eq!(catalog.matching_count(), 25);
        // Initial page shows the first 20, ascending by price.
        let first_page: Vec<Price> = catalog.visible().iter().map(|i| i.price).collect();
        assert_eq!(first_page.len(), 20);
        let mut sorted = first_page.clone();
        sorted.sort();
        assert_eq!(first_page, sorted);

        // One load-more shows all 25; further invocations are no-ops.
        catalog.load_more();
        assert_eq!(catalog.visible().len(), 25);
        let limit = catalog.visible_limit();
        catalog.load_more();
        assert_eq!(catalog.visible_limit(), limit);
    }
}

#[tokio::test]
async fn test_sidebar_brand_beats_inbound_link() {
    let harness = TestHarness::with_catalog(vec![
        catalog_item("P1", "Air Runner", "Nike", "Footwear", 90),
        catalog_item("P2", "Samba", "adidas", "Footwear", 80),
    ]);
    let ctx = &harness.context;
    ctx.init().await.unwrap();
    ctx.load_catalog().await.unwrap();

    let mut catalog = ctx.catalog();
    catalog
        .apply(FilterCommand::SetBrands(vec!["Nike".to_string()]))
        .unwrap();
    catalog.set_link_query(
        LinkQuery::parse("https://shop.example.com/shop?brand=adidas").unwrap(),
    );

    let brands: Vec<&str> = catalog.visible().iter().map(|i| i.brand.as_str()).collect();
    assert_eq!(brands, vec!["Nike"]);
}

#[tokio::test]
async fn test_link_channel_fills_in_for_empty_facets() {
    let harness = TestHarness::with_catalog(vec![
        catalog_item("P1", "Air Runner", "Nike", "Footwear", 90),
        catalog_item("P2", "Samba", "adidas", "Footwear", 80),
        catalog_item("P3", "Court Hoodie", "adidas", "Apparel", 55),
    ]);
    let ctx = &harness.context;
    ctx.init().await.unwrap();
    ctx.load_catalog().await.unwrap();

    let mut catalog = ctx.catalog();
    catalog.set_link_query(
        LinkQuery::parse("https://shop.example.com/shop?brand=adidas&category=Footwear").unwrap(),
    );

    let ids: Vec<&str> = catalog.visible().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["P2"]);
}

#[tokio::test]
async fn test_filter_state_persists_across_relaunch() {
    let harness = TestHarness::with_catalog(vec![
        catalog_item("P1", "Air Runner", "Nike", "Footwear", 90),
        catalog_item("P2", "Samba", "adidas", "Footwear", 80),
    ]);
    let ctx = &harness.context;
    ctx.init().await.unwrap();
    ctx.catalog()
        .apply(FilterCommand::SetBrands(vec!["adidas".to_string()]))
        .unwrap();

    let relaunched = harness.relaunched_context();
    relaunched.init().await.unwrap();
    relaunched.load_catalog().await.unwrap();

    let catalog = relaunched.catalog();
    assert_eq!(catalog.filters().brand, vec!["adidas".to_string()]);
    let ids: Vec<&str> = catalog.visible().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["P2"]);
}

#[tokio::test]
async fn test_no_matches_is_a_valid_state() {
    let harness = TestHarness::with_catalog(vec![catalog_item(
        "P1", "Air Runner", "Nike", "Footwear", 90,
    )]);
    let ctx = &harness.context;
    ctx.init().await.unwrap();
    ctx.load_catalog().await.unwrap();

    let mut catalog = ctx.catalog();
    catalog
        .apply(FilterCommand::SetBrands(vec!["Puma".to_string()]))
        .unwrap();
    assert!(catalog.visible().is_empty());

    // Clearing filters brings the catalog back.
    catalog.apply(FilterCommand::ClearAll).unwrap();
    assert_eq!(catalog.matching_count(), 1);
}
