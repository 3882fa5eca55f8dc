mod common;

use bookstore_api::services::{CatalogFilters, SortKey};
use chrono::{Duration, Utc};
use common::{seed_dated_book, TestApp};

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn home_new_releases_are_newest_first() {
    let app = TestApp::new().await;
    let today = Utc::now().date_naive();
    let oldest = seed_dated_book(&app, "Oldest", 500, today - Duration::days(3)).await;
    let newest = seed_dated_book(&app, "Newest", 500, today).await;
    let middle = seed_dated_book(&app, "Middle", 500, today - Duration::days(1)).await;

    let page = app.state.services.catalog.home().await.unwrap();
    let ids: Vec<_> = page.new_releases.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![newest, middle, oldest]);
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn new_release_fallback_keeps_requested_sort() {
    let app = TestApp::new().await;
    let today = Utc::now().date_naive();
    // Both older than the release window, so the listing falls back to the
    // whole catalog.
    let pricey = seed_dated_book(&app, "Pricey", 900, today - Duration::days(40)).await;
    let cheap = seed_dated_book(&app, "Cheap", 100, today - Duration::days(30)).await;

    let filters = CatalogFilters::default();
    let catalog = &app.state.services.catalog;

    let sorted = catalog
        .new_releases(&filters, SortKey::parse("min_price"))
        .await
        .unwrap();
    assert_eq!(
        sorted.iter().map(|b| b.id).collect::<Vec<_>>(),
        vec![cheap, pricey]
    );

    // Without a sort the fallback stays oldest-first.
    let unsorted = catalog.new_releases(&filters, None).await.unwrap();
    assert_eq!(
        unsorted.iter().map(|b| b.id).collect::<Vec<_>>(),
        vec![pricey, cheap]
    );
}
