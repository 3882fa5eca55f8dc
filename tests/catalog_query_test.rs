//! Tests for the catalog query builder over the generated SQL and the pure
//! pricing/sort helpers.

use bookstore_api::entities::Book;
use bookstore_api::services::catalog::{build_query, effective_price, CatalogFilters, SortKey};
use chrono::NaiveDate;
use proptest::prelude::*;
use sea_orm::{DbBackend, EntityTrait, QueryTrait};
use uuid::Uuid;

fn sql(filters: &CatalogFilters, sort: Option<SortKey>) -> String {
    build_query(Book::find(), filters, sort)
        .build(DbBackend::Postgres)
        .to_string()
}

#[test]
fn no_filters_is_plain_select() {
    let query = sql(&CatalogFilters::default(), None);
    assert!(!query.contains("WHERE"));
    assert!(!query.contains("ORDER BY"));
}

#[test]
fn each_genre_adds_a_membership_subquery() {
    for count in 1..=4 {
        let filters = CatalogFilters {
            genres: (0..count).map(|_| Uuid::new_v4()).collect(),
            ..Default::default()
        };
        assert_eq!(sql(&filters, None).matches("IN (SELECT").count(), count);
    }
}

#[test]
fn price_bounds_compare_the_discounted_price() {
    let filters = CatalogFilters {
        price_min: Some(100),
        price_max: Some(200),
        ..Default::default()
    };
    let query = sql(&filters, None);
    assert!(query.contains("\"books\".\"price\""));
    assert!(query.contains("\"books\".\"discount\""));
}

#[test]
fn search_is_case_insensitive_and_covers_three_columns() {
    let filters = CatalogFilters {
        search_word: Some("Dune".to_string()),
        ..Default::default()
    };
    let query = sql(&filters, None);
    assert!(query.contains("%dune%"));
    assert_eq!(query.matches("LOWER").count(), 3);
}

#[test]
fn date_and_price_and_search_compose_with_and() {
    let filters = CatalogFilters {
        price_min: Some(100),
        date_min: NaiveDate::from_ymd_opt(2024, 1, 1),
        search_word: Some("dune".to_string()),
        ..Default::default()
    };
    let query = sql(&filters, None);
    assert!(query.contains("WHERE"));
    assert!(query.matches(" AND ").count() >= 2);
}

#[test]
fn explicit_sort_appends_id_tie_break() {
    let query = sql(
        &CatalogFilters::default(),
        Some(SortKey::parse("min_created").unwrap()),
    );
    assert!(query.contains("\"books\".\"created\" ASC"));
    assert!(query.ends_with("\"books\".\"id\" ASC"));
}

proptest! {
    // Effective price stays within [0, price] and scales with the discount.
    #[test]
    fn effective_price_is_bounded(price in 0i64..10_000_000, discount in 0i16..=100) {
        let effective = effective_price(price, discount);
        prop_assert!(effective >= 0);
        prop_assert!(effective <= price);
        if discount == 0 {
            prop_assert_eq!(effective, price);
        }
        if discount == 100 {
            prop_assert_eq!(effective, 0);
        }
    }

    // A deeper discount never raises the effective price.
    #[test]
    fn deeper_discount_never_costs_more(
        price in 0i64..10_000_000,
        a in 0i16..=100,
        b in 0i16..=100,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(effective_price(price, high) <= effective_price(price, low));
    }

    // Parsing a sort key never panics and only accepts the five fields.
    #[test]
    fn sort_parse_total(raw in "[a-z_]{0,20}") {
        let _ = SortKey::parse(&raw);
    }
}

#[test]
fn range_boundaries_are_inclusive() {
    // With bounds [100, 200]: 90% in, 80% in, 70% out.
    assert_eq!(effective_price(1000, 90), 100);
    assert_eq!(effective_price(1000, 80), 200);
    assert_eq!(effective_price(1000, 70), 300);
}
