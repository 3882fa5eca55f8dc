//! Property-based tests for the discount engine's pure rules.

use bookstore_api::services::discounts::rules;
use proptest::prelude::*;

fn percent_strategy() -> impl Strategy<Value = i16> {
    0i16..=100
}

fn percent_vec_strategy() -> impl Strategy<Value = Vec<i16>> {
    proptest::collection::vec(percent_strategy(), 0..16)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    // Applying a campaign never lowers a book's discount.
    #[test]
    fn raise_is_monotonic(current in percent_strategy(), campaign in percent_strategy()) {
        let raised = rules::raise(current, campaign);
        prop_assert!(raised >= current);
        prop_assert!(raised >= campaign);
        prop_assert!(raised <= 100);
    }

    // The order campaigns are applied in does not matter.
    #[test]
    fn raise_is_order_independent(mut percents in percent_vec_strategy()) {
        let forward = percents.iter().fold(0, |acc, p| rules::raise(acc, *p));
        percents.reverse();
        let backward = percents.iter().fold(0, |acc, p| rules::raise(acc, *p));
        prop_assert_eq!(forward, backward);
    }

    // Folding raises lands on the maximum covering discount.
    #[test]
    fn raise_fold_equals_maximum(percents in percent_vec_strategy()) {
        let folded = percents.iter().fold(0, |acc, p| rules::raise(acc, *p));
        let max = percents.iter().copied().max().unwrap_or(0);
        prop_assert_eq!(folded, max);
    }

    // After a removal the recomputed discount is exactly the maximum of the
    // remaining covering campaigns, never an early-exit approximation.
    #[test]
    fn exact_max_matches_remaining_maximum(remaining in percent_vec_strategy()) {
        let recomputed = rules::exact_max(&remaining);
        prop_assert_eq!(recomputed, remaining.iter().copied().max().unwrap_or(0));
    }

    // Applying then removing a single campaign restores the original state
    // when no other campaigns cover the book.
    #[test]
    fn sole_campaign_removal_resets_to_zero(campaign in percent_strategy()) {
        let applied = rules::raise(0, campaign);
        prop_assert_eq!(applied, campaign);
        prop_assert_eq!(rules::exact_max(&[]), 0);
    }

    // Removing a dominated campaign leaves the cached discount unchanged.
    #[test]
    fn removing_dominated_campaign_keeps_discount(
        dominant in percent_strategy(),
        dominated in percent_strategy(),
    ) {
        prop_assume!(dominated <= dominant);
        let cached = rules::raise(rules::raise(0, dominant), dominated);
        prop_assert_eq!(cached, dominant);
        prop_assert_eq!(rules::exact_max(&[dominant]), cached);
    }
}

#[test]
fn uncovered_book_has_zero_discount() {
    assert_eq!(rules::exact_max(&[]), 0);
}

#[test]
fn hundred_percent_campaign_makes_books_free() {
    assert_eq!(rules::raise(40, 100), 100);
}
