//! Property-based tests for inspection-core
//!
//! Exercises filter state and query building with proptest.

use proptest::prelude::*;

use inspection_core::{
    BasePredicate, Condition, County, FilterMode, FilterState, QueryBuilder, DELAWARE_COUNTIES,
};

fn any_county() -> impl Strategy<Value = County> {
    prop_oneof![
        Just(County::Sussex),
        Just(County::Kent),
        Just(County::NewCastle),
    ]
}

fn any_mode() -> impl Strategy<Value = FilterMode> {
    prop_oneof![
        Just(FilterMode::None),
        Just(FilterMode::County),
        Just(FilterMode::City),
        Just(FilterMode::Zipcode),
        Just(FilterMode::Restaurant),
    ]
}

fn any_base() -> impl Strategy<Value = BasePredicate> {
    prop_oneof![Just(BasePredicate::None), Just(BasePredicate::ComplaintFollowUp)]
}

/// Zip input too short to be a zip code. Longer input is cut to five characters.
fn short_zip() -> impl Strategy<Value = String> {
    "[0-9]{0,4}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // ============================================================
    // Zip code
    // ============================================================

    #[test]
    fn short_zip_emits_no_zip_predicate(zip in short_zip(), base in any_base()) {
        let mut state = FilterState::new();
        state.set_mode(FilterMode::Zipcode);
        state.set_zip_code(&zip);

        let builder = QueryBuilder::new(base);
        let predicate = builder.build(&state);
        prop_assert!(!predicate.conditions().iter().any(|c| matches!(c, Condition::ZipEquals(_))));
        prop_assert_eq!(predicate, builder.build(&FilterState::new()));
    }

    #[test]
    fn five_digit_zip_is_applied(zip in "[0-9]{5}") {
        let mut state = FilterState::new();
        state.set_mode(FilterMode::Zipcode);
        state.set_zip_code(&zip);

        let predicate = QueryBuilder::new(BasePredicate::None).build(&state);
        prop_assert_eq!(predicate.conditions(), &[Condition::ZipEquals(zip)][..]);
    }

    #[test]
    fn non_numeric_zip_is_ignored(zip in "[0-9]{0,4}[a-z][0-9]{0,3}") {
        let mut state = FilterState::new();
        state.set_mode(FilterMode::Zipcode);
        state.set_zip_code(&zip);
        prop_assert!(QueryBuilder::new(BasePredicate::None).build(&state).is_empty());
    }

    // ============================================================
    // Restaurant search
    // ============================================================

    #[test]
    fn short_search_emits_no_name_predicate(text in "[a-zA-Z' ]{0,2}") {
        let mut state = FilterState::new();
        state.set_mode(FilterMode::Restaurant);
        state.set_debounced_search_text(text);
        prop_assert!(QueryBuilder::new(BasePredicate::None).build(&state).is_empty());
    }

    #[test]
    fn search_text_is_always_quoted_safely(text in "[a-zA-Z' %]{3,30}") {
        let mut state = FilterState::new();
        state.set_mode(FilterMode::Restaurant);
        state.set_debounced_search_text(text.clone());

        let soql = QueryBuilder::new(BasePredicate::None).build(&state).to_soql().unwrap();
        let literal = soql
            .strip_prefix("upper(restname) like upper('")
            .and_then(|s| s.strip_suffix("')"))
            .unwrap();
        // Every quote inside the literal comes in a doubled pair
        prop_assert!(!literal.replace("''", "").contains('\''));
        prop_assert_eq!(literal.replace("''", "'"), format!("%{}%", text));
    }

    // ============================================================
    // County expansion
    // ============================================================

    #[test]
    fn county_predicate_matches_county_map(county in any_county()) {
        let mut state = FilterState::new();
        state.set_mode(FilterMode::County);
        state.select_county(county);

        let predicate = QueryBuilder::new(BasePredicate::None).build(&state);
        let expected = DELAWARE_COUNTIES.cities(county).to_vec();
        prop_assert_eq!(predicate.conditions(), &[Condition::CityIn(expected)][..]);
    }

    #[test]
    fn county_city_sets_are_disjoint(a in any_county(), b in any_county()) {
        prop_assume!(a != b);
        let left = DELAWARE_COUNTIES.cities(a);
        let right = DELAWARE_COUNTIES.cities(b);
        prop_assert!(left.iter().all(|city| !right.contains(city)));
    }

    // ============================================================
    // Mode switching
    // ============================================================

    #[test]
    fn switching_mode_clears_everything(
        first in any_mode(),
        second in any_mode(),
        county in any_county(),
        zip in "[0-9]{5}",
        city in "[A-Z][a-z]{3,10}",
        text in "[a-z]{3,10}",
    ) {
        let mut state = FilterState::new();
        state.set_mode(first);
        state.select_county(county);
        state.select_city(city);
        state.set_zip_code(&zip);
        state.set_search_text(text.clone());
        state.set_debounced_search_text(text);

        state.set_mode(second);
        prop_assert_eq!(state.mode(), second);
        prop_assert!(state.selected_county().is_none());
        prop_assert_eq!(state.selected_city(), "");
        prop_assert_eq!(state.selected_zip_code(), "");
        prop_assert_eq!(state.search_text(), "");
        prop_assert_eq!(state.debounced_search_text(), "");
    }

    #[test]
    fn builder_is_deterministic(mode in any_mode(), county in any_county(), base in any_base()) {
        let mut state = FilterState::new();
        state.set_mode(mode);
        state.select_county(county);

        let builder = QueryBuilder::new(base);
        prop_assert_eq!(builder.build(&state), builder.build(&state.clone()));
    }

    #[test]
    fn predicate_has_at_most_one_selection(mode in any_mode(), base in any_base()) {
        let mut state = FilterState::new();
        state.set_mode(mode);
        state.select_county(County::Kent);
        state.select_city("Dover");
        state.set_zip_code("19901");
        state.set_debounced_search_text("diner");

        let predicate = QueryBuilder::new(base).build(&state);
        let selections = predicate
            .conditions()
            .iter()
            .filter(|c| !matches!(c, Condition::InspectionTypeIn(_)))
            .count();
        prop_assert!(selections <= 1);
    }
}
