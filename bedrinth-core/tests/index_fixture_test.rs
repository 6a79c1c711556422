//! Integration tests for index decoding, normalization and the listing pipeline
//!
//! Tests use static fixtures in `tests/fixtures/index/`:
//! - keyed.json  - current schema, packages keyed by tooth
//! - listed.json - older schema, packages as an array

mod test_helpers;

use bedrinth_core::catalog::{
    select, tag_facets, Catalog, PackageIndex, SearchIndex, SortBy, ViewState,
};
use pretty_assertions::assert_eq;
use test_helpers::{init_test_logging, read_fixture};

fn keyed_catalog() -> Catalog {
    let index = PackageIndex::from_json(&read_fixture("index/keyed.json")).unwrap();
    Catalog::from_index(index)
}

// ============================================================================
// Decoding and normalization
// ============================================================================

#[test]
fn test_keyed_index_decodes() {
    init_test_logging();
    let index = PackageIndex::from_json(&read_fixture("index/keyed.json")).unwrap();
    assert_eq!(index.format_version, 3);
    assert_eq!(index.package_count(), 7);
    assert_eq!(index.version_count(), 11);
}

#[test]
fn test_listed_index_decodes_to_same_shape() {
    let index = PackageIndex::from_json(&read_fixture("index/listed.json")).unwrap();
    assert_eq!(index.format_version, 2);

    let catalog = Catalog::from_index(index);
    let teeth: Vec<&str> = catalog.packages().iter().map(|p| p.tooth.as_str()).collect();
    assert_eq!(
        teeth,
        vec!["github.com/LiteLDev/LeviLamina", "github.com/someone/teleport"]
    );

    let levilamina = catalog.get("github.com/LiteLDev/LeviLamina").unwrap();
    assert_eq!(levilamina.updated, "2024-01-15");
    assert_eq!(levilamina.stars, 800);
    assert_eq!(levilamina.latest_version(), Some("0.10.0"));
}

#[test]
fn test_versions_follow_semver_order() {
    let catalog = keyed_catalog();

    let teleport = catalog.get("github.com/someone/teleport").unwrap();
    assert_eq!(teleport.versions, vec!["1.0.0", "1.2.0", "1.10.0"]);
    assert_eq!(teleport.latest_version(), Some("1.10.0"));

    let levilamina = catalog.get("github.com/LiteLDev/LeviLamina").unwrap();
    assert_eq!(levilamina.latest_version(), Some("1.0.0-rc.1"));
}

#[test]
fn test_missing_info_is_empty() {
    let catalog = keyed_catalog();
    let unlisted = catalog.get("github.com/someone/unlisted").unwrap();
    assert_eq!(unlisted.info.name, "");
    assert!(unlisted.info.tags.is_empty());
    assert_eq!(unlisted.latest_version(), None);
}

#[test]
fn test_malformed_entries_survive_with_empty_fields() {
    let catalog = keyed_catalog();
    assert_eq!(catalog.len(), 7);

    let nameless = catalog.get("github.com/someone/nameless").unwrap();
    assert_eq!(nameless.info.name, "");
    assert_eq!(nameless.info.description, "Warp points for saved homes");
    assert!(nameless.info.tags.is_empty());
    assert_eq!(nameless.latest_version(), Some("0.1.0"));

    let nulls = catalog.get("github.com/someone/nulls").unwrap();
    assert_eq!(nulls.info.name, "Nulls");
    assert_eq!(nulls.info.description, "");
    assert_eq!(nulls.stars, 0);
    assert_eq!(nulls.updated, "");
    assert_eq!(nulls.updated_at(), None);

    // Neighbouring entries are unaffected
    let money = catalog.get("github.com/LiteLDev/LegacyMoney").unwrap();
    assert_eq!(money.info.name, "LegacyMoney");
}

// ============================================================================
// Listing pipeline
// ============================================================================

#[test]
fn test_search_tags_and_sort_over_fixture() {
    init_test_logging();
    let catalog = keyed_catalog();
    let index = SearchIndex::build(catalog.packages());
    assert_eq!(index.len(), 7);

    let view = ViewState::new(12).with_query("teleport");
    let result = select(catalog.packages(), Some(&index), &view);
    assert_eq!(result[0].tooth, "github.com/someone/teleport");

    let view = ViewState::new(12).with_tags(["utility"]).with_sort(SortBy::Stars);
    let result = select(catalog.packages(), Some(&index), &view);
    let teeth: Vec<&str> = result.iter().map(|p| p.tooth.as_str()).collect();
    assert_eq!(
        teeth,
        vec!["github.com/someone/teleport", "gitlab.com/elsewhere/chat-format"]
    );
}

#[test]
fn test_sort_by_updated_over_mixed_formats() {
    let catalog = keyed_catalog();
    let view = ViewState::new(12).with_sort(SortBy::Updated);
    let result = select(catalog.packages(), None, &view);
    let teeth: Vec<&str> = result.iter().map(|p| p.tooth.as_str()).collect();
    assert_eq!(
        teeth,
        vec![
            "github.com/LiteLDev/LeviLamina",
            "github.com/someone/teleport",
            "github.com/LiteLDev/LegacyMoney",
            "github.com/someone/unlisted",
            "github.com/someone/nameless",
            "gitlab.com/elsewhere/chat-format",
            "github.com/someone/nulls",
        ]
    );
}

#[test]
fn test_query_with_no_hits_is_empty() {
    let catalog = keyed_catalog();
    let index = SearchIndex::build(catalog.packages());
    let view = ViewState::new(12).with_query("qqqqqqqqqq");
    assert!(select(catalog.packages(), Some(&index), &view).is_empty());
}

#[test]
fn test_tag_facets_over_fixture() {
    let catalog = keyed_catalog();
    let facets = tag_facets(catalog.packages());
    let top: Vec<(&str, usize)> = facets
        .iter()
        .take(2)
        .map(|f| (f.tag.as_str(), f.count))
        .collect();
    assert_eq!(top, vec![("core", 2), ("utility", 2)]);
    assert_eq!(facets.len(), 6);
}
