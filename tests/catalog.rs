use mcconvert::model::Edition;
use mcconvert::{list_target_versions, ConvertError, SchemaRegistry};

#[test]
fn listings_are_newest_first() {
    for (platform, edition) in [("java", Edition::Java), ("bedrock", Edition::Bedrock)] {
        let listed = list_target_versions(platform).unwrap();
        let registry = SchemaRegistry::global();
        assert_eq!(listed.len(), registry.schemas(edition).len());
        assert_eq!(listed[0], registry.latest(edition).name);
        let resolved: Vec<_> = listed
            .iter()
            .map(|name| registry.resolve(name, edition).unwrap().id)
            .collect();
        assert!(resolved.windows(2).all(|w| w[0] > w[1]));
    }
}

#[test]
fn unknown_platform_is_an_error() {
    assert!(matches!(
        list_target_versions("pocket"),
        Err(ConvertError::InvalidPlatform(p)) if p == "pocket"
    ));
}

#[test]
fn every_pair_of_versions_has_a_mapping_path() {
    let registry = SchemaRegistry::global();
    let all: Vec<_> = [Edition::Java, Edition::Bedrock]
        .iter()
        .flat_map(|&e| registry.schemas(e).iter().map(|s| s.id))
        .collect();
    for &from in &all {
        for &to in &all {
            let chain = registry.block_state_map(from, to).unwrap();
            assert_eq!(chain.is_identity(), from == to);
            assert_eq!(chain.crosses_edition(), from.edition != to.edition);
        }
    }
}

#[test]
fn missing_target_means_latest() {
    let registry = SchemaRegistry::global();
    for edition in [Edition::Java, Edition::Bedrock] {
        assert_eq!(registry.target(None, edition).unwrap().id, registry.latest(edition).id);
        assert_eq!(registry.target(Some("  "), edition).unwrap().id, registry.latest(edition).id);
    }
}
