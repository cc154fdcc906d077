//! Tests for the template merging engine.

use super::*;
use crate::input::TemplateSourceKind;
use crate::test_support::StaticTemplateSource;

// ============================================================================
// Test Helpers
// ============================================================================

fn fragment(yaml: &str) -> ConfigFragment {
    serde_yaml::from_str(yaml).expect("invalid test fragment")
}

fn sources(templates: StaticTemplateSource) -> TemplateSources {
    TemplateSources::empty().with_reusable(Box::new(templates))
}

const PROFILE_TEMPLATE: &str = r#"
quality_profiles:
  - name: WEB-1080p
    min_format_score: 0
    score_set: default
    upgrade:
      allowed: true
      until_quality: WEB 1080p
      until_score: 10000
    reset_unmatched_scores:
      enabled: true
      except: [Language Not Original]
    qualities:
      - name: WEB 1080p
        qualities: [WEBDL-1080p, WEBRip-1080p]
"#;

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn test_custom_formats_follow_include_order_then_inline() {
    let templates = StaticTemplateSource::default()
        .with("first", "custom_formats: [{ trash_ids: [a] }]")
        .with("second", "custom_formats: [{ trash_ids: [b] }]");
    let sources = sources(templates);
    let instance = fragment(
        r#"
include:
  - template: first
  - template: second
custom_formats:
  - trash_ids: [c]
"#,
    );

    let merged = TemplateMerger::new(&sources).merge(&instance).await;

    let ids: Vec<&str> = merged
        .custom_formats
        .iter()
        .flat_map(|block| block.trash_ids.iter().map(String::as_str))
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_nested_includes_are_expanded_depth_first() {
    let templates = StaticTemplateSource::default()
        .with(
            "outer",
            "include: [{ template: inner }]\ncustom_formats: [{ trash_ids: [outer] }]",
        )
        .with("inner", "custom_formats: [{ trash_ids: [inner] }]")
        .with("after", "custom_formats: [{ trash_ids: [after] }]");
    let sources = sources(templates);
    let instance = fragment("include: [{ template: outer }, { template: after }]");

    let merged = TemplateMerger::new(&sources).merge(&instance).await;

    let ids: Vec<&str> = merged
        .custom_formats
        .iter()
        .map(|block| block.trash_ids[0].as_str())
        .collect();
    assert_eq!(ids, vec!["inner", "outer", "after"]);
}

#[tokio::test]
async fn test_cyclic_include_is_broken() {
    let templates = StaticTemplateSource::default()
        .with(
            "a",
            "include: [{ template: b }]\ncustom_formats: [{ trash_ids: [from-a] }]",
        )
        .with(
            "b",
            "include: [{ template: a }]\ncustom_formats: [{ trash_ids: [from-b] }]",
        );
    let sources = sources(templates);
    let instance = fragment("include: [{ template: a }]");

    let merged = TemplateMerger::new(&sources).merge(&instance).await;

    let ids: Vec<&str> = merged
        .custom_formats
        .iter()
        .map(|block| block.trash_ids[0].as_str())
        .collect();
    assert_eq!(ids, vec!["from-b", "from-a"]);
}

#[tokio::test]
async fn test_unresolved_include_is_skipped() {
    let sources = sources(StaticTemplateSource::default());
    let instance = fragment(
        r#"
include:
  - template: does-not-exist
  - id: "0000"
    source: TRASH
custom_formats:
  - trash_ids: [kept]
"#,
    );

    let merged = TemplateMerger::new(&sources).merge(&instance).await;

    assert_eq!(merged.custom_formats.len(), 1);
}

#[tokio::test]
async fn test_trash_include_routes_to_trash_namespace() {
    let sources = TemplateSources::empty().with_trash(Box::new(
        StaticTemplateSource::default().with("abc", PROFILE_TEMPLATE),
    ));
    let instance = ConfigFragment {
        include: vec![IncludeEntry::new("abc", TemplateSourceKind::Trash)],
        ..Default::default()
    };

    let merged = TemplateMerger::new(&sources).merge(&instance).await;

    assert_eq!(merged.quality_profiles.len(), 1);
}

// ============================================================================
// Quality profiles
// ============================================================================

#[tokio::test]
async fn test_profiles_with_same_name_merge_shallowly() {
    let sources = sources(StaticTemplateSource::default().with("profile", PROFILE_TEMPLATE));
    let instance = fragment(
        r#"
include: [{ template: profile }]
quality_profiles:
  - name: WEB-1080p
    min_format_score: 100
    upgrade:
      until_score: 5000000
    reset_unmatched_scores:
      enabled: false
"#,
    );

    let merged = TemplateMerger::new(&sources).merge(&instance).await;

    assert_eq!(merged.quality_profiles.len(), 1);
    let profile = merged.profile("WEB-1080p").unwrap();
    assert_eq!(profile.min_format_score, Some(100));
    assert_eq!(profile.score_set.as_deref(), Some("default"));
    assert_eq!(profile.qualities.as_ref().unwrap().len(), 1);

    let upgrade = profile.upgrade.as_ref().unwrap();
    assert_eq!(upgrade.allowed, Some(true));
    assert_eq!(upgrade.until_quality.as_deref(), Some("WEB 1080p"));
    assert_eq!(upgrade.until_score, Some(5000000));

    let reset = profile.reset_unmatched_scores.as_ref().unwrap();
    assert_eq!(reset.enabled, Some(false));
    assert_eq!(reset.except.as_ref().unwrap(), &vec!["Language Not Original".to_string()]);
}

#[test]
fn test_later_qualities_replace_earlier_list() {
    let merged = merge_fragments(vec![
        fragment(PROFILE_TEMPLATE),
        fragment(
            r#"
quality_profiles:
  - name: WEB-1080p
    qualities:
      - name: Bluray-1080p
      - name: WEB 1080p
        qualities: [WEBDL-1080p]
"#,
        ),
    ]);

    let qualities = merged.quality_profiles[0].qualities.as_ref().unwrap();
    assert_eq!(qualities.len(), 2);
    assert_eq!(qualities[0].name, "Bluray-1080p");
}

#[test]
fn test_incomplete_profiles_are_dropped() {
    let merged = merge_fragments(vec![fragment(
        r#"
quality_profiles:
  - qualities: [{ name: HDTV-720p }]
    upgrade: { allowed: false }
  - name: No Qualities
    upgrade: { allowed: false }
  - name: No Upgrade
    qualities: [{ name: HDTV-720p }]
  - name: Complete
    qualities: [{ name: HDTV-720p }]
    upgrade: { allowed: false }
"#,
    )]);

    let names: Vec<&str> = merged
        .quality_profiles
        .iter()
        .filter_map(|p| p.name.as_deref())
        .collect();
    assert_eq!(names, vec!["Complete"]);
}

#[test]
fn test_profile_completed_by_later_fragment_is_kept() {
    let merged = merge_fragments(vec![
        fragment("quality_profiles: [{ name: HD, qualities: [{ name: HDTV-720p }] }]"),
        fragment("quality_profiles: [{ name: HD, upgrade: { allowed: true } }]"),
    ]);

    assert_eq!(merged.quality_profiles.len(), 1);
}

// ============================================================================
// Custom formats and scalar sections
// ============================================================================

#[test]
fn test_deprecated_quality_profiles_key_is_rewritten() {
    let merged = merge_fragments(vec![fragment(
        r#"
custom_formats:
  - trash_ids: [a]
    quality_profiles:
      - name: HD
        score: 10
  - trash_ids: [b]
    assign_scores_to:
      - name: UHD
"#,
    )]);

    assert_eq!(merged.custom_formats[0].assign_scores_to[0].name, "HD");
    assert_eq!(merged.custom_formats[0].assign_scores_to[0].score, Some(10));
    assert!(merged.custom_formats[0].quality_profiles.is_none());
    assert_eq!(merged.custom_formats[1].assign_scores_to[0].name, "UHD");
}

#[test]
fn test_quality_definition_merges_key_wise() {
    let merged = merge_fragments(vec![
        fragment("quality_definition: { type: movie, preferred_ratio: 0.2 }"),
        fragment("quality_definition: { preferred_ratio: 0.7 }"),
    ]);

    let definition = merged.quality_definition.unwrap();
    assert_eq!(definition.kind.as_deref(), Some("movie"));
    assert_eq!(definition.preferred_ratio, Some(0.7));
}

#[test]
fn test_delete_unmanaged_last_writer_wins() {
    let merged = merge_fragments(vec![
        fragment("delete_unmanaged_custom_formats: { enabled: true, ignore: [Keep] }"),
        fragment("delete_unmanaged_custom_formats: { enabled: false }"),
    ]);

    let policy = merged.delete_unmanaged_custom_formats.unwrap();
    assert!(!policy.enabled);
    assert!(policy.ignore.is_empty());
}

#[test]
fn test_custom_format_definitions_are_concatenated() {
    let merged = merge_fragments(vec![
        fragment("custom_format_definitions: [{ trash_id: x, name: X }]"),
        fragment("custom_format_definitions: [{ trash_id: x, name: X2 }]"),
    ]);

    assert_eq!(merged.custom_format_definitions.len(), 2);
    assert_eq!(merged.custom_format_definitions[1]["name"], "X2");
}
