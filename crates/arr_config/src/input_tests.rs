//! Tests for the desired-state input model.

use super::*;

const SAMPLE_CONFIG: &str = r#"
trash_revision: 4b2a1c9
local_config_templates_path: /config/templates
sonarr:
  main:
    base_url: http://sonarr:8989
    api_key: abcdef
    quality_definition:
      type: series
      preferred_ratio: 0.5
    include:
      - template: sonarr-quality-definition-series
      - id: 72dae194fc92bf828f32cde7744e51a1
        source: TRASH
    custom_formats:
      - trash_ids:
          - 85c61753df5da1fb2aab6f2a47426b09
        assign_scores_to:
          - name: WEB-1080p
            score: -10000
    quality_profiles:
      - name: WEB-1080p
        reset_unmatched_scores:
          enabled: true
          exceptions: ["Language: Not English"]
        upgrade:
          allowed: true
          until_quality: WEB 1080p
          until_score: 10000
        quality_sort: top
        qualities:
          - name: WEB 1080p
            qualities: [WEBDL-1080p, WEBRip-1080p]
          - name: HDTV-1080p
            enabled: false
radarr:
  movies:
    enabled: false
    base_url: http://radarr:7878
"#;

#[test]
fn test_parse_sample_config() {
    let config: InputConfig = serde_yaml::from_str(SAMPLE_CONFIG).expect("Failed to parse");

    assert_eq!(config.trash_revision(), "4b2a1c9");
    assert_eq!(config.recyclarr_revision(), DEFAULT_REVISION);
    assert_eq!(config.trash_guide_url(), DEFAULT_TRASH_GUIDE_URL);

    let main = &config.sonarr["main"];
    assert!(main.enabled);
    assert_eq!(main.base_url.as_deref(), Some("http://sonarr:8989"));

    let fragment = &main.fragment;
    assert_eq!(fragment.include.len(), 2);
    assert_eq!(fragment.include[0].source, TemplateSourceKind::Recyclarr);
    assert_eq!(fragment.include[1].source, TemplateSourceKind::Trash);
    assert_eq!(fragment.include[1].template, "72dae194fc92bf828f32cde7744e51a1");

    let definition = fragment.quality_definition.as_ref().unwrap();
    assert_eq!(definition.kind.as_deref(), Some("series"));
    assert_eq!(definition.preferred_ratio, Some(0.5));

    let profile = &fragment.quality_profiles[0];
    let reset = profile.reset_unmatched_scores.as_ref().unwrap();
    assert_eq!(reset.enabled, Some(true));
    assert_eq!(reset.except.as_deref(), Some(&["Language: Not English".to_string()][..]));

    let qualities = profile.qualities.as_ref().unwrap();
    assert_eq!(qualities[0].qualities, vec!["WEBDL-1080p", "WEBRip-1080p"]);
    assert_eq!(qualities[1].enabled, Some(false));
    assert_eq!(profile.quality_sort, Some(QualitySort::Top));

    assert_eq!(fragment.custom_formats[0].assign_scores_to[0].score, Some(-10000));
}

#[test]
fn test_instances_are_ordered_sonarr_then_radarr() {
    let config: InputConfig = serde_yaml::from_str(SAMPLE_CONFIG).unwrap();

    let instances: Vec<(ArrType, &str, bool)> = config
        .instances()
        .map(|(arr, name, instance)| (arr, name, instance.enabled))
        .collect();

    assert_eq!(
        instances,
        vec![(ArrType::Sonarr, "main", true), (ArrType::Radarr, "movies", false)]
    );
}

#[test]
fn test_deprecated_quality_profiles_key_is_accepted() {
    let yaml = r#"
trash_ids: [abc]
quality_profiles:
  - name: HD
"#;

    let assignment: CustomFormatAssignment = serde_yaml::from_str(yaml).unwrap();

    assert!(assignment.assign_scores_to.is_empty());
    assert_eq!(assignment.quality_profiles.unwrap()[0].name, "HD");
}

#[test]
fn test_include_url_detection() {
    assert!(IncludeEntry::new("https://example.com/t.yml", TemplateSourceKind::Recyclarr).is_url());
    assert!(IncludeEntry::new("HTTP://example.com/t.yml", TemplateSourceKind::Trash).is_url());
    assert!(!IncludeEntry::new("radarr-quality-definition-movie", TemplateSourceKind::Recyclarr).is_url());
}

#[test]
fn test_instance_debug_redacts_api_key() {
    let config: InputConfig = serde_yaml::from_str(SAMPLE_CONFIG).unwrap();

    let output = format!("{:?}", config.sonarr["main"]);

    assert!(!output.contains("abcdef"));
    assert!(output.contains("[REDACTED]"));
}

#[test]
fn test_arr_type_display() {
    assert_eq!(ArrType::Sonarr.to_string(), "sonarr");
    assert_eq!(ArrType::Radarr.as_str(), "radarr");
}
