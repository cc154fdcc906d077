use super::*;

#[test]
fn test_invalid_specification_display() {
    let err = ConfigurationError::InvalidSpecification {
        format: "x265 (HD)".to_string(),
        reason: "missing fields".to_string(),
    };

    assert_eq!(
        err.to_string(),
        "Invalid custom format specification in 'x265 (HD)': missing fields"
    );
}

#[test]
fn test_template_not_found_is_not_found() {
    let err = ConfigurationError::TemplateNotFound {
        name: "radarr-custom-formats-hd-bluray-web".to_string(),
        source_kind: "recyclarr".to_string(),
    };

    assert!(err.is_not_found());
    assert_eq!(
        err.to_string(),
        "Template 'radarr-custom-formats-hd-bluray-web' not found in recyclarr templates"
    );
}

#[test]
fn test_fetch_failure_is_not_not_found() {
    let err = ConfigurationError::TemplateFetchFailed {
        name: "https://example.com/t.yml".to_string(),
        reason: "status 500".to_string(),
    };

    assert!(!err.is_not_found());
}

#[test]
fn test_unresolved_reference_display() {
    let err = ConfigurationError::UnresolvedReference {
        kind: "secret".to_string(),
        name: "SONARR_API_KEY".to_string(),
    };

    assert_eq!(err.to_string(), "Unresolved secret reference 'SONARR_API_KEY'");
}

#[test]
fn test_errors_are_cloneable_and_comparable() {
    let err = ConfigurationError::ParseError {
        reason: "bad yaml".to_string(),
    };

    assert_eq!(err.clone(), err);
}
