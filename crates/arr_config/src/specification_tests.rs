//! Tests for custom-format specification parsing.

use super::*;
use serde_json::json;

#[test]
fn test_release_title_from_guide_shape() {
    let value = json!({
        "name": "x265",
        "implementation": "ReleaseTitleSpecification",
        "negate": false,
        "required": true,
        "fields": { "value": "[xh][ .]?265|\\bHEVC(\\b|\\d)" }
    });

    let spec = Specification::from_json("x265 (HD)", &value).expect("Failed to parse");

    assert_eq!(spec.name, "x265");
    assert!(spec.required);
    assert!(!spec.negate);
    assert_eq!(spec.implementation(), "ReleaseTitleSpecification");
    assert_eq!(
        spec.fields.to_fields(),
        vec![("value".to_string(), json!("[xh][ .]?265|\\bHEVC(\\b|\\d)"))]
    );
}

#[test]
fn test_fields_in_application_list_shape() {
    let value = json!({
        "name": "Not English",
        "implementation": "LanguageSpecification",
        "negate": true,
        "fields": [
            { "name": "value", "value": 1, "label": "Language" },
            { "name": "exceptLanguage", "value": false }
        ]
    });

    let spec = Specification::from_json("Language: Not English", &value).unwrap();

    assert_eq!(
        spec.fields,
        SpecificationFields::Language(LanguageFields {
            value: 1,
            except_language: Some(false),
        })
    );
    assert_eq!(spec.fields.to_fields().len(), 2);
}

#[test]
fn test_size_specification() {
    let value = json!({
        "name": "Size",
        "implementation": "SizeSpecification",
        "fields": { "min": 1, "max": 9.5 }
    });

    let spec = Specification::from_json("Small", &value).unwrap();

    assert_eq!(spec.fields, SpecificationFields::Size(SizeFields { min: 1.0, max: 9.5 }));
    assert_eq!(spec.fields.to_fields()[1], ("max".to_string(), json!(9.5)));
}

#[test]
fn test_missing_fields_is_invalid() {
    let value = json!({
        "name": "Bluray",
        "implementation": "SourceSpecification"
    });

    let err = Specification::from_json("Remux", &value).unwrap_err();

    assert!(matches!(
        err,
        ConfigurationError::InvalidSpecification { ref format, .. } if format == "Remux"
    ));
}

#[test]
fn test_empty_fields_is_invalid() {
    let value = json!({
        "name": "Bluray",
        "implementation": "SourceSpecification",
        "fields": {}
    });

    assert!(Specification::from_json("Remux", &value).is_err());
}

#[test]
fn test_unknown_implementation_is_invalid() {
    let value = json!({
        "name": "Mystery",
        "implementation": "TelepathySpecification",
        "fields": { "value": 1 }
    });

    let err = Specification::from_json("Odd", &value).unwrap_err();

    assert!(err.to_string().contains("TelepathySpecification"));
}

#[test]
fn test_wrong_field_type_is_invalid() {
    let value = json!({
        "name": "2160p",
        "implementation": "ResolutionSpecification",
        "fields": { "value": "2160p" }
    });

    assert!(Specification::from_json("UHD", &value).is_err());
}

#[test]
fn test_every_implementation_round_trips_its_name() {
    let cases = [
        ("ReleaseTitleSpecification", json!({"value": "x"})),
        ("ReleaseGroupSpecification", json!({"value": "x"})),
        ("EditionSpecification", json!({"value": "x"})),
        ("LanguageSpecification", json!({"value": 1})),
        ("SourceSpecification", json!({"value": 7})),
        ("ResolutionSpecification", json!({"value": 1080})),
        ("QualityModifierSpecification", json!({"value": 5})),
        ("IndexerFlagSpecification", json!({"value": 8})),
        ("ReleaseTypeSpecification", json!({"value": 1})),
        ("SizeSpecification", json!({"min": 0, "max": 5})),
        ("YearSpecification", json!({"min": 1990, "max": 1999})),
    ];

    for (implementation, fields) in cases {
        let value = json!({"name": "n", "implementation": implementation, "fields": fields});
        let spec = Specification::from_json("f", &value).expect(implementation);
        assert_eq!(spec.implementation(), implementation);
    }
}
