//! Tests for the custom-format catalogue.

use super::*;
use crate::input::ArrType;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn definition(trash_id: &str, name: &str, pattern: &str) -> Value {
    json!({
        "trash_id": trash_id,
        "trash_scores": { "default": 100 },
        "name": name,
        "specifications": [{
            "name": name,
            "implementation": "ReleaseTitleSpecification",
            "required": true,
            "fields": { "value": pattern }
        }]
    })
}

#[test]
fn test_later_definitions_win() {
    let mut catalog = CustomFormatCatalog::new();

    catalog.add_definitions("first", &[definition("abc", "Old Name", "old")]);
    catalog.add_definitions("second", &[definition("abc", "New Name", "new")]);

    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.get("abc").unwrap().name, "New Name");
    assert_eq!(catalog.origin("abc"), Some("second"));
}

#[test]
fn test_invalid_specification_skips_only_that_format() {
    let mut catalog = CustomFormatCatalog::new();
    let broken = json!({
        "trash_id": "broken",
        "name": "Broken",
        "specifications": [{ "name": "x", "implementation": "SourceSpecification" }]
    });

    catalog.add_definitions("inline", &[broken, definition("ok", "Fine", "x")]);

    assert!(catalog.get("broken").is_none());
    assert!(catalog.get("ok").is_some());
}

#[test]
fn test_invalid_replacement_keeps_previous_definition() {
    let mut catalog = CustomFormatCatalog::new();
    catalog.add_definitions("guide", &[definition("abc", "Guide", "x")]);

    catalog.add_definitions(
        "local",
        &[json!({
            "trash_id": "abc",
            "name": "Local",
            "specifications": [{ "name": "x", "implementation": "Nope", "fields": { "value": 1 } }]
        })],
    );

    assert_eq!(catalog.get("abc").unwrap().name, "Guide");
}

#[test]
fn test_malformed_definition_is_skipped() {
    let mut catalog = CustomFormatCatalog::new();

    catalog.add_definitions("inline", &[json!({ "name": "no trash id" })]);

    assert!(catalog.is_empty());
}

#[test]
fn test_build_applies_source_precedence() {
    let guide_dir = TempDir::new().unwrap();
    let cf_dir = guide_dir.path().join("docs/json/sonarr/cf");
    fs::create_dir_all(&cf_dir).unwrap();
    fs::write(
        cf_dir.join("a.json"),
        definition("a", "Guide A", "g").to_string(),
    )
    .unwrap();
    fs::write(
        cf_dir.join("b.json"),
        definition("b", "Guide B", "g").to_string(),
    )
    .unwrap();
    fs::write(
        cf_dir.join("c.json"),
        definition("c", "Guide C", "g").to_string(),
    )
    .unwrap();

    let local_dir = TempDir::new().unwrap();
    fs::write(
        local_dir.path().join("b.json"),
        definition("b", "Local B", "l").to_string(),
    )
    .unwrap();

    let guide = TrashGuide::new(guide_dir.path(), ArrType::Sonarr);
    let catalog = CustomFormatCatalog::build(
        Some(&guide),
        Some(local_dir.path()),
        &[definition("c", "Global C", "gl"), definition("d", "Global D", "gl")],
        &[definition("d", "Instance D", "i")],
    )
    .unwrap();

    assert_eq!(catalog.len(), 4);
    assert_eq!(catalog.get("a").unwrap().name, "Guide A");
    assert_eq!(catalog.get("b").unwrap().name, "Local B");
    assert_eq!(catalog.get("c").unwrap().name, "Global C");
    assert_eq!(catalog.get("d").unwrap().name, "Instance D");
}
