//! Tests for the instance synchronizer.

use super::*;
use arr_client::{CustomFormatPayload, Error, ServerQualityProfile};
use arr_config::{
    ArrType, CanonicalCustomFormat, CanonicalQualityDefinition, CanonicalQualityEntry,
    CanonicalQualityProfile, DeleteUnmanagedPolicy, DesiredQualitySize, ProfileScore,
    QualitySort, ResetUnmatchedScores, Specification, UpgradePolicy,
};
use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Mutex;
use tracing_test::traced_test;

/// An in-memory application that records every mutating call.
#[derive(Default)]
struct MemoryClient {
    state: Mutex<ServerState>,
}

#[derive(Default)]
struct ServerState {
    custom_formats: Vec<CustomFormatPayload>,
    definitions: Vec<ServerQualityDefinition>,
    profiles: Vec<ServerQualityProfile>,
    next_id: i64,
    calls: Vec<String>,
    fail_listing_profiles: bool,
    reject_format: Option<String>,
}

impl MemoryClient {
    fn with_definitions() -> Self {
        let definitions = [
            (1, "SDTV", 1),
            (4, "HDTV-720p", 4),
            (9, "HDTV-1080p", 5),
            (15, "WEBRip-1080p", 6),
            (3, "WEBDL-1080p", 7),
        ]
        .into_iter()
        .map(|(id, name, weight)| {
            serde_json::from_value(json!({
                "id": id,
                "quality": { "id": id, "name": name },
                "title": name,
                "weight": weight,
                "minSize": 1.0,
                "maxSize": 100.0,
                "preferredSize": 50.0
            }))
            .unwrap()
        })
        .collect();

        Self {
            state: Mutex::new(ServerState {
                definitions,
                next_id: 100,
                ..Default::default()
            }),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

#[async_trait]
impl ArrClient for MemoryClient {
    async fn system_status(&self) -> Result<arr_client::SystemStatus, Error> {
        Ok(arr_client::SystemStatus {
            app_name: Some("Sonarr".to_string()),
            version: "4.0.0".to_string(),
        })
    }

    async fn list_custom_formats(&self) -> Result<Vec<CustomFormatPayload>, Error> {
        Ok(self.state.lock().unwrap().custom_formats.clone())
    }

    async fn create_custom_format(
        &self,
        format: &CustomFormatPayload,
    ) -> Result<CustomFormatPayload, Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create_custom_format {}", format.name));
        if state.reject_format.as_deref() == Some(format.name.as_str()) {
            return Err(Error::Api {
                status: 400,
                path: "customformat".to_string(),
                message: "Invalid specification".to_string(),
            });
        }
        state.next_id += 1;
        let mut created = format.clone();
        created.id = Some(state.next_id);
        state.custom_formats.push(created.clone());
        Ok(created)
    }

    async fn update_custom_format(
        &self,
        format: &CustomFormatPayload,
    ) -> Result<CustomFormatPayload, Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("update_custom_format {}", format.name));
        if let Some(existing) = state.custom_formats.iter_mut().find(|cf| cf.id == format.id) {
            *existing = format.clone();
        }
        Ok(format.clone())
    }

    async fn delete_custom_format(&self, id: i64) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete_custom_format {}", id));
        state.custom_formats.retain(|cf| cf.id != Some(id));
        Ok(())
    }

    async fn list_quality_definitions(&self) -> Result<Vec<ServerQualityDefinition>, Error> {
        Ok(self.state.lock().unwrap().definitions.clone())
    }

    async fn update_quality_definitions(
        &self,
        definitions: &[ServerQualityDefinition],
    ) -> Result<Vec<ServerQualityDefinition>, Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("update_quality_definitions".to_string());
        state.definitions = definitions.to_vec();
        Ok(definitions.to_vec())
    }

    async fn list_quality_profiles(&self) -> Result<Vec<ServerQualityProfile>, Error> {
        let state = self.state.lock().unwrap();
        if state.fail_listing_profiles {
            return Err(Error::Unauthorized);
        }
        Ok(state.profiles.clone())
    }

    async fn create_quality_profile(
        &self,
        profile: &ServerQualityProfile,
    ) -> Result<ServerQualityProfile, Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create_quality_profile {}", profile.name));
        state.next_id += 1;
        let mut created = profile.clone();
        created.id = Some(state.next_id);
        state.profiles.push(created.clone());
        Ok(created)
    }

    async fn update_quality_profile(
        &self,
        profile: &ServerQualityProfile,
    ) -> Result<ServerQualityProfile, Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("update_quality_profile {}", profile.name));
        if let Some(existing) = state.profiles.iter_mut().find(|p| p.id == profile.id) {
            *existing = profile.clone();
        }
        Ok(profile.clone())
    }
}

fn custom_format(trash_id: &str, name: &str, score: i64) -> CanonicalCustomFormat {
    let spec = Specification::from_json(
        name,
        &json!({
            "name": name,
            "implementation": "ReleaseTitleSpecification",
            "required": false,
            "fields": { "value": format!("\\b{}\\b", name) }
        }),
    )
    .unwrap();
    CanonicalCustomFormat {
        trash_id: trash_id.to_string(),
        name: name.to_string(),
        include_custom_format_when_renaming: false,
        specifications: vec![spec],
        score_sets: BTreeMap::from([("default".to_string(), score)]),
    }
}

fn web_profile() -> CanonicalQualityProfile {
    CanonicalQualityProfile {
        name: "WEB-1080p".to_string(),
        qualities: vec![CanonicalQualityEntry {
            name: "WEB 1080p".to_string(),
            qualities: vec!["WEBDL-1080p".to_string(), "WEBRip-1080p".to_string()],
            enabled: true,
        }],
        upgrade: UpgradePolicy {
            allowed: true,
            until_quality: Some("WEB 1080p".to_string()),
            until_score: Some(5_000_000),
        },
        min_format_score: None,
        quality_sort: QualitySort::Top,
        score_set: None,
        reset_unmatched_scores: ResetUnmatchedScores {
            enabled: true,
            exceptions: BTreeSet::new(),
        },
        score_assignments: vec![ProfileScore {
            trash_id: "x265".to_string(),
            score: None,
        }],
    }
}

fn config() -> CanonicalConfig {
    CanonicalConfig {
        instance_name: "main".to_string(),
        arr_type: ArrType::Sonarr,
        base_url: "http://localhost:8989".to_string(),
        api_key: SecretString::from("key".to_string()),
        custom_formats: vec![custom_format("x265", "x265", -10000), custom_format("hdr", "HDR", 500)],
        quality_profiles: vec![web_profile()],
        quality_definition: Some(CanonicalQualityDefinition {
            kind: "series".to_string(),
            entries: vec![DesiredQualitySize {
                quality: "WEBDL-1080p".to_string(),
                min: 2.0,
                preferred: 50.0,
                max: 100.0,
            }],
            preferred_ratio: None,
        }),
        delete_unmanaged: DeleteUnmanagedPolicy::default(),
    }
}

#[tokio::test]
async fn test_first_run_creates_everything() {
    let client = MemoryClient::with_definitions();
    let synchronizer = InstanceSynchronizer::new(&client, SyncOptions::default());

    let report = synchronizer.sync(&config()).await;

    assert!(report.is_success(), "{:?}", report.errors);
    assert_eq!(report.custom_formats.created, 2);
    assert_eq!(report.quality_definitions.updated, 1);
    assert_eq!(report.quality_profiles.created, 1);
    assert_eq!(
        client.calls(),
        vec![
            "create_custom_format x265",
            "create_custom_format HDR",
            "update_quality_definitions",
            "create_quality_profile WEB-1080p",
        ]
    );

    let state = client.state.lock().unwrap();
    let profile = &state.profiles[0];
    let x265 = state.custom_formats.iter().find(|cf| cf.name == "x265").unwrap();
    let item = profile.format_items.iter().find(|i| i.format == x265.id.unwrap()).unwrap();
    assert_eq!(item.score, -10000);
    assert_eq!(profile.cutoff_format_score, 5_000_000);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let client = MemoryClient::with_definitions();
    let synchronizer = InstanceSynchronizer::new(&client, SyncOptions::default());
    synchronizer.sync(&config()).await;
    client.clear_calls();

    let report = synchronizer.sync(&config()).await;

    assert!(client.calls().is_empty(), "{:?}", client.calls());
    assert_eq!(report.custom_formats.unchanged, 2);
    assert_eq!(report.quality_definitions.unchanged, 1);
    assert_eq!(report.quality_profiles.unchanged, 1);
}

#[tokio::test]
async fn test_missing_group_produces_single_update() {
    let client = MemoryClient::with_definitions();
    let synchronizer = InstanceSynchronizer::new(&client, SyncOptions::default());
    synchronizer.sync(&config()).await;
    {
        let mut state = client.state.lock().unwrap();
        let profile = &mut state.profiles[0];
        let webdl = profile.items.iter().position(|i| i.is_group()).unwrap();
        let group = profile.items.remove(webdl);
        profile.items.extend(group.items);
        profile.cutoff = 3;
    }
    client.clear_calls();

    let report = synchronizer.sync(&config()).await;

    assert_eq!(client.calls(), vec!["update_quality_profile WEB-1080p"]);
    assert_eq!(report.quality_profiles.updated, 1);
    let state = client.state.lock().unwrap();
    let profile = &state.profiles[0];
    let group = profile.items.iter().find(|i| i.is_group()).unwrap();
    assert_eq!(group.name.as_deref(), Some("WEB 1080p"));
    assert_eq!(profile.cutoff, group.id.unwrap());
}

#[tokio::test]
async fn test_unmatched_scores_are_reset() {
    let client = MemoryClient::with_definitions();
    let synchronizer = InstanceSynchronizer::new(&client, SyncOptions::default());
    synchronizer.sync(&config()).await;
    {
        let mut state = client.state.lock().unwrap();
        for item in state.profiles[0].format_items.iter_mut() {
            if item.name == "HDR" {
                item.score = 5;
            }
        }
    }

    synchronizer.sync(&config()).await;

    let state = client.state.lock().unwrap();
    let hdr = state.profiles[0]
        .format_items
        .iter()
        .find(|i| i.name == "HDR")
        .unwrap();
    assert_eq!(hdr.score, 0);
}

#[tokio::test]
#[traced_test]
async fn test_dry_run_makes_no_calls() {
    let client = MemoryClient::with_definitions();
    let synchronizer = InstanceSynchronizer::new(&client, SyncOptions { dry_run: true });

    let report = synchronizer.sync(&config()).await;

    assert!(client.calls().is_empty());
    assert_eq!(report.custom_formats.created, 2);
    assert_eq!(report.quality_profiles.created, 1);
    assert!(logs_contain("DryRun: would create custom format"));
    assert!(logs_contain("DryRun: would update quality definition"));
    assert!(logs_contain("DryRun: would create quality profile"));
}

#[tokio::test]
async fn test_unmanaged_formats_are_deleted_when_enabled() {
    let client = MemoryClient::with_definitions();
    client.state.lock().unwrap().custom_formats.push(CustomFormatPayload {
        id: Some(7),
        name: "Stray".to_string(),
        include_custom_format_when_renaming: false,
        specifications: Vec::new(),
    });
    let mut config = config();
    config.delete_unmanaged = DeleteUnmanagedPolicy {
        enabled: true,
        ignore: BTreeSet::new(),
    };

    let report = InstanceSynchronizer::new(&client, SyncOptions::default())
        .sync(&config)
        .await;

    assert_eq!(report.custom_formats.deleted, 1);
    assert!(client.calls().contains(&"delete_custom_format 7".to_string()));
}

#[tokio::test]
async fn test_rejected_format_fails_only_that_format() {
    let client = MemoryClient::with_definitions();
    client.state.lock().unwrap().reject_format = Some("HDR".to_string());

    let report = InstanceSynchronizer::new(&client, SyncOptions::default())
        .sync(&config())
        .await;

    assert!(!report.is_success());
    assert_eq!(report.custom_formats.created, 1);
    assert_eq!(report.custom_formats.failed, 1);
    assert_eq!(report.quality_profiles.created, 1);
    assert_eq!(
        report.errors,
        vec![SyncError::Remote {
            operation: "create".to_string(),
            entity: "custom format".to_string(),
            name: "HDR".to_string(),
            message: "Invalid specification".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_failed_listing_aborts_remaining_stages() {
    let client = MemoryClient::with_definitions();
    client.state.lock().unwrap().fail_listing_profiles = true;

    let report = InstanceSynchronizer::new(&client, SyncOptions::default())
        .sync(&config())
        .await;

    assert!(report.aborted);
    assert!(!report.is_success());
    assert_eq!(report.quality_profiles, StageSummary::default());
    assert!(matches!(
        report.errors.as_slice(),
        [SyncError::Remote { operation, entity, .. }] if operation == "list" && entity == "quality profiles"
    ));
}

#[tokio::test]
async fn test_unknown_quality_is_reported_and_others_continue() {
    let client = MemoryClient::with_definitions();
    let mut config = config();
    let mut broken = web_profile();
    broken.name = "Broken".to_string();
    broken.qualities[0].qualities.push("Bluray-2160p".to_string());
    config.quality_profiles.insert(0, broken);

    let report = InstanceSynchronizer::new(&client, SyncOptions::default())
        .sync(&config)
        .await;

    assert_eq!(report.quality_profiles.failed, 1);
    assert_eq!(report.quality_profiles.created, 1);
    assert!(report.errors[0].is_reference_error());
}
