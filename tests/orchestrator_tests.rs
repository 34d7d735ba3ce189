mod common;

use common::*;
use site_export::config::ExportConfig;
use site_export::export::{
    ExportError, ExportOperationOrchestrator, ExportWarning, PassStatus, PostProcessingKind,
    RunStatus,
};
use site_export::logging::{LogLevel, MemorySink};
use site_export::types::{keys, ExportRequest, PlatformTuple, UnitRef};
use site_export::workspace::UnitManifest;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const FEATURE: &str = "org.example.feature";

struct Harness {
    orchestrator: ExportOperationOrchestrator,
    tool: Arc<RecordingBuildTool>,
    sink: Arc<MemorySink>,
}

fn harness_with(tool: RecordingBuildTool, config: ExportConfig) -> Harness {
    let tool = Arc::new(tool);
    let sink = Arc::new(MemorySink::new());
    let manifests = StaticManifestReader::new()
        .with(FEATURE, UnitManifest::new(FEATURE).with_version("1.0.0"))
        .with("org.example.tools", UnitManifest::new("org.example.tools"));

    let orchestrator = ExportOperationOrchestrator::new(
        config,
        tool.clone(),
        Arc::new(manifests),
        sink.clone(),
    )
    .with_platform_defaults(test_defaults());

    Harness {
        orchestrator,
        tool,
        sink,
    }
}

fn harness(tool: RecordingBuildTool) -> Harness {
    harness_with(tool, ExportConfig::default())
}

fn site(temp: &TempDir) -> PathBuf {
    temp.path().join("site")
}

fn request(destination: &Path, platforms: Vec<PlatformTuple>) -> ExportRequest {
    ExportRequest::builder(destination)
        .unit(UnitRef::new(FEATURE, "/ws/org.example.feature"))
        .platforms(platforms)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_failing_target_does_not_stop_siblings() {
    let temp = TempDir::new().unwrap();
    let h = harness(RecordingBuildTool::new().failing_on(windows()));

    let result = h
        .orchestrator
        .run(&request(&site(&temp), vec![linux(), windows(), mac()]))
        .await
        .unwrap();

    let statuses: Vec<bool> = result.per_target.iter().map(|o| o.is_success()).collect();
    assert_eq!(statuses, vec![true, false, true]);
    assert_eq!(result.per_target[1].target, windows());
    assert_eq!(result.status(), RunStatus::Failed);
    assert_eq!(h.tool.invocation_count(), 3);

    match &result.per_target[1].status {
        PassStatus::Failed { reason } => assert!(reason.contains("exited with status 1")),
        other => panic!("Expected Failed, got {other:?}"),
    }
    assert!(result.per_target[1].unit_builds[0].log_location.is_some());
    assert_eq!(h.sink.messages(LogLevel::Error).len(), 2);
}

#[tokio::test]
async fn test_all_targets_succeeding_is_done() {
    let temp = TempDir::new().unwrap();
    let h = harness(RecordingBuildTool::new());

    let result = h
        .orchestrator
        .run(&request(&site(&temp), vec![linux(), windows()]))
        .await
        .unwrap();

    assert_eq!(result.status(), RunStatus::Done);
    assert_eq!(result.succeeded(), 2);
    assert!(h.sink.messages(LogLevel::Error).is_empty());
}

#[tokio::test]
async fn test_colliding_output_paths_abort_before_any_build() {
    let temp = TempDir::new().unwrap();
    let h = harness(RecordingBuildTool::new());

    let result = h
        .orchestrator
        .run(&request(
            &site(&temp),
            vec![
                PlatformTuple::new("Win32", "win32", "x86_64"),
                windows(),
            ],
        ))
        .await;

    let error = result.unwrap_err();
    assert!(error.is_preflight());
    match error {
        ExportError::DuplicateTargetPath { first, second, .. } => {
            assert_eq!(first, "Win32.win32.x86_64");
            assert_eq!(second, "win32.win32.x86_64");
        }
        other => panic!("Expected DuplicateTargetPath, got {other:?}"),
    }
    assert_eq!(h.tool.invocation_count(), 0);
    assert!(!site(&temp).exists());
}

#[tokio::test]
async fn test_empty_platform_list_builds_host_default_with_portable_properties() {
    let temp = TempDir::new().unwrap();
    let h = harness(RecordingBuildTool::new());

    let result = h
        .orchestrator
        .run(&request(&site(&temp), vec![]))
        .await
        .unwrap();

    assert_eq!(result.per_target.len(), 1);
    assert_eq!(result.per_target[0].target, linux());
    assert_eq!(
        result.per_target[0].output_path,
        site(&temp).join("linux.gtk.x86_64")
    );

    let invocations = h.tool.invocations();
    assert_eq!(invocations.len(), 1);
    for key in [keys::OS, keys::WS, keys::ARCH] {
        assert!(!invocations[0].properties.contains_key(key));
    }
    assert_eq!(
        invocations[0].script,
        Path::new("/ws/org.example.feature/build.xml")
    );
}

#[tokio::test]
async fn test_outcomes_follow_request_order_not_completion_order() {
    let temp = TempDir::new().unwrap();
    let tool = RecordingBuildTool::new()
        .delayed(linux(), Duration::from_millis(300))
        .delayed(windows(), Duration::from_millis(150));
    let h = harness(tool);

    let result = h
        .orchestrator
        .run(&request(&site(&temp), vec![linux(), windows(), mac()]))
        .await
        .unwrap();

    let order: Vec<PlatformTuple> = result.per_target.iter().map(|o| o.target.clone()).collect();
    assert_eq!(order, vec![linux(), windows(), mac()]);
}

#[tokio::test]
async fn test_parallel_builds_are_bounded() {
    let temp = TempDir::new().unwrap();
    let config = ExportConfig {
        max_parallel_builds: 2,
        ..ExportConfig::default()
    };
    let h = harness_with(
        RecordingBuildTool::new().with_default_delay(Duration::from_millis(50)),
        config,
    );

    let platforms = vec![
        linux(),
        windows(),
        mac(),
        PlatformTuple::new("linux", "gtk", "aarch64"),
    ];
    let result = h
        .orchestrator
        .run(&request(&site(&temp), platforms))
        .await
        .unwrap();

    assert_eq!(result.per_target.len(), 4);
    assert!(h.tool.max_concurrent() <= 2);
    assert!(h.tool.max_concurrent() >= 1);
}

#[tokio::test]
async fn test_timed_out_build_fails_only_its_target() {
    let temp = TempDir::new().unwrap();
    let config = ExportConfig {
        build_timeout_secs: Some(1),
        ..ExportConfig::default()
    };
    let h = harness_with(
        RecordingBuildTool::new().delayed(windows(), Duration::from_secs(5)),
        config,
    );

    let result = h
        .orchestrator
        .run(&request(&site(&temp), vec![linux(), windows()]))
        .await
        .unwrap();

    assert!(result.outcome_for(&linux()).unwrap().is_success());
    assert_eq!(
        result.outcome_for(&windows()).unwrap().status,
        PassStatus::TimedOut { timeout_secs: 1 }
    );
    assert_eq!(result.status(), RunStatus::Failed);
}

#[tokio::test]
async fn test_unstartable_build_is_recorded_per_target() {
    let temp = TempDir::new().unwrap();
    let h = harness(RecordingBuildTool::new().unstartable_on(mac()));

    let result = h
        .orchestrator
        .run(&request(&site(&temp), vec![mac(), linux()]))
        .await
        .unwrap();

    assert!(!result.per_target[0].is_success());
    assert!(result.per_target[0].unit_builds[0].log_location.is_none());
    assert!(result.per_target[1].is_success());
    assert!(h
        .sink
        .messages(LogLevel::Error)
        .iter()
        .any(|m| m.contains("runner not found")));
}

#[tokio::test]
async fn test_platform_properties_do_not_leak_between_targets() {
    let temp = TempDir::new().unwrap();
    let config = ExportConfig {
        max_parallel_builds: 1,
        ..ExportConfig::default()
    };
    let h = harness_with(RecordingBuildTool::new(), config);

    h.orchestrator
        .run(&request(&site(&temp), vec![windows(), linux()]))
        .await
        .unwrap();

    let invocations = h.tool.invocations();
    let win = invocations.iter().find(|i| i.target == windows()).unwrap();
    let host = invocations.iter().find(|i| i.target == linux()).unwrap();

    assert_eq!(win.properties.get(keys::OS), Some("win32"));
    assert_eq!(win.properties.get(keys::WS), Some("win32"));
    assert!(!win.properties.contains_key(keys::ARCH));
    assert!(!host.properties.contains_key(keys::OS));
    assert!(!host.properties.contains_key(keys::WS));
    assert_ne!(
        win.properties.get(keys::OUTPUT_DIRECTORY),
        host.properties.get(keys::OUTPUT_DIRECTORY)
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_metadata_published_for_staged_directory() {
    let temp = TempDir::new().unwrap();
    let h = harness(RecordingBuildTool::new());
    let request = ExportRequest::builder(site(&temp))
        .unit(UnitRef::new(FEATURE, "/ws/org.example.feature"))
        .platforms(vec![linux(), windows()])
        .export_metadata(true)
        .build()
        .unwrap();

    let result = h.orchestrator.run(&request).await.unwrap();

    let expected_url = format!("file:{}", site(&temp).display());
    let metadata = result.metadata.as_ref().expect("metadata descriptor");
    assert_eq!(metadata.metadata_repo_url, expected_url);
    assert_eq!(metadata.artifact_repo_url, expected_url);
    assert!(!metadata.publish_artifacts);
    assert_eq!(result.all_warnings().count(), 0);

    for invocation in h.tool.invocations() {
        assert_eq!(
            invocation.properties.get(keys::P2_METADATA_REPO),
            Some(expected_url.as_str())
        );
        assert_eq!(invocation.properties.get(keys::P2_PUBLISH_ARTIFACTS), Some("false"));
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_unconvertible_destination_builds_without_metadata() {
    let temp = TempDir::new().unwrap();
    let destination = relative_from_cwd(&site(&temp));
    let h = harness(RecordingBuildTool::new());
    let request = ExportRequest::builder(&destination)
        .unit(UnitRef::new(FEATURE, "/ws/org.example.feature"))
        .platforms(vec![linux(), windows()])
        .export_metadata(true)
        .build()
        .unwrap();

    let result = h.orchestrator.run(&request).await.unwrap();

    assert_eq!(result.status(), RunStatus::Done);
    assert!(result.metadata.is_none());
    assert!(matches!(
        result.warnings.as_slice(),
        [ExportWarning::MetadataSkipped { target: None, .. }]
    ));
    for outcome in &result.per_target {
        assert!(matches!(
            outcome.warnings.as_slice(),
            [ExportWarning::MetadataSkipped { target: Some(_), .. }]
        ));
    }
    for invocation in h.tool.invocations() {
        for key in keys::METADATA_KEYS {
            assert!(!invocation.properties.contains_key(key));
        }
    }
    assert_eq!(h.sink.messages(LogLevel::Warn).len(), 3);
}

#[tokio::test]
async fn test_archives_skip_metadata_entirely() {
    let temp = TempDir::new().unwrap();
    let h = harness(RecordingBuildTool::new());
    let request = ExportRequest::builder(site(&temp))
        .unit(UnitRef::new(FEATURE, "/ws/org.example.feature"))
        .to_directory(false)
        .export_metadata(true)
        .build()
        .unwrap();

    let result = h.orchestrator.run(&request).await.unwrap();

    assert!(result.metadata.is_none());
    let invocation = &h.tool.invocations()[0];
    assert_eq!(invocation.properties.get(keys::OUTPUT_TYPE), Some("archive"));
    for key in keys::METADATA_KEYS {
        assert!(!invocation.properties.contains_key(key));
    }
}

#[tokio::test]
async fn test_metadata_not_published_when_every_target_fails() {
    let temp = TempDir::new().unwrap();
    let h = harness(RecordingBuildTool::new().failing_on(linux()));
    let request = ExportRequest::builder(site(&temp))
        .unit(UnitRef::new(FEATURE, "/ws/org.example.feature"))
        .export_metadata(true)
        .build()
        .unwrap();

    let result = h.orchestrator.run(&request).await.unwrap();

    assert_eq!(result.status(), RunStatus::Failed);
    assert!(result.metadata.is_none());
}

#[tokio::test]
async fn test_hook_files_created_once_and_preserved() {
    let temp = TempDir::new().unwrap();
    let h = harness(RecordingBuildTool::new());
    let request = request(&site(&temp), vec![linux(), windows()]);

    h.orchestrator.run(&request).await.unwrap();

    let hooks_dir = site(&temp).join(".export").join(FEATURE);
    let feature_hook = hooks_dir.join(PostProcessingKind::Feature.file_name());
    let plugin_hook = hooks_dir.join(PostProcessingKind::Plugin.file_name());
    assert!(feature_hook.is_file());
    assert!(plugin_hook.is_file());
    assert_eq!(std::fs::read_dir(&hooks_dir).unwrap().count(), 2);

    std::fs::write(&plugin_hook, "org.example.bundle=sign\n").unwrap();
    h.orchestrator.run(&request).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(&plugin_hook).unwrap(),
        "org.example.bundle=sign\n"
    );
    let invocation = &h.tool.invocations()[0];
    assert_eq!(
        invocation.properties.get(keys::PLUGIN_POST_PROCESSING),
        plugin_hook.to_str()
    );
}

#[tokio::test]
async fn test_unknown_unit_fails_before_any_build() {
    let temp = TempDir::new().unwrap();
    let h = harness(RecordingBuildTool::new());
    let request = ExportRequest::builder(site(&temp))
        .unit(UnitRef::new("org.example.unknown", "/ws/unknown"))
        .build()
        .unwrap();

    let result = h.orchestrator.run(&request).await;

    let error = result.unwrap_err();
    assert!(error.is_preflight());
    assert!(matches!(error, ExportError::Manifest { .. }));
    assert_eq!(h.tool.invocation_count(), 0);
}

#[tokio::test]
async fn test_failing_unit_fails_its_target_but_other_units_still_build() {
    let temp = TempDir::new().unwrap();
    let h = harness(RecordingBuildTool::new().failing_unit(FEATURE));
    let request = ExportRequest::builder(site(&temp))
        .unit(UnitRef::new(FEATURE, "/ws/org.example.feature"))
        .unit(UnitRef::new("org.example.tools", "/ws/org.example.tools"))
        .build()
        .unwrap();

    let result = h.orchestrator.run(&request).await.unwrap();

    let outcome = &result.per_target[0];
    assert!(!outcome.is_success());
    assert_eq!(outcome.unit_builds.len(), 2);
    assert!(outcome.unit_builds[0].status.is_failure());
    assert!(outcome.unit_builds[1].status.is_success());
    assert_eq!(h.tool.invocation_count(), 2);
}

#[tokio::test]
async fn test_host_target_output_does_not_contain_siblings() {
    let temp = TempDir::new().unwrap();
    let h = harness(RecordingBuildTool::new());
    let destination = site(&temp);

    let result = h
        .orchestrator
        .run(&request(&destination, vec![linux(), windows()]))
        .await
        .unwrap();

    let host = result.outcome_for(&linux()).unwrap();
    let win = result.outcome_for(&windows()).unwrap();
    assert_eq!(host.output_path, destination.join("linux.gtk.x86_64"));
    assert_eq!(win.output_path, destination.join("win32.win32.x86_64"));
    assert!(!win.output_path.starts_with(&host.output_path));

    for invocation in h.tool.invocations() {
        let output = PathBuf::from(invocation.properties.get(keys::OUTPUT_DIRECTORY).unwrap());
        assert_ne!(output, destination);
        assert!(output.starts_with(&destination));
    }
}

#[tokio::test]
async fn test_work_dir_stays_outside_every_output() {
    let temp = TempDir::new().unwrap();
    let h = harness(RecordingBuildTool::new());
    let destination = site(&temp);

    let result = h
        .orchestrator
        .run(&request(&destination, vec![linux(), windows(), mac()]))
        .await
        .unwrap();

    let work_dir = destination.join(".export");
    assert!(work_dir.join(FEATURE).is_dir());
    for outcome in &result.per_target {
        assert!(!work_dir.starts_with(&outcome.output_path));
        let log = outcome.unit_builds[0].log_location.as_ref().unwrap();
        assert!(log.starts_with(work_dir.join("logs")));
    }
    let invocation = &h.tool.invocations()[0];
    assert_eq!(
        invocation.properties.get(keys::BUILD_DIRECTORY),
        work_dir.to_str()
    );
}

#[tokio::test]
async fn test_work_dir_inside_a_target_output_aborts_before_any_build() {
    let temp = TempDir::new().unwrap();
    let destination = site(&temp);
    let config = ExportConfig {
        work_dir: Some(destination.join("win32.win32.x86_64").join("work")),
        ..ExportConfig::default()
    };
    let h = harness_with(RecordingBuildTool::new(), config);

    let error = h
        .orchestrator
        .run(&request(&destination, vec![linux(), windows()]))
        .await
        .unwrap_err();

    assert!(error.is_preflight());
    assert!(matches!(error, ExportError::Configuration(_)));
    assert_eq!(h.tool.invocation_count(), 0);
    assert!(!destination.exists());
}

#[tokio::test]
async fn test_unit_id_cannot_escape_the_work_dir() {
    let temp = TempDir::new().unwrap();
    let h = harness(RecordingBuildTool::new());
    let destination = temp.path().join("nested").join("site");
    let mut request = request(&destination, vec![]);
    request.units[0].id = "../../escaped".to_string();

    let error = h.orchestrator.run(&request).await.unwrap_err();

    assert!(matches!(error, ExportError::InvalidRequest(_)));
    assert_eq!(h.tool.invocation_count(), 0);
    assert!(!temp.path().join("escaped").exists());
    assert!(!temp.path().join("nested").exists());
}

#[tokio::test]
async fn test_blank_qualifier_is_not_forwarded() {
    let temp = TempDir::new().unwrap();
    let h = harness(RecordingBuildTool::new());
    let request = ExportRequest::builder(site(&temp))
        .unit(UnitRef::new(FEATURE, "/ws/org.example.feature"))
        .qualifier("  ")
        .build()
        .unwrap();

    h.orchestrator.run(&request).await.unwrap();

    let invocation = &h.tool.invocations()[0];
    assert!(!invocation.properties.contains_key(keys::FORCE_CONTEXT_QUALIFIER));
}
