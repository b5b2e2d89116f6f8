//! Filesystem generators against a small ATT&CK bundle

use std::fs;
use std::path::Path;
use std::sync::Arc;

use dettect_core::collaborators::{
    AdminFileSynthesizer, AdminFileUpdater, GraphPlotter, GroupHeatMapRequest, GroupHeatMapper,
    GroupOutcome, LayerBuilder, SpreadsheetExporter, StatisticsReporter,
};
use dettect_core::errors::DtErrorKind;
use dettect_core::model::{
    AdministrationArtifact, ArtifactKind, ArtifactRef, GroupOptions, OverlayType, Platform,
    QuerySet, ScoreDimension,
};
use dettect_core::{Environment, Interrupt, StepStatus};
use dettect_reports::FsGenerators;
use dettect_store::admin::load_techniques;
use dettect_store::FsQueryFilter;
use tempfile::TempDir;

const BUNDLE: &str = r#"{
  "type": "bundle",
  "objects": [
    {"type": "attack-pattern", "id": "attack-pattern--1", "name": "OS Credential Dumping",
     "external_references": [{"source_name": "mitre-attack", "external_id": "T1003"}],
     "kill_chain_phases": [{"kill_chain_name": "mitre-attack", "phase_name": "credential-access"}],
     "x_mitre_platforms": ["Windows"],
     "x_mitre_data_sources": ["Process: Process Access", "Command: Command Execution"]},
    {"type": "attack-pattern", "id": "attack-pattern--2", "name": "Process Injection",
     "external_references": [{"source_name": "mitre-attack", "external_id": "T1055"}],
     "kill_chain_phases": [{"kill_chain_name": "mitre-attack", "phase_name": "defense-evasion"}],
     "x_mitre_platforms": ["Windows"],
     "x_mitre_data_sources": ["Process: Process Access"]},
    {"type": "intrusion-set", "id": "intrusion-set--1", "name": "APT28", "aliases": ["Sofacy"],
     "external_references": [{"source_name": "mitre-attack", "external_id": "G0007"}]},
    {"type": "relationship", "id": "relationship--1", "relationship_type": "uses",
     "source_ref": "intrusion-set--1", "target_ref": "attack-pattern--1"}
  ]
}"#;

const DATA_SOURCES: &str = r#"version: 1.1
file_type: data-source-administration
name: lab
platform: [Windows]
data_sources:
  - data_source_name: Process Access
    date_registered: 2019-01-01
    date_connected: 2019-02-01
    products: [Sysmon]
    available_for_data_analytics: true
  - data_source_name: Command Execution
    available_for_data_analytics: false
"#;

const TECHNIQUES: &str = r#"version: 1.2
file_type: technique-administration
name: lab
platform: [Windows]
techniques:
  - technique_id: T1003
    technique_name: OS Credential Dumping
    visibility:
      applicable_to: [all]
      score_logbook:
        - {date: 2020-01-01, score: 1, auto_generated: true}
    detection:
      applicable_to: [all]
      score_logbook:
        - {date: 2020-02-01, score: 3}
"#;

struct Fixture {
    _dir: TempDir,
    env: Environment,
    generators: FsGenerators,
    file_ds: ArtifactRef,
    file_tech: ArtifactRef,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let env = Environment::bootstrap(dir.path()).unwrap();
    fs::write(env.cache_dir().join("enterprise-attack.json"), BUNDLE).unwrap();

    let ds_path = dir.path().join("data-sources.yaml");
    let tech_path = dir.path().join("techniques.yaml");
    fs::write(&ds_path, DATA_SOURCES).unwrap();
    fs::write(&tech_path, TECHNIQUES).unwrap();

    let generators = FsGenerators::new(env.clone(), env.cache_dir(), Interrupt::new());
    Fixture {
        generators,
        file_ds: Arc::new(AdministrationArtifact::supplied(ds_path, ArtifactKind::DataSourceAdmin)),
        file_tech: Arc::new(AdministrationArtifact::supplied(
            tech_path,
            ArtifactKind::TechniqueAdmin,
        )),
        env,
        _dir: dir,
    }
}

fn written(status: StepStatus) -> Vec<std::path::PathBuf> {
    match status {
        StepStatus::Written(paths) => paths,
        other => panic!("expected written files, got {:?}", other),
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
}

#[test]
fn test_data_source_layer_scores_coverage() {
    let f = fixture();
    let paths = written(f.generators.data_source_layer(&f.file_ds).unwrap());

    assert_eq!(paths, vec![f.env.output_path("data_sources_lab.json")]);
    let layer = read_json(&paths[0]);
    let techniques = layer["techniques"].as_array().unwrap();
    let score = |id: &str| {
        techniques
            .iter()
            .find(|t| t["techniqueID"] == id)
            .map(|t| t["score"].as_i64().unwrap())
    };
    // 1 of 2 data sources → 50% → 2; 1 of 1 → 100% → 4
    assert_eq!(score("T1003"), Some(2));
    assert_eq!(score("T1055"), Some(4));
}

#[test]
fn test_technique_layers_and_overlay_file_names() {
    let f = fixture();
    let layer = written(
        f.generators
            .technique_layer(ScoreDimension::Detection, &f.file_tech, Some(&f.file_ds), false)
            .unwrap(),
    );
    let overlay = written(
        f.generators
            .technique_layer(ScoreDimension::Detection, &f.file_tech, None, true)
            .unwrap(),
    );

    assert_eq!(layer, vec![f.env.output_path("detection_lab.json")]);
    assert_eq!(overlay, vec![f.env.output_path("visibility_and_detection_lab.json")]);
    let json = read_json(&layer[0]);
    assert_eq!(json["techniques"][0]["score"], 3);
}

#[test]
fn test_spreadsheets_and_graphs() {
    let f = fixture();
    written(f.generators.export_data_sources(&f.file_ds).unwrap());
    written(f.generators.export_techniques(&f.file_tech).unwrap());
    written(f.generators.plot_data_sources(&f.file_ds).unwrap());
    written(
        f.generators
            .plot_techniques(ScoreDimension::Visibility, &f.file_tech)
            .unwrap(),
    );

    for name in [
        "data_sources_lab.csv",
        "techniques_lab.csv",
        "graph_data_sources_lab.svg",
        "graph_visibility_lab.svg",
    ] {
        assert!(f.env.output_path(name).is_file(), "{} missing", name);
    }
}

#[test]
fn test_synthesize_then_update_in_place() {
    let f = fixture();
    let synthesized = written(f.generators.synthesize_technique_admin(&f.file_ds).unwrap());
    assert_eq!(
        synthesized,
        vec![f.env.output_path("techniques-administration-lab.yaml")]
    );
    assert_eq!(load_techniques(&synthesized[0]).unwrap().techniques.len(), 2);

    let paths = written(
        f.generators
            .update_technique_admin(&f.file_ds, &f.file_tech)
            .unwrap(),
    );
    assert_eq!(paths[0], f.file_tech.path());
    assert!(paths[1].is_file(), "backup written");

    let updated = load_techniques(f.file_tech.path()).unwrap();
    let ids: Vec<&str> = updated.techniques.iter().map(|t| t.technique_id.as_str()).collect();
    assert_eq!(ids, vec!["T1003", "T1055"]);
    assert_eq!(updated.techniques[0].max_score(ScoreDimension::Visibility), Some(2));

    // A second run has nothing left to change
    assert_eq!(
        f.generators
            .update_technique_admin(&f.file_ds, &f.file_tech)
            .unwrap(),
        StepStatus::Printed
    );
}

#[test]
fn test_group_heat_map_with_detection_overlay_and_queries() {
    let f = fixture();
    let filter = FsQueryFilter::new(f.env.clone());
    let request = GroupHeatMapRequest {
        options: GroupOptions {
            groups: "sofacy".to_string(),
            overlay: Some(f.file_tech.path().display().to_string()),
            overlay_type: OverlayType::Detection,
            platform: Platform::All,
            ..GroupOptions::default()
        },
        overlay_artifact: Some(f.file_tech.clone()),
        queries: QuerySet::pair(None, Some("score == 3".to_string()), false),
        health: false,
    };

    let GroupOutcome::Completed(status) = f.generators.group_heat_map(&request, &filter).unwrap()
    else {
        panic!("expected a completed heat map");
    };
    assert_eq!(written(status), vec![f.env.output_path("sofacy.json")]);

    let request = GroupHeatMapRequest {
        queries: QuerySet::pair(None, Some("score == 5".to_string()), false),
        ..request
    };
    assert_eq!(
        f.generators.group_heat_map(&request, &filter).unwrap(),
        GroupOutcome::NoResults
    );
}

#[test]
fn test_unknown_group_and_missing_knowledge_base() {
    let f = fixture();
    let filter = FsQueryFilter::new(f.env.clone());
    let request = GroupHeatMapRequest {
        options: GroupOptions {
            groups: "FIN7".to_string(),
            ..GroupOptions::default()
        },
        overlay_artifact: None,
        queries: None,
        health: false,
    };
    let err = f.generators.group_heat_map(&request, &filter).unwrap_err();
    assert_eq!(err.kind(), DtErrorKind::InvalidInput);

    fs::remove_file(f.env.cache_dir().join("enterprise-attack.json")).unwrap();
    let err = f.generators.data_source_coverage().unwrap_err();
    assert_eq!(err.kind(), DtErrorKind::KnowledgeBase);
}
