//! Artifact directory layout and content for planned fixture targets.

use lock_tests::scenario::demo_fixture;
use synthplan_harness::artifacts::{
    write_batch_summary, write_target_artifacts, BATCH_SUMMARY_FILENAME, REPORT_FILENAME,
    ROUTE_FILENAME, SUMMARY_FILENAME,
};
use synthplan_harness::config::PlannerConfig;
use synthplan_harness::runner::{plan_batch, BatchSummary};
use synthplan_harness::tables::FixtureCollaborators;
use synthplan_kernel::digest::hash::{canonical_hash, HashDomain};

#[test]
fn batch_writes_one_directory_per_target() {
    let fixture = demo_fixture();
    let collaborators = FixtureCollaborators::from_fixture(&fixture);
    let set = fixture.terminal_set();
    let results = plan_batch(
        &fixture.targets,
        &set,
        &PlannerConfig::default(),
        collaborators.as_collaborators(),
        None,
    );

    let out = tempfile::tempdir().unwrap();
    for result in &results {
        let written = write_target_artifacts(out.path(), result.as_ref().unwrap()).unwrap();
        assert_eq!(written.len(), 3);
        for artifact in &written {
            let bytes = std::fs::read(&artifact.path).unwrap();
            assert_eq!(artifact.digest, canonical_hash(HashDomain::Artifact, &bytes));
        }
    }
    let summary = BatchSummary::from_results(&fixture.targets, &results);
    write_batch_summary(out.path(), &summary).unwrap();

    let mut entries: Vec<String> = std::fs::read_dir(out.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    entries.sort();
    assert_eq!(
        entries,
        vec![
            BATCH_SUMMARY_FILENAME,
            "aspirin",
            "decanoic_acid",
            "paracetamol",
            "phenol",
            "salicylic_acid",
        ]
    );

    let aspirin = out.path().join("aspirin");
    let report_bytes = std::fs::read(aspirin.join(REPORT_FILENAME)).unwrap();
    assert_eq!(
        report_bytes,
        results[0].as_ref().unwrap().report.to_canonical_json_bytes().unwrap()
    );
    let route = std::fs::read_to_string(aspirin.join(ROUTE_FILENAME)).unwrap();
    assert!(route.starts_with("route aspirin (CC(=O)Oc1ccccc1C(=O)O): 2 step(s)"), "{route}");

    let summary_json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(aspirin.join(SUMMARY_FILENAME)).unwrap()).unwrap();
    assert_eq!(summary_json["solved"], true);
    assert_eq!(summary_json["route_steps"], 2);
    assert_eq!(
        summary_json["report_digest"],
        results[0].as_ref().unwrap().report_digest.as_str()
    );

    let dead_route =
        std::fs::read_to_string(out.path().join("decanoic_acid").join(ROUTE_FILENAME)).unwrap();
    assert!(dead_route.starts_with("no route for decanoic_acid"), "{dead_route}");
    assert!(dead_route.contains("no_open_nodes"), "{dead_route}");

    let batch: serde_json::Value =
        serde_json::from_slice(&std::fs::read(out.path().join(BATCH_SUMMARY_FILENAME)).unwrap())
            .unwrap();
    assert_eq!(batch["targets"], 5);
    assert_eq!(batch["solved"], 4);
    assert_eq!(batch["failed"], 0);
}

#[test]
fn rewriting_artifacts_is_byte_identical() {
    let fixture = demo_fixture();
    let collaborators = FixtureCollaborators::from_fixture(&fixture);
    let set = fixture.terminal_set();
    let targets = &fixture.targets[..1];
    let out = tempfile::tempdir().unwrap();

    let mut digests = Vec::new();
    for _ in 0..2 {
        let results = plan_batch(
            targets,
            &set,
            &PlannerConfig::default(),
            collaborators.as_collaborators(),
            None,
        );
        let written = write_target_artifacts(out.path(), results[0].as_ref().unwrap()).unwrap();
        digests.push(written.into_iter().map(|a| a.digest).collect::<Vec<_>>());
    }
    assert_eq!(digests[0], digests[1]);
}
