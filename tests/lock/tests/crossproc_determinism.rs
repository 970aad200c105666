//! Cross-process determinism: the `search_fixture` binary prints identical
//! digests regardless of working directory, locale, environment or
//! worker count.

use std::process::Command;

use lock_tests::scenario::demo_fixture_path;

/// `cargo test` puts test binaries in `target/<profile>/deps/`; the
/// `search_fixture` binary lives one level up.
fn binary_path() -> String {
    let mut path = std::env::current_exe()
        .expect("can resolve test binary path")
        .parent()
        .expect("binary dir exists")
        .parent()
        .expect("deps parent exists")
        .to_path_buf();
    path.push("search_fixture");
    path.to_string_lossy().to_string()
}

fn run_variant(work_dir: &str, env_overrides: &[(&str, &str)], parallelism: &str) -> String {
    let fixture = demo_fixture_path();
    let mut command = Command::new(binary_path());
    command
        .arg(&fixture)
        .arg(parallelism)
        .current_dir(work_dir)
        .env_remove("LC_ALL")
        .env_remove("LC_COLLATE")
        .env_remove("LANG")
        .env_remove("LANGUAGE");
    for &(key, val) in env_overrides {
        command.env(key, val);
    }

    let output = command
        .output()
        .unwrap_or_else(|e| panic!("failed to run {}: {e}", binary_path()));
    assert!(
        output.status.success(),
        "search_fixture failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout is UTF-8")
}

#[test]
fn search_fixture_output_is_process_independent() {
    let tmp = std::env::temp_dir();
    let tmp = tmp.to_string_lossy();
    let baseline = run_variant(env!("CARGO_MANIFEST_DIR"), &[], "1");

    let variants = [
        run_variant(&tmp, &[], "1"),
        run_variant("/", &[("LC_ALL", "C")], "1"),
        run_variant(&tmp, &[("LANG", "tr_TR.UTF-8"), ("RUST_LOG", "trace")], "4"),
        run_variant(env!("CARGO_MANIFEST_DIR"), &[("TZ", "Asia/Tokyo")], "2"),
    ];
    for (i, output) in variants.iter().enumerate() {
        assert_eq!(&baseline, output, "variant {i} diverged from baseline");
    }
}

#[test]
fn search_fixture_output_shape() {
    let output = run_variant(env!("CARGO_MANIFEST_DIR"), &[], "1");
    let lines: Vec<&str> = output.lines().collect();
    assert!(lines[0].starts_with("fixture_digest=sha256:"), "{}", lines[0]);
    assert!(lines.last().unwrap().starts_with("summary_digest=sha256:"));
    let targets: Vec<&str> = lines.iter().filter(|l| l.starts_with("target=")).copied().collect();
    assert_eq!(targets.len(), 5);
    assert!(targets[0].starts_with("target=aspirin solved=true steps=2 termination=solved"));
    assert!(targets[4].contains("solved=false"));
    assert!(targets[4].contains("route_digest=none"));
}
