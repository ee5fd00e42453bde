// Regression tests: the CLI lists units and renders findings as miette diagnostics.
// Requires: assert_cmd, predicates crates in [dev-dependencies]

mod common;

use assert_cmd::Command;
use common::{TempDir, TempFile};
use predicates::{prelude::PredicateBooleanExt, str::contains};

#[test]
fn cli_reports_miette_diagnostics_on_unclosed_unit() {
    let bad_file = TempFile::new("cli_unclosed.md", "A stick. {{melee|1\n");

    let mut cmd = Command::cargo_bin("shorthand").unwrap();
    cmd.arg("check").arg(&bad_file.path);
    cmd.assert()
        .failure()
        .stderr(contains("shorthand::open_shorthand").and(contains("help:")));
}

#[test]
fn cli_reports_malformed_argument_lists() {
    let bad_file = TempFile::new("cli_malformed.md", "{{melee|defense=-1|+1}}\n");

    let mut cmd = Command::cargo_bin("shorthand").unwrap();
    cmd.arg("check").arg(&bad_file.path);
    cmd.assert()
        .failure()
        .stderr(contains("shorthand::binding"))
        .stdout(contains("1 finding(s)"));
}

#[test]
fn cli_check_passes_clean_files() {
    let file = TempFile::new("cli_clean.md", "A stick. {{wood}} {{melee||+1|defense=-1}}\n");

    let mut cmd = Command::cargo_bin("shorthand").unwrap();
    cmd.arg("check").arg(&file.path);
    cmd.assert()
        .success()
        .stdout(contains("2 unit(s) in 1 file(s), 0 finding(s)"));
}

#[test]
fn cli_scan_lists_units() {
    let file = TempFile::new("cli_scan.md", "A stick. {{wood}}\n{{melee||+1|defense=-1}}\n");

    let mut cmd = Command::cargo_bin("shorthand").unwrap();
    cmd.arg("scan").arg(&file.path);
    cmd.assert().success().stdout(
        contains(":1:10")
            .and(contains("wood"))
            .and(contains(":2:1"))
            .and(contains(r#""", "+1", defense="-1""#)),
    );
}

#[test]
fn cli_scan_walks_directories_by_extension() {
    let dir = TempDir::new("cli_scan_dir");
    dir.write("notes.md", "{{alpha}}\n");
    dir.write("notes.txt", "{{beta}}\n");

    let mut cmd = Command::cargo_bin("shorthand").unwrap();
    cmd.arg("scan").arg(&dir.path).arg("--ext").arg("md");
    cmd.assert()
        .success()
        .stdout(contains("alpha").and(contains("beta").not()));
}

#[test]
fn cli_uses_grammar_from_config() {
    let config = TempFile::new("cli_config.yaml", "grammar:\n  lead_in: \"[[\"\n  lead_out: \"]]\"\n");
    let file = TempFile::new("cli_config_input.md", "[[gamma|x]] {{delta}}\n");

    let mut cmd = Command::cargo_bin("shorthand").unwrap();
    cmd.arg("scan").arg(&file.path).arg("--config").arg(&config.path);
    cmd.assert()
        .success()
        .stdout(contains("gamma").and(contains("delta").not()));
}

#[test]
fn cli_rejects_invalid_config() {
    let config = TempFile::new("cli_bad_config.yaml", "grammar:\n  separator: \"=\"\n");
    let file = TempFile::new("cli_bad_config_input.md", "{{a}}\n");

    let mut cmd = Command::cargo_bin("shorthand").unwrap();
    cmd.arg("scan").arg(&file.path).arg("--config").arg(&config.path);
    cmd.assert().failure().stderr(contains("shorthand::config"));
}
