//! `starnav` binary integration tests.
//!
//! ## Exit Codes
//! - 0: script replayed, no stack mismatch
//! - 1: usage, config or script error
//! - 2: at least one stack mismatch

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::Path;

use anyhow::Result;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::Value as JsonValue;
use tempfile::TempDir;

/// starnav command isolated from any user config and STARNAV_ env
fn starnav(home: &Path) -> Result<assert_cmd::Command> {
    let mut cmd = assert_cmd::Command::cargo_bin("starnav")?;
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("RUST_LOG", "warn")
        .env_remove("STARNAV_ENGINE__HISTORY_CAPACITY")
        .env_remove("STARNAV_TOOLS__FLIGHT_ENTRY")
        .env_remove("STARNAV_TOOLS__STRIP_PREFIXES")
        .current_dir(home);
    Ok(cmd)
}

const FULL_FLIGHT: &str = "\
# outer flight
start research_flight_config
mcp__starlog__check
mcp__starlog__orient
mcp__starlog__start_starlog
start debug_flight_config
mcp__starship__fly
exit
mcp__starlog__end_starlog
exit
";

#[test]
fn replay_full_flight_succeeds() -> Result<()> {
    let home = TempDir::new()?;
    let script = home.path().join("flight.nav");
    fs::write(&script, FULL_FLIGHT)?;

    starnav(home.path())?
        .arg("replay")
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("deny").not())
        .stdout(predicate::str::contains(
            "9 allowed, 0 denied, 0 stack mismatch(es), final depth 0",
        ));
    Ok(())
}

#[test]
fn replay_reports_denials_from_stdin() -> Result<()> {
    let home = TempDir::new()?;
    starnav(home.path())?
        .args(["replay", "-"])
        .write_stdin("start\ncheck\nstart_starlog\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("deny   wrong_step"));
    Ok(())
}

#[test]
fn stack_mismatch_exits_2() -> Result<()> {
    let home = TempDir::new()?;
    starnav(home.path())?
        .args(["replay", "-"])
        .write_stdin("start\nstart\nexit 1\n")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("stack_mismatch"));
    Ok(())
}

#[test]
fn json_output_is_line_delimited() -> Result<()> {
    let home = TempDir::new()?;
    let output = starnav(home.path())?
        .args(["replay", "--json", "-"])
        .write_stdin("start\ncheck\norient\nstart_starlog\nend_starlog\n")
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    let values: Vec<JsonValue> = stdout
        .lines()
        .map(serde_json::from_str::<JsonValue>)
        .collect::<Result<_, _>>()?;
    assert_eq!(values.len(), 6);
    assert_eq!(values[4]["decision"]["reason"], "no_work_recorded");
    assert_eq!(values[5]["stack_mismatches"], 0);
    assert_eq!(values[5]["snapshot"]["depth"], 1);
    Ok(())
}

#[test]
fn bad_script_line_fails_with_line_number() -> Result<()> {
    let home = TempDir::new()?;
    starnav(home.path())?
        .args(["replay", "-"])
        .write_stdin("start\nexit top\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("line 2"));
    Ok(())
}

#[test]
fn flight_config_without_suffix_is_rejected() -> Result<()> {
    let home = TempDir::new()?;
    starnav(home.path())?
        .args(["replay", "-"])
        .write_stdin("start research\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("line 1"))
        .stderr(predicate::str::contains("must end with `_flight_config`"));
    Ok(())
}

#[test]
fn config_file_changes_tool_resolution() -> Result<()> {
    let home = TempDir::new()?;
    let config = home.path().join("nav.toml");
    fs::write(
        &config,
        "[tools]\nstrip_prefixes = [\"nav__\"]\nflight_entry = [\"launch\"]\n",
    )?;

    starnav(home.path())?
        .args(["replay", "--config"])
        .arg(&config)
        .arg("-")
        .write_stdin("launch\nnav__check\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 allowed, 0 denied"));
    Ok(())
}

#[test]
fn config_prints_effective_toml() -> Result<()> {
    let home = TempDir::new()?;
    fs::write(
        home.path().join("starnav.toml"),
        "[engine]\nhistory_capacity = 32\n",
    )?;

    let output = starnav(home.path())?.arg("config").output()?;
    assert!(output.status.success());
    let rendered: toml::Value = toml::from_str(&String::from_utf8(output.stdout)?)?;
    assert_eq!(rendered["engine"]["history_capacity"].as_integer(), Some(32));
    assert_eq!(
        rendered["engine"]["retired_session_capacity"].as_integer(),
        Some(64)
    );
    assert_eq!(rendered["logging"]["filter"].as_str(), Some("info"));
    Ok(())
}

#[test]
fn invalid_config_is_rejected() -> Result<()> {
    let home = TempDir::new()?;
    let config = home.path().join("nav.toml");
    fs::write(&config, "[tools]\nflight_entry = [\"fly\"]\n")?;

    starnav(home.path())?
        .args(["config", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("shadows a gated operation"));
    Ok(())
}
