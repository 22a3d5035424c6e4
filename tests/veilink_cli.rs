use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

fn write_valid_config(dir: &Path, file_name: &str) -> PathBuf {
    let config_path = dir.join(file_name);
    fs::write(
        &config_path,
        format!(
            r#"
name = "veilink-cli-test"
env = "dev"
pid = "{pid}"
secret = "0123456789abcdef0123456789abcdef"

[bind.http]
ip = "127.0.0.1"
port = 39999

[observability]
filter_level = "info"

[observability.log]
output = "console"
"#,
            pid = dir.join("veilink.pid").display()
        ),
    )
    .expect("write valid config");

    config_path
}

fn write_warning_only_config(dir: &Path, file_name: &str) -> PathBuf {
    let config_path = dir.join(file_name);
    fs::write(
        &config_path,
        r#"
name = "veilink-cli-warning"
env = "prod"
secret = "short"

[bind.http]
ip = "127.0.0.1"
port = 39998
"#,
    )
    .expect("write warning-only config");

    config_path
}

fn write_validation_error_config(dir: &Path, file_name: &str) -> PathBuf {
    let config_path = dir.join(file_name);
    fs::write(
        &config_path,
        r#"
name = "veilink-cli-invalid"
env = "staging"
secret = "0123456789abcdef0123456789abcdef"

[bind.http]
ip = "not-an-ip"
port = 39997
"#,
    )
    .expect("write validation error config");

    config_path
}

fn write_unset_secret_config(dir: &Path, file_name: &str) -> PathBuf {
    let config_path = dir.join(file_name);
    fs::write(
        &config_path,
        format!(
            r#"
name = "veilink-cli-no-secret"
env = "test"
pid = "{pid}"
secret_env = "VEILINK_CLI_TEST_UNSET_SECRET"

[bind.http]
ip = "127.0.0.1"
port = 0
"#,
            pid = dir.join("veilink.pid").display()
        ),
    )
    .expect("write unset secret config");

    config_path
}

fn run_veilink(args: &[&str], current_dir: Option<&Path>) -> Output {
    let mut cmd = Command::new(PathBuf::from(env!("CARGO_BIN_EXE_veilink")));
    cmd.args(args)
        .env_remove("SECRET")
        .env_remove("PORT")
        .env_remove("VEILINK_CLI_TEST_UNSET_SECRET")
        .env_remove("RUST_LOG");
    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }
    cmd.output().expect("run veilink command")
}

#[test]
fn veilink_test_command_accepts_explicit_valid_config() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_valid_config(temp.path(), "valid.toml");
    let output = run_veilink(&["test", config_path.to_str().expect("utf8 path")], None);

    assert!(
        output.status.success(),
        "command should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn veilink_test_command_finds_default_config_in_current_directory() {
    let temp = tempfile::tempdir().expect("temp dir");
    write_valid_config(temp.path(), "config.toml");
    let output = run_veilink(&["test"], Some(temp.path()));

    assert!(
        output.status.success(),
        "command should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn veilink_test_command_accepts_warning_only_config() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_warning_only_config(temp.path(), "warning.toml");
    let output = run_veilink(&["test", config_path.to_str().expect("utf8 path")], None);

    assert!(
        output.status.success(),
        "warnings alone should not fail, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn veilink_test_command_rejects_validation_errors() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_validation_error_config(temp.path(), "invalid.toml");
    let output = run_veilink(&["test", config_path.to_str().expect("utf8 path")], None);

    assert!(!output.status.success(), "command should fail");
}

#[test]
fn veilink_test_command_fails_for_missing_custom_config_path() {
    let temp = tempfile::tempdir().expect("temp dir");
    let missing_path = temp.path().join("missing.toml");
    let output = run_veilink(&["test", missing_path.to_str().expect("utf8 path")], None);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "command should fail");
    assert!(
        stderr.contains("Config file not found"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn veilink_test_command_fails_when_no_default_config_exists() {
    let temp = tempfile::tempdir().expect("temp dir");
    let output = run_veilink(&["test"], Some(temp.path()));
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "command should fail");
    assert!(
        stderr.contains("No configuration file found"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn veilink_keygen_prints_hex_secret() {
    let output = run_veilink(&["keygen"], None);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let secret = stdout.trim();
    assert_eq!(secret.len(), 64, "unexpected secret: {secret}");
    assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));

    let second = run_veilink(&["keygen"], None);
    assert_ne!(String::from_utf8_lossy(&second.stdout).trim(), secret);
}

#[test]
fn veilink_refuses_to_start_without_secret() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_unset_secret_config(temp.path(), "no-secret.toml");
    let output = run_veilink(
        &["--config", config_path.to_str().expect("utf8 path")],
        Some(temp.path()),
    );
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "startup should fail without secret");
    assert!(
        stderr.contains("VEILINK_CLI_TEST_UNSET_SECRET"),
        "expected the missing variable in stderr, got: {stderr}"
    );
}
