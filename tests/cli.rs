use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::{contains, is_empty};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

const DEFAULT_FIRST_MODEL: &str = "models/gemini-1.5-pro";

fn tsask_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tsask"));
    scrub_env(&mut cmd);
    cmd
}

fn tubestrat_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("tubestrat"));
    scrub_env(&mut cmd);
    cmd
}

fn scrub_env(cmd: &mut Command) {
    cmd.env_remove("TS_MODEL")
        .env_remove("TS_MODELS")
        .env_remove("TS_ATTEMPTS")
        .env_remove("TS_BACKOFF")
        .env_remove("TS_TIMEOUT")
        .env_remove("TS_TEMPERATURE")
        .env_remove("TS_MAX_TOKENS")
        .env_remove("TS_OUTPUT")
        .env_remove("TS_CONFIG")
        .env_remove("GEMINI_API_KEY")
        .env_remove("YOUTUBE_API_KEY");
}

fn unique_temp_path(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("tubestrat-test-{label}-{nanos}"))
}

fn parse_stdout_json(output: &[u8]) -> Value {
    let text = String::from_utf8(output.to_vec()).expect("stdout should be utf-8");
    serde_json::from_str(text.trim()).expect("stdout should contain valid JSON")
}

fn write_fake_png(label: &str) -> PathBuf {
    let path = unique_temp_path(label).with_extension("png");
    let bytes = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    fs::write(&path, bytes).expect("png fixture should be writable");
    path
}

#[test]
fn dry_run_succeeds_without_api_key() {
    let assert = tsask_cmd().args(["--dry-run", "2+2?"]).assert().success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["dry_run"], Value::Bool(true));
    assert_eq!(body["model"], Value::String(DEFAULT_FIRST_MODEL.to_string()));
    assert_eq!(
        body["candidates"],
        serde_json::json!([
            "models/gemini-1.5-pro",
            "models/gemini-1.5-flash",
            "models/gemini-2.0-flash"
        ])
    );
}

#[test]
fn dry_run_show_usage_prints_unavailable() {
    tsask_cmd()
        .args(["--dry-run", "--show-usage", "2+2?"])
        .assert()
        .success()
        .stderr(contains("usage: unavailable latency_ms=0 (dry-run)"));
}

#[test]
fn persona_preamble_is_prepended_by_default() {
    let assert = tsask_cmd().args(["--dry-run", "2+2?"]).assert().success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["persona"], Value::Bool(true));
    let text = body["request"]["contents"][0]["parts"][0]["text"]
        .as_str()
        .expect("request should carry prompt text");
    assert!(text.starts_with("You are a Senior YouTube Strategist"));
    assert!(text.ends_with("2+2?"));
}

#[test]
fn no_persona_sends_the_raw_prompt() {
    let assert = tsask_cmd()
        .args(["--dry-run", "--no-persona", "argument prompt"])
        .write_stdin("stdin prompt")
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["persona"], Value::Bool(false));
    assert_eq!(
        body["request"]["contents"][0]["parts"][0]["text"],
        Value::String("argument prompt".to_string())
    );
}

#[test]
fn missing_prompt_returns_explicit_error() {
    tsask_cmd()
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(contains("No prompt provided. Pass PROMPT or pipe it on stdin."));
}

#[test]
fn pinned_model_skips_candidate_selection() {
    let assert = tsask_cmd()
        .args(["--model", "models/gemini-1.5-flash", "--dry-run", "hello"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(
        body["model"],
        Value::String("models/gemini-1.5-flash".to_string())
    );
    assert_eq!(
        body["candidates"],
        serde_json::json!(["models/gemini-1.5-flash"])
    );
}

#[test]
fn models_env_overrides_the_default_roster() {
    let assert = tsask_cmd()
        .env("TS_MODELS", "models/a, models/b")
        .args(["--dry-run", "hello"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["candidates"], serde_json::json!(["models/a", "models/b"]));
}

#[test]
fn retry_policy_flags_are_reflected_in_dry_run() {
    let assert = tsask_cmd()
        .args(["--attempts", "2", "--backoff", "500", "--dry-run", "hello"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["retry"]["attempts_per_model"], Value::from(2));
    assert_eq!(body["retry"]["backoff_unit_ms"], Value::from(500));
}

#[test]
fn invalid_attempts_env_returns_error() {
    tsask_cmd()
        .env("TS_ATTEMPTS", "lots")
        .args(["--dry-run", "hello"])
        .assert()
        .failure()
        .stderr(contains("Invalid TS_ATTEMPTS 'lots'."));
}

#[test]
fn invalid_output_value_returns_error() {
    tsask_cmd()
        .args(["--output", "yaml", "--dry-run", "hello"])
        .assert()
        .failure()
        .stderr(contains("Invalid output 'yaml'. Supported values: text, json."));
}

#[test]
fn json_flag_sets_json_output_mode() {
    let assert = tsask_cmd()
        .args(["--dry-run", "--json", "hello"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["output"], Value::String("json".to_string()));
}

#[test]
fn json_flag_overrides_output_text() {
    let assert = tsask_cmd()
        .args(["--dry-run", "--output", "text", "--json", "hello"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["output"], Value::String("json".to_string()));
}

#[test]
fn profile_loads_model_roster_for_dry_run() {
    let config_path = unique_temp_path("config");
    fs::write(
        &config_path,
        "[profiles.fw]\nmodels = [\"models/profile-a\", \"models/profile-b\"]\n",
    )
    .expect("config should be writable");

    let assert = tsask_cmd()
        .env("TS_CONFIG", &config_path)
        .args(["--profile", "fw", "--dry-run", "hello"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(
        body["candidates"],
        serde_json::json!(["models/profile-a", "models/profile-b"])
    );
}

#[test]
fn profile_is_not_implicit_when_not_passed() {
    let config_path = unique_temp_path("config-no-implicit");
    fs::write(
        &config_path,
        "[profiles.default]\nmodel = \"models/from-profile\"\n",
    )
    .expect("config should be writable");

    let assert = tsask_cmd()
        .env("TS_CONFIG", &config_path)
        .args(["--dry-run", "hello"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["model"], Value::String(DEFAULT_FIRST_MODEL.to_string()));
}

#[test]
fn profile_file_missing_returns_explicit_error() {
    let config_path = unique_temp_path("missing-config");

    tsask_cmd()
        .env("TS_CONFIG", &config_path)
        .args(["--profile", "fw", "hello"])
        .assert()
        .failure()
        .stderr(contains("Failed to read config file"));
}

#[test]
fn invalid_profile_toml_returns_parse_error() {
    let config_path = unique_temp_path("invalid-toml");
    fs::write(&config_path, "[profiles.bad\nmodel = \"m\"").expect("config should be writable");

    tsask_cmd()
        .env("TS_CONFIG", &config_path)
        .args(["--profile", "bad", "hello"])
        .assert()
        .failure()
        .stderr(contains("Failed to parse config file"));
}

#[test]
fn profile_not_found_returns_error() {
    let config_path = unique_temp_path("profile-not-found");
    fs::write(&config_path, "[profiles.fw]\nmodel = \"m\"\n")
        .expect("config should be writable");

    tsask_cmd()
        .env("TS_CONFIG", &config_path)
        .args(["--profile", "missing", "hello"])
        .assert()
        .failure()
        .stderr(contains("Profile 'missing' not found"));
}

#[test]
fn invalid_profile_output_returns_error() {
    let config_path = unique_temp_path("invalid-output");
    fs::write(
        &config_path,
        "[profiles.bad]\nmodel = \"m\"\noutput = \"yaml\"\n",
    )
    .expect("config should be writable");

    tsask_cmd()
        .env("TS_CONFIG", &config_path)
        .args(["--profile", "bad", "hello"])
        .assert()
        .failure()
        .stderr(contains("Invalid profile output 'yaml'"));
}

#[test]
fn profile_env_and_cli_precedence_is_respected() {
    let config_path = unique_temp_path("precedence");
    fs::write(
        &config_path,
        "[profiles.fw]\nmodel = \"models/profile-model\"\n",
    )
    .expect("config should be writable");

    let assert = tsask_cmd()
        .env("TS_CONFIG", &config_path)
        .env("TS_MODEL", "models/env-model")
        .args([
            "--profile",
            "fw",
            "--model",
            "models/cli-model",
            "--dry-run",
            "hello",
        ])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["model"], Value::String("models/cli-model".to_string()));

    let env_over_profile = tsask_cmd()
        .env("TS_CONFIG", &config_path)
        .env("TS_MODEL", "models/env-model")
        .args(["--profile", "fw", "--dry-run", "hello"])
        .assert()
        .success();

    let body = parse_stdout_json(&env_over_profile.get_output().stdout);
    assert_eq!(body["model"], Value::String("models/env-model".to_string()));
}

#[test]
fn precedence_for_temperature_timeout_and_output_is_respected() {
    let config_path = unique_temp_path("precedence-more-options");
    fs::write(
        &config_path,
        "[profiles.fw]\ntemperature = 0.25\ntimeout = 7\noutput = \"json\"\n",
    )
    .expect("config should be writable");

    let env_over_profile = tsask_cmd()
        .env("TS_CONFIG", &config_path)
        .env("TS_TEMPERATURE", "0.5")
        .env("TS_TIMEOUT", "21")
        .args(["--profile", "fw", "--dry-run", "hello"])
        .assert()
        .success();

    let env_body = parse_stdout_json(&env_over_profile.get_output().stdout);
    assert_eq!(
        env_body["request"]["generationConfig"]["temperature"],
        serde_json::json!(0.5)
    );
    assert_eq!(env_body["timeout_secs"], Value::from(21));
    assert_eq!(env_body["output"], Value::String("json".to_string()));

    let cli_over_env = tsask_cmd()
        .env("TS_CONFIG", &config_path)
        .env("TS_TEMPERATURE", "0.5")
        .env("TS_TIMEOUT", "21")
        .args([
            "--profile",
            "fw",
            "--dry-run",
            "--temperature",
            "1.5",
            "--timeout",
            "33",
            "--output",
            "text",
            "hello",
        ])
        .assert()
        .success();

    let cli_body = parse_stdout_json(&cli_over_env.get_output().stdout);
    assert_eq!(
        cli_body["request"]["generationConfig"]["temperature"],
        serde_json::json!(1.5)
    );
    assert_eq!(cli_body["timeout_secs"], Value::from(33));
    assert_eq!(cli_body["output"], Value::String("text".to_string()));
}

#[test]
fn long_prompt_with_max_tokens_is_reflected_in_dry_run_request() {
    let prompt = "x".repeat(24_000);

    let assert = tsask_cmd()
        .args(["--dry-run", "--no-persona", "--max-tokens", "128"])
        .write_stdin(prompt.clone())
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(
        body["request"]["contents"][0]["parts"][0]["text"],
        Value::String(prompt)
    );
    assert_eq!(
        body["request"]["generationConfig"]["maxOutputTokens"],
        Value::from(128)
    );
}

#[test]
fn save_writes_and_overwrites_output_file() {
    let output_path = unique_temp_path("save-output");

    tsask_cmd()
        .args([
            "--dry-run",
            "--no-persona",
            "--save",
            output_path.to_string_lossy().as_ref(),
            "first",
        ])
        .assert()
        .success();

    let first = fs::read_to_string(&output_path).expect("first output file should exist");
    assert!(first.contains("\"text\":\"first\""));

    tsask_cmd()
        .args([
            "--dry-run",
            "--no-persona",
            "--save",
            output_path.to_string_lossy().as_ref(),
            "second",
        ])
        .assert()
        .success();

    let second = fs::read_to_string(&output_path).expect("second output file should exist");
    assert!(second.contains("\"text\":\"second\""));
    assert!(!second.contains("\"text\":\"first\""));
}

#[test]
fn save_with_invalid_parent_path_returns_explicit_error() {
    let parent_file = unique_temp_path("save-invalid-parent");
    fs::write(&parent_file, "not a directory").expect("parent marker file should be writable");
    let output_path = parent_file.join("out.json");

    tsask_cmd()
        .args([
            "--dry-run",
            "--save",
            output_path.to_string_lossy().as_ref(),
            "hello",
        ])
        .assert()
        .failure()
        .stderr(contains("Failed to create output directory"));
}

#[test]
fn verbose_does_not_leak_api_key() {
    let secret = "gemini-secret-value";

    tsask_cmd()
        .env("GEMINI_API_KEY", secret)
        .args(["--dry-run", "--verbose", "hello"])
        .assert()
        .success()
        .stderr(contains("api_key_present=true").and(contains(secret).not()));
}

#[test]
fn quiet_suppresses_show_usage_on_stderr() {
    tsask_cmd()
        .args(["--dry-run", "--show-usage", "--quiet", "hello"])
        .assert()
        .success()
        .stderr(is_empty());
}

#[test]
fn quiet_suppresses_verbose_logs_on_stderr() {
    tsask_cmd()
        .args(["--dry-run", "--verbose", "--quiet", "hello"])
        .assert()
        .success()
        .stderr(is_empty());
}

#[test]
fn quiet_keeps_fatal_errors_visible() {
    tsask_cmd()
        .args(["--quiet"])
        .assert()
        .failure()
        .stderr(contains("No prompt provided. Pass PROMPT or pipe it on stdin."));
}

#[test]
fn version_prints_build_metadata() {
    tsask_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("commit:").and(contains("built:")));
}

#[test]
fn tubestrat_ask_dry_run_matches_tsask_output_shape() {
    let assert = tubestrat_cmd()
        .args(["ask", "--dry-run", "hello"])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(body["model"], Value::String(DEFAULT_FIRST_MODEL.to_string()));
    assert_eq!(body["output"], Value::String("text".to_string()));
}

#[test]
fn tubestrat_ask_version_prints_metadata() {
    tubestrat_cmd()
        .args(["ask", "--version"])
        .assert()
        .success()
        .stdout(contains("commit:").and(contains("built:")));
}

#[test]
fn tubestrat_ask_quiet_keeps_fatal_errors_visible() {
    tubestrat_cmd()
        .args(["ask", "--quiet"])
        .assert()
        .failure()
        .stderr(contains("No prompt provided. Pass PROMPT or pipe it on stdin."));
}

#[test]
fn tubestrat_ask_help_includes_examples() {
    tubestrat_cmd()
        .args(["ask", "--help"])
        .assert()
        .success()
        .stdout(contains("Examples:").and(contains("--dry-run --json")));
}

#[test]
fn tubestrat_help_mentions_completion_command() {
    tubestrat_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("completion").and(contains("Generate shell completion script")));
}

#[test]
fn tubestrat_completion_bash_outputs_script() {
    tubestrat_cmd()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(contains("_tubestrat").and(contains("complete")));
}

#[test]
fn tubestrat_completion_fish_outputs_script() {
    tubestrat_cmd()
        .args(["completion", "fish"])
        .assert()
        .success()
        .stdout(contains("complete -c tubestrat"));
}

#[test]
fn audit_requires_a_url_or_image() {
    tubestrat_cmd()
        .arg("audit")
        .assert()
        .failure()
        .stderr(contains("Provide --url or --image."));
}

#[test]
fn audit_rejects_urls_without_a_video_id() {
    tubestrat_cmd()
        .args(["audit", "--url", "https://example.com", "--dry-run"])
        .assert()
        .failure()
        .stderr(contains("Could not find a video id"));
}

#[test]
fn audit_dry_run_records_the_thumbnail_source() {
    let assert = tubestrat_cmd()
        .args([
            "audit",
            "--url",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "--dry-run",
        ])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(
        body["image"],
        Value::String("https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg".to_string())
    );
    let text = body["request"]["contents"][0]["parts"][0]["text"]
        .as_str()
        .expect("scorecard prompt text");
    assert!(text.contains("Rate this thumbnail 0-10"));
}

#[test]
fn audit_dry_run_inlines_a_local_image() {
    let image_path = write_fake_png("audit-thumb");

    let assert = tubestrat_cmd()
        .args([
            "audit",
            "--image",
            image_path.to_string_lossy().as_ref(),
            "--dry-run",
        ])
        .assert()
        .success();

    let body = parse_stdout_json(&assert.get_output().stdout);
    assert_eq!(
        body["request"]["contents"][0]["parts"][1]["inlineData"]["mimeType"],
        Value::String("image/png".to_string())
    );
}

#[test]
fn audit_rejects_unrecognized_image_bytes() {
    let image_path = unique_temp_path("audit-junk").with_extension("bin");
    fs::write(&image_path, [1, 2, 3, 4]).expect("junk fixture should be writable");

    tubestrat_cmd()
        .args([
            "audit",
            "--image",
            image_path.to_string_lossy().as_ref(),
            "--dry-run",
        ])
        .assert()
        .failure()
        .stderr(contains("Unrecognized image format."));
}

#[test]
fn channel_requires_youtube_api_key() {
    tubestrat_cmd()
        .args(["channel", "SomeChannel"])
        .assert()
        .failure()
        .stderr(contains("YOUTUBE_API_KEY is not set in the environment."));
}

#[test]
fn channel_requires_at_least_one_handle() {
    tubestrat_cmd().arg("channel").assert().failure();
}

#[test]
fn engage_rejects_urls_without_a_video_id() {
    tubestrat_cmd()
        .args(["engage", "https://example.com"])
        .assert()
        .failure()
        .stderr(contains("Could not find a video id"));
}

#[test]
fn config_check_reports_valid_file() {
    let config_path = unique_temp_path("config-check");
    fs::write(&config_path, "[profiles.fw]\nmodel = \"m\"\n")
        .expect("config should be writable");

    tubestrat_cmd()
        .env("TS_CONFIG", &config_path)
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(contains("config OK:"));
}

#[test]
fn config_check_rejects_invalid_profile_output() {
    let config_path = unique_temp_path("config-check-bad");
    fs::write(
        &config_path,
        "[profiles.bad]\noutput = \"yaml\"\n",
    )
    .expect("config should be writable");

    tubestrat_cmd()
        .env("TS_CONFIG", &config_path)
        .args(["config", "check", "--profile", "bad"])
        .assert()
        .failure()
        .stderr(contains("Invalid profile output 'yaml'"));
}
