mod common;
mod utils;

use anyhow::Result;
use common::TestEnvironment;

#[test]
fn test_voices_lists_every_preset() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_slidecast(&env, &["voices"])?;
    assert_eq!(output.exit_code, 0, "voices failed: {}", output.stderr);
    for name in ["zh-female", "zh-male", "en-female", "en-male"] {
        assert!(output.stdout.contains(name), "missing {name}: {}", output.stdout);
    }
    assert!(output.stdout.contains("中文女"));

    Ok(())
}

#[test]
fn test_voices_json_output() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_slidecast(&env, &["--output-format", "json", "voices"])?;
    assert_eq!(output.exit_code, 0, "voices failed: {}", output.stderr);

    let event: serde_json::Value = serde_json::from_str(output.stdout.trim())?;
    assert_eq!(event["code"], "voices.list");
    assert_eq!(event["data"].as_array().map(|v| v.len()), Some(4));

    Ok(())
}

#[test]
fn test_config_init_show_and_validate() -> Result<()> {
    let env = TestEnvironment::new()?;

    let output = utils::run_with_config(&env, &["config", "init", "--preset", "english"])?;
    assert_eq!(output.exit_code, 0, "init failed: {}", output.stderr);
    assert!(env.config_path().exists());

    let output = utils::run_with_config(&env, &["config", "show"])?;
    assert_eq!(output.exit_code, 0, "show failed: {}", output.stderr);
    assert!(output.stdout.contains("transcript_language = \"en-US\""));

    let output = utils::run_with_config(&env, &["config", "validate"])?;
    assert_eq!(output.exit_code, 0, "validate failed: {}", output.stderr);
    assert!(output.stdout.contains("is valid"));

    // A second init must not clobber the file
    let output = utils::run_with_config(&env, &["config", "init"])?;
    assert_ne!(output.exit_code, 0);
    assert!(output.stderr.contains("--force"));

    Ok(())
}

#[test]
fn test_invalid_config_reports_every_problem() -> Result<()> {
    let env = TestEnvironment::new()?;
    env.write_file("config.toml", "ppt_dpi = 10\nvideo_fps = 120\nbatch_size = 5\n")?;

    let output = utils::run_with_config(&env, &["config", "validate"])?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("ppt_dpi"), "stderr: {}", output.stderr);
    assert!(output.stderr.contains("video_fps"), "stderr: {}", output.stderr);
    assert!(!output.stderr.contains("batch_size"));

    Ok(())
}

#[test]
fn test_voice_clone_requires_reference_flags() -> Result<()> {
    let env = TestEnvironment::new()?;
    let deck = env.write_pptx("talk.pptx", &[Some("Intro")])?;

    let output = utils::run_slidecast(
        &env,
        &["render", deck.to_str().unwrap(), "--voice-clone", "--reference-text", "hi"],
    )?;
    assert_eq!(output.exit_code, 2, "expected a usage error: {}", output.stderr);
    assert!(output.stderr.contains("--reference-audio"));

    Ok(())
}

#[test]
fn test_inspect_reports_titles() -> Result<()> {
    let env = TestEnvironment::new()?;
    let deck = env.write_pptx("talk.pptx", &[Some("Welcome"), None, Some("Thanks")])?;

    let output = utils::run_slidecast(&env, &["inspect", deck.to_str().unwrap()])?;
    assert_eq!(output.exit_code, 0, "inspect failed: {}", output.stderr);
    assert!(output.stdout.contains("3 slides"));
    assert!(output.stdout.contains("Welcome"));
    assert!(output.stdout.contains("(no title)"));

    let output = utils::run_slidecast(
        &env,
        &["--output-format", "json", "inspect", deck.to_str().unwrap()],
    )?;
    let event: serde_json::Value = serde_json::from_str(output.stdout.trim())?;
    assert_eq!(event["data"]["slide_count"], 3);
    assert_eq!(event["data"]["format"], "pptx");

    Ok(())
}

#[test]
fn test_render_missing_deck_fails_cleanly() -> Result<()> {
    let env = TestEnvironment::new()?;
    let output = utils::run_with_config(&env, &["config", "init"])?;
    assert_eq!(output.exit_code, 0, "init failed: {}", output.stderr);

    let output = utils::run_with_config(&env, &["render", "missing.pptx"])?;
    assert_eq!(output.exit_code, 1);
    assert!(output.stderr.contains("missing.pptx"), "stderr: {}", output.stderr);

    Ok(())
}
