use anyhow::Result;
use std::process::Command;

use super::common::TestEnvironment;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Run the slidecast binary inside the test environment. Service credentials
/// are cleared so nothing can reach a real endpoint.
pub fn run_slidecast(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let output = Command::new(env!("CARGO_BIN_EXE_slidecast"))
        .args(args)
        .arg("--no-color")
        .current_dir(env.path())
        .env_remove("OPENAI_API_KEY")
        .env_remove("SPEECH_API_URL")
        .output()?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

/// `run_slidecast` with `--config <env>/config.toml` prepended.
pub fn run_with_config(env: &TestEnvironment, args: &[&str]) -> Result<CommandOutput> {
    let config = env.config_path();
    let config = config.to_string_lossy();
    let mut full = vec!["--config", config.as_ref()];
    full.extend_from_slice(args);
    run_slidecast(env, &full)
}
