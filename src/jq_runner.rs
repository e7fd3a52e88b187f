use crate::{
    config::{Config, API_KEY_ENV},
    executor::{Executor, ShellRunner},
    jq_generator::{ClaudeGenerator, CommandGenerator, GeneratedCommand, MockGenerator},
};
use anyhow::{anyhow, Result};
use std::io::Write;
use tracing::info;

/// Checks that an API key is available before any network call is made.
///
/// The error carries the setup guidance shown to the user.
pub fn ensure_api_key(config: &Config) -> Result<()> {
    if config.get_api_key().is_some() {
        return Ok(());
    }
    Err(anyhow!(
        "Error: {API_KEY_ENV} environment variable is not set\n\
         Please get your API key from your Anthropic dashboard\n\
         Then set it with: export {API_KEY_ENV}='your-api-key-here'"
    ))
}

/// Generates a jq command for a request and optionally runs it.
pub struct JqRunner<R: ShellRunner> {
    generator: Box<dyn CommandGenerator>,
    executor: Executor,
    shell: R,
}

impl<R: ShellRunner> JqRunner<R> {
    /// Picks the mock or the Claude-backed generator from `config`.
    ///
    /// Fails before building anything when no API key is configured.
    pub fn from_config(config: &Config, shell: R) -> Result<Self> {
        ensure_api_key(config)?;
        let generator: Box<dyn CommandGenerator> = if config.is_mock_mode() {
            Box::new(MockGenerator::new())
        } else {
            Box::new(ClaudeGenerator::from_config(config)?)
        };
        Ok(Self::new(generator, shell))
    }

    pub fn new(generator: Box<dyn CommandGenerator>, shell: R) -> Self {
        Self {
            generator,
            executor: Executor::new(),
            shell,
        }
    }

    pub async fn run<W1: Write, W2: Write>(
        &self,
        user_request: &str,
        execute: bool,
        stdout: &mut W1,
        stderr: &mut W2,
    ) -> Result<GeneratedCommand> {
        info!("Processing request: {}", user_request);

        let generated = self.generator.generate(user_request).await?;
        writeln!(stdout, "\n🤖 Generated JQ command: {}", generated.command)?;

        if execute {
            writeln!(stdout, "\n🔍 Executing command...")?;
            self.executor
                .execute(&generated.command, &self.shell, stdout, stderr)?;
        }

        Ok(generated)
    }
}
