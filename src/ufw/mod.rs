pub mod derive;
pub mod error;
pub mod parse;
pub mod rule;

use crate::Result;
use crate::ufw::error::UfwError;
use crate::ufw::rule::Rule;
use async_trait::async_trait;
use bon::Builder;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Printed by ufw when asked to delete a rule it does not have.
const NON_EXISTENT_RULE: &str = "Could not delete non-existent rule";

/// The host firewall as seen by the rule manager.
#[async_trait]
pub trait Firewall: Send + Sync + 'static {
    async fn add_rule(&self, rule: &Rule) -> Result<()>;

    /// Remove a rule. Removing a rule that is not installed succeeds.
    async fn remove_rule(&self, rule: &Rule) -> Result<()>;

    /// Every installed rule carrying an owner tag.
    async fn list_managed_rules(&self) -> Result<Vec<Rule>>;
}

/// Drives the `ufw` command line tool.
#[derive(Debug, Clone, Builder)]
pub struct UfwClient {
    #[builder(default = "ufw".to_string(), into)]
    program: String,
    #[builder(default = Duration::from_secs(30))]
    timeout: Duration,
}

impl UfwClient {
    async fn run(&self, args: &[String]) -> std::result::Result<String, UfwError> {
        let command = format!("{} {}", self.program, args.join(" "));
        debug!("Running {}", command);

        let output = timeout(
            self.timeout,
            Command::new(&self.program)
                .args(args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| UfwError::Timeout {
            command: command.clone(),
            duration: self.timeout,
        })?
        .map_err(|e| UfwError::execution(&self.program, e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        // ufw reports some failures on stderr with a zero exit code
        if !output.status.success() || !stderr.trim().is_empty() {
            return Err(UfwError::CommandFailed {
                command,
                exit_code: output.status.code(),
                stdout,
                stderr,
            });
        }

        Ok(stdout)
    }
}

#[async_trait]
impl Firewall for UfwClient {
    async fn add_rule(&self, rule: &Rule) -> Result<()> {
        self.run(&rule.add_args()).await?;
        Ok(())
    }

    async fn remove_rule(&self, rule: &Rule) -> Result<()> {
        match self.run(&rule.delete_args()).await {
            Ok(stdout) => {
                if stdout.contains(NON_EXISTENT_RULE) {
                    debug!("Rule already absent: {}", rule);
                }
                Ok(())
            }
            Err(e) if e.output().is_some_and(|out| out.contains(NON_EXISTENT_RULE)) => {
                debug!("Rule already absent: {}", rule);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_managed_rules(&self) -> Result<Vec<Rule>> {
        let stdout = self.run(&["show".to_string(), "added".to_string()]).await?;
        Ok(parse::parse_show_added(&stdout))
    }
}
