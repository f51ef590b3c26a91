//! Railway CLI driver (primary tier).

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, instrument};

use demoforge_shared::{DemoForgeError, Repository, Result};

use crate::platform::{DeployTarget, Environment, ProjectPlatform, ServiceApi, Variables};

/// Runs an external program and returns its stdout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String], env: &[(String, String)]) -> Result<String>;
}

/// [`CommandRunner`] backed by `tokio::process`.
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String], env: &[(String, String)]) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DemoForgeError::Deployment(format!("failed to spawn {program}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DemoForgeError::Deployment(format!(
                "{program} {} exited with {}: {}",
                args.first().map(String::as_str).unwrap_or_default(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

// ---------------------------------------------------------------------------
// RailwayCli
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct IdOutput {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DomainOutput {
    domain: String,
}

/// Drives the `railway` binary with `--json` output.
pub struct RailwayCli {
    runner: Arc<dyn CommandRunner>,
    bin: String,
    token: String,
}

impl RailwayCli {
    pub fn new(runner: Arc<dyn CommandRunner>, bin: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            runner,
            bin: bin.into(),
            token: token.into(),
        }
    }

    async fn railway(&self, args: Vec<String>) -> Result<String> {
        debug!(command = %args.join(" "), "running railway");
        let env = [("RAILWAY_TOKEN".to_string(), self.token.clone())];
        self.runner.run(&self.bin, &args, &env).await
    }

    async fn railway_json<T: serde::de::DeserializeOwned>(&self, args: Vec<String>) -> Result<T> {
        let stdout = self.railway(args).await?;
        serde_json::from_str(stdout.trim())
            .map_err(|e| DemoForgeError::parse(format!("railway output: {e}")))
    }
}

fn target_args(target: &DeployTarget) -> Vec<String> {
    vec![
        "--project".into(),
        target.project_id.clone(),
        "--environment".into(),
        target.environment_id.clone(),
        "--service".into(),
        target.service_id.clone(),
    ]
}

#[async_trait]
impl ServiceApi for RailwayCli {
    #[instrument(skip_all, fields(service_id = %target.service_id))]
    async fn set_variables(&self, target: &DeployTarget, variables: &Variables) -> Result<()> {
        let mut args = vec!["variables".to_string()];
        args.extend(target_args(target));
        for (key, value) in variables {
            args.push("--set".into());
            args.push(format!("{key}={value}"));
        }
        args.push("--skip-deploys".into());
        self.railway(args).await.map(|_| ())
    }

    #[instrument(skip_all, fields(service_id = %target.service_id))]
    async fn create_domain(&self, target: &DeployTarget) -> Result<String> {
        let mut args = vec!["domain".to_string()];
        args.extend(target_args(target));
        args.push("--json".into());
        let out: DomainOutput = self.railway_json(args).await?;
        Ok(out.domain)
    }
}

#[async_trait]
impl ProjectPlatform for RailwayCli {
    #[instrument(skip_all, fields(name = %name))]
    async fn create_project(&self, name: &str) -> Result<String> {
        let out: IdOutput = self
            .railway_json(vec![
                "init".into(),
                "--name".into(),
                name.into(),
                "--json".into(),
            ])
            .await?;
        Ok(out.id)
    }

    async fn list_environments(&self, project_id: &str) -> Result<Vec<Environment>> {
        let value: Value = self
            .railway_json(vec![
                "environment".into(),
                "list".into(),
                "--project".into(),
                project_id.into(),
                "--json".into(),
            ])
            .await?;

        // Either a bare array or `{"environments": [...]}`.
        let list = match value {
            Value::Object(mut map) => map.remove("environments").unwrap_or(Value::Null),
            other => other,
        };
        serde_json::from_value(list)
            .map_err(|e| DemoForgeError::parse(format!("railway environments: {e}")))
    }

    #[instrument(skip_all, fields(repo = %repository.full_name))]
    async fn create_service(
        &self,
        project_id: &str,
        environment_id: &str,
        repository: &Repository,
    ) -> Result<String> {
        let out: IdOutput = self
            .railway_json(vec![
                "add".into(),
                "--project".into(),
                project_id.into(),
                "--environment".into(),
                environment_id.into(),
                "--service".into(),
                repository.name.clone(),
                "--repo".into(),
                repository.full_name.clone(),
                "--json".into(),
            ])
            .await?;
        Ok(out.id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Answers by subcommand; records every invocation.
    #[derive(Default)]
    pub struct FakeRunner {
        pub responses: Vec<(&'static str, std::result::Result<&'static str, &'static str>)>,
        pub calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(&self, _program: &str, args: &[String], env: &[(String, String)]) -> Result<String> {
            assert!(env.iter().any(|(k, _)| k == "RAILWAY_TOKEN"));
            self.calls.lock().unwrap().push(args.to_vec());
            let sub = args.first().cloned().unwrap_or_default();
            match self.responses.iter().find(|(name, _)| *name == sub) {
                Some((_, Ok(out))) => Ok(out.to_string()),
                Some((_, Err(msg))) => Err(DemoForgeError::Deployment(msg.to_string())),
                None => Err(DemoForgeError::Deployment(format!("unexpected command {sub}"))),
            }
        }
    }

    fn target() -> DeployTarget {
        DeployTarget {
            project_id: "p1".into(),
            environment_id: "e1".into(),
            service_id: "s1".into(),
        }
    }

    #[tokio::test]
    async fn parses_json_outputs() {
        let runner = Arc::new(FakeRunner {
            responses: vec![
                ("init", Ok(r#"{"id":"p1","name":"glow-demo"}"#)),
                ("environment", Ok(r#"{"environments":[{"id":"e1","name":"production"}]}"#)),
                ("add", Ok(r#"{"id":"s1"}"#)),
                ("domain", Ok(r#"{"domain":"glow.up.railway.app"}"#)),
            ],
            ..Default::default()
        });
        let cli = RailwayCli::new(runner.clone(), "railway", "tok");

        assert_eq!(cli.create_project("glow-demo").await.unwrap(), "p1");
        let envs = cli.list_environments("p1").await.unwrap();
        assert_eq!(envs[0].name, "production");
        let repo = Repository {
            name: "glow-demo".into(),
            html_url: "https://github.com/acme/glow-demo".into(),
            clone_url: "https://github.com/acme/glow-demo.git".into(),
            full_name: "acme/glow-demo".into(),
            owner: "acme".into(),
        };
        assert_eq!(cli.create_service("p1", "e1", &repo).await.unwrap(), "s1");
        assert_eq!(cli.create_domain(&target()).await.unwrap(), "glow.up.railway.app");

        let calls = runner.calls.lock().unwrap();
        assert!(calls[2].contains(&"acme/glow-demo".to_string()));
        assert!(calls.iter().all(|c| c.contains(&"--json".to_string())));
    }

    #[tokio::test]
    async fn variables_are_passed_as_set_flags() {
        let runner = Arc::new(FakeRunner {
            responses: vec![("variables", Ok(""))],
            ..Default::default()
        });
        let cli = RailwayCli::new(runner.clone(), "railway", "tok");

        let mut vars = Variables::new();
        vars.insert("DEMO_MODE".into(), "true".into());
        vars.insert("PRACTICE_ID".into(), "glow".into());
        cli.set_variables(&target(), &vars).await.unwrap();

        let calls = runner.calls.lock().unwrap();
        let joined = calls[0].join(" ");
        assert!(joined.contains("--set DEMO_MODE=true --set PRACTICE_ID=glow"));
    }

    #[tokio::test]
    async fn garbage_output_is_parse_error() {
        let runner = Arc::new(FakeRunner {
            responses: vec![("init", Ok("Created project glow-demo"))],
            ..Default::default()
        });
        let cli = RailwayCli::new(runner, "railway", "tok");
        let err = cli.create_project("glow-demo").await.unwrap_err();
        assert!(matches!(err, DemoForgeError::Parse { .. }));
    }
}
