// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Deploys Node.js applications to App Engine.

const DESCRIPTION: &str = concat!(
    "Deploys Node.js applications to App Engine and manages their versions.",
    " The application source must be packaged and uploaded to Cloud Storage",
    " before running `deploy`. Mutating requests are resubmitted when they fail",
    " with transient errors, and the tool waits until the operations they start",
    " complete. When an operation cannot be confirmed in time the tool prints a",
    " link to the Google Cloud console to check it manually."
);

mod hints;

use appengine::client::Client;
use appengine::model::{
    AutomaticScaling, Deployment, Entrypoint, StandardSchedulerSettings, Version, ZipInfo,
};
use appengine::options::{ClientConfig, RetrySettings};
use appengine::workflow::{self, ServingStatus};
use clap::{Args as ClapArgs, Parser, Subcommand};
use lro::operation::Completion;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    enable_tracing(args.debug);

    let client = Client::new(args.client_config())?;
    tracing::debug!(
        "using {} for App Engine requests",
        client.config().appengine_endpoint()
    );
    run(&client, &args)
        .await
        .map_err(|e| hints::annotate(e, args.project.as_deref()))
}

async fn run(client: &Client, args: &Args) -> anyhow::Result<()> {
    match &args.command {
        Command::Deploy(deploy) => {
            let project = args.project()?;
            let version = deploy.version();
            let deployment =
                workflow::deploy_version(client, project, &deploy.service, &version, deploy.promote)
                    .await?;
            match deployment {
                Completion::Build(b) => println!(
                    "version {} deployed, build {} finished with status {}",
                    version.id, b.id, b.status
                ),
                Completion::Operation(o) => {
                    println!("version {} deployed by operation {}", version.id, o.name)
                }
            }
            if deploy.promote {
                println!(
                    "all traffic for service {} goes to version {}",
                    deploy.service, version.id
                );
            }
        }
        Command::Versions(VersionsCommand::Start(target)) => {
            set_serving_status(client, args.project()?, target, ServingStatus::Serving).await?;
        }
        Command::Versions(VersionsCommand::Stop(target)) => {
            set_serving_status(client, args.project()?, target, ServingStatus::Stopped).await?;
        }
        Command::Versions(VersionsCommand::List { projects }) => {
            let projects = match projects.as_slice() {
                [] => vec![args.project()?.to_string()],
                p => p.to_vec(),
            };
            let services = workflow::list_versions(client, &projects).await?;
            for s in services {
                for v in s.versions {
                    println!("{}\t{}\t{}\t{}", s.project, s.service, v.id, v.serving_status);
                }
            }
        }
        Command::Traffic(TrafficCommand::Migrate(target)) => {
            workflow::migrate_traffic(client, args.project()?, &target.service, &target.version)
                .await?;
            println!(
                "all traffic for service {} goes to version {}",
                target.service, target.version
            );
        }
        Command::Apis(ApisCommand::Enable { apis }) => {
            let project = args.project()?;
            workflow::enable_apis(client, project, apis).await?;
            for api in apis {
                println!("{api} is enabled in {project}");
            }
        }
        Command::Operations(OperationsCommand::Wait { name }) => {
            let operation = workflow::wait_operation(client, name).await?;
            println!("operation {} completed", operation.name);
        }
    }
    Ok(())
}

async fn set_serving_status(
    client: &Client,
    project: &str,
    target: &VersionTarget,
    status: ServingStatus,
) -> anyhow::Result<()> {
    let version =
        workflow::set_serving_status(client, project, &target.service, &target.version, status)
            .await?;
    println!("version {} is {}", version.id, version.serving_status);
    Ok(())
}

fn enable_tracing(debug: bool) {
    use tracing_subscriber::EnvFilter;
    let default = if debug {
        "info,gae_deploy=debug,gae_deploy_appengine=debug,gae_deploy_lro=debug,gae_deploy_gax=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .with_writer(std::io::stderr)
        .init();
}

/// Deploys Node.js applications to App Engine.
#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = DESCRIPTION)]
struct Args {
    /// The Google Cloud project hosting the App Engine application.
    #[arg(long, global = true, env = "GOOGLE_CLOUD_PROJECT")]
    project: Option<String>,

    /// An OAuth2 access token, e.g. the output of
    /// `gcloud auth print-access-token`.
    #[arg(
        long,
        global = true,
        env = "GOOGLE_OAUTH_ACCESS_TOKEN",
        hide_env_values = true
    )]
    access_token: Option<String>,

    #[arg(long, global = true, hide = true, env = "GAE_DEPLOY_APPENGINE_ENDPOINT")]
    appengine_endpoint: Option<String>,

    #[arg(long, global = true, hide = true, env = "GAE_DEPLOY_CLOUDBUILD_ENDPOINT")]
    cloudbuild_endpoint: Option<String>,

    #[arg(long, global = true, hide = true, env = "GAE_DEPLOY_SERVICEUSAGE_ENDPOINT")]
    serviceusage_endpoint: Option<String>,

    /// The interval between status checks while waiting for operations.
    #[arg(long, global = true, default_value_t = 4000)]
    poll_interval_ms: u64,

    /// How long to wait for operations before giving up.
    ///
    /// Defaults to 5 minutes for most operations, and 10 minutes to confirm
    /// that a version started or stopped.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// The maximum number of attempts for requests that fail with transient
    /// errors.
    #[arg(
        long,
        global = true,
        default_value_t = RetrySettings::DEFAULT_MAX_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    max_attempts: u32,

    /// Log retries and status checks.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::default()
            .with_retry(RetrySettings::default().with_max_attempts(self.max_attempts))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms));
        if let Some(secs) = self.timeout_secs {
            config = config.with_poll_timeout(Duration::from_secs(secs));
        }
        config.access_token = self.access_token.clone();
        config.appengine_endpoint = self.appengine_endpoint.clone();
        config.cloudbuild_endpoint = self.cloudbuild_endpoint.clone();
        config.serviceusage_endpoint = self.serviceusage_endpoint.clone();
        config
    }

    fn project(&self) -> anyhow::Result<&str> {
        self.project.as_deref().ok_or_else(|| {
            anyhow::anyhow!("missing project, use --project or set GOOGLE_CLOUD_PROJECT")
        })
    }
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Creates a new version from a source archive in Cloud Storage.
    Deploy(DeployArgs),
    /// Manages versions.
    #[command(subcommand)]
    Versions(VersionsCommand),
    /// Manages traffic allocation.
    #[command(subcommand)]
    Traffic(TrafficCommand),
    /// Manages the APIs enabled in the project.
    #[command(subcommand)]
    Apis(ApisCommand),
    /// Manages App Engine operations.
    #[command(subcommand)]
    Operations(OperationsCommand),
}

#[derive(Clone, Debug, ClapArgs)]
struct DeployArgs {
    #[arg(long, default_value = "default")]
    service: String,

    /// The id for the new version.
    #[arg(long)]
    version: String,

    /// The URL of the source archive, e.g.
    /// `https://storage.googleapis.com/my-bucket/app.zip`.
    #[arg(long)]
    source_url: String,

    #[arg(long, default_value = "nodejs22")]
    runtime: String,

    /// The command to start the application, e.g. `node server.js`.
    #[arg(long)]
    entrypoint: Option<String>,

    /// Environment variables for the application, as `KEY=VALUE`.
    #[arg(long = "env", value_parser = parse_key_val)]
    env_variables: Vec<(String, String)>,

    /// Limits the number of instances.
    #[arg(long)]
    max_instances: Option<i32>,

    /// Route all traffic to the new version once it is deployed.
    #[arg(long)]
    promote: bool,
}

impl DeployArgs {
    fn version(&self) -> Version {
        let version = Version::new()
            .set_id(&self.version)
            .set_runtime(&self.runtime)
            .set_env("standard")
            .set_deployment(
                Deployment::new().set_zip(ZipInfo::new().set_source_url(&self.source_url)),
            )
            .set_env_variables(self.env_variables.clone());
        let version = self
            .entrypoint
            .iter()
            .fold(version, |v, e| v.set_entrypoint(Entrypoint::new().set_shell(e)));
        self.max_instances.iter().fold(version, |v, m| {
            v.set_automatic_scaling(AutomaticScaling::new().set_standard_scheduler_settings(
                StandardSchedulerSettings::new().set_max_instances(*m),
            ))
        })
    }
}

#[derive(Clone, Debug, ClapArgs)]
struct VersionTarget {
    #[arg(long, default_value = "default")]
    service: String,

    #[arg(long)]
    version: String,
}

#[derive(Clone, Debug, Subcommand)]
enum VersionsCommand {
    /// Starts a version and waits until it is serving.
    Start(VersionTarget),
    /// Stops a version and waits until it is stopped.
    Stop(VersionTarget),
    /// Lists the versions of all services.
    List {
        /// List versions in these projects instead of `--project`.
        #[arg(long, value_delimiter = ',')]
        projects: Vec<String>,
    },
}

#[derive(Clone, Debug, Subcommand)]
enum TrafficCommand {
    /// Routes all the traffic of a service to one version.
    Migrate(VersionTarget),
}

#[derive(Clone, Debug, Subcommand)]
enum ApisCommand {
    /// Enables one or more APIs, e.g. `cloudbuild.googleapis.com`.
    Enable {
        #[arg(required = true)]
        apis: Vec<String>,
    },
}

#[derive(Clone, Debug, Subcommand)]
enum OperationsCommand {
    /// Waits for an operation, e.g. `apps/my-project/operations/123`.
    Wait { name: String },
}

fn parse_key_val(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("invalid KEY=VALUE pair: {arg}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use test_case::test_case;

    #[test]
    fn command() {
        Args::command().debug_assert();
    }

    #[test]
    fn deploy() -> anyhow::Result<()> {
        let args = Args::try_parse_from([
            "gae-deploy",
            "--project=my-project",
            "deploy",
            "--version=v1",
            "--source-url=https://storage.googleapis.com/b/app.zip",
            "--entrypoint=node server.js",
            "--env=NODE_ENV=production",
            "--env=GREETING=a=b",
            "--max-instances=2",
            "--promote",
        ])?;
        assert_eq!(args.project.as_deref(), Some("my-project"));
        let Command::Deploy(deploy) = &args.command else {
            panic!("unexpected command {:?}", args.command);
        };
        assert_eq!(deploy.service, "default");
        assert!(deploy.promote);
        let version = deploy.version();
        assert_eq!(version.id, "v1");
        assert_eq!(version.runtime, "nodejs22");
        assert_eq!(
            version.entrypoint.as_ref().map(|e| e.shell.as_str()),
            Some("node server.js")
        );
        assert_eq!(
            version.env_variables.get("GREETING").map(String::as_str),
            Some("a=b")
        );
        assert_eq!(
            version
                .automatic_scaling
                .as_ref()
                .and_then(|s| s.standard_scheduler_settings.as_ref())
                .and_then(|s| s.max_instances),
            Some(2)
        );
        Ok(())
    }

    #[test]
    fn client_config() -> anyhow::Result<()> {
        let args = Args::try_parse_from([
            "gae-deploy",
            "--poll-interval-ms=250",
            "--timeout-secs=60",
            "--max-attempts=3",
            "--appengine-endpoint=http://localhost:8080",
            "operations",
            "wait",
            "apps/p/operations/o",
        ])?;
        let config = args.client_config();
        assert_eq!(config.poll.interval(), Duration::from_millis(250));
        assert_eq!(config.poll.timeout(), Duration::from_secs(60));
        assert_eq!(config.serving_poll.0.timeout(), Duration::from_secs(60));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.appengine_endpoint(), "http://localhost:8080");
        Ok(())
    }

    #[test]
    fn default_timeouts() -> anyhow::Result<()> {
        let args = Args::try_parse_from(["gae-deploy", "versions", "list", "--projects=a,b"])?;
        let config = args.client_config();
        assert_eq!(config.poll.timeout(), Duration::from_secs(300));
        assert_eq!(config.serving_poll.0.timeout(), Duration::from_secs(600));
        let Command::Versions(VersionsCommand::List { projects }) = &args.command else {
            panic!("unexpected command {:?}", args.command);
        };
        assert_eq!(projects, &vec!["a".to_string(), "b".to_string()]);
        Ok(())
    }

    #[test]
    fn max_attempts_at_least_one() -> anyhow::Result<()> {
        let got = Args::try_parse_from(["gae-deploy", "--max-attempts=0", "versions", "list"]);
        assert!(got.is_err(), "{got:?}");

        let args = Args::try_parse_from(["gae-deploy", "--max-attempts=1", "versions", "list"])?;
        assert_eq!(args.client_config().retry.max_attempts, 1);
        Ok(())
    }

    #[test]
    fn apis_enable_requires_apis() {
        let got = Args::try_parse_from(["gae-deploy", "apis", "enable"]);
        assert!(got.is_err(), "{got:?}");
    }

    #[test_case("A=B", Some(("A", "B")))]
    #[test_case("A=", Some(("A", "")))]
    #[test_case("A=B=C", Some(("A", "B=C")))]
    #[test_case("=B", None)]
    #[test_case("AB", None)]
    fn key_val(input: &str, want: Option<(&str, &str)>) {
        let got = parse_key_val(input).ok();
        let want = want.map(|(k, v)| (k.to_string(), v.to_string()));
        assert_eq!(got, want);
    }
}
