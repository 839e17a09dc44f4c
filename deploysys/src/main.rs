/*!
`deploysys` automates blue/green deployments of Amazon ECS services through CodeDeploy.

Currently implemented:
* rendering a new task definition revision from a service's live definition, with the
  container image(s) replaced
* emitting a CodeDeploy appspec naming the target container and port
* registering the revision and creating the CodeDeploy deployment

Configuration comes from:
* command-line parameters, to specify the service and rollout targets
* Deploy.toml, for AWS region, profile, and role settings
*/

mod aws;

use aws::{deploy, taskdef};
use clap::error::ErrorKind;
use clap::Parser;
use simplelog::{CombinedLogger, Config as LogConfig, ConfigBuilder, LevelFilter, SimpleLogger};
use snafu::ResultExt;
use std::path::PathBuf;
use std::process;
use tokio::runtime::Runtime;

fn run(args: Args) -> Result<()> {
    // SimpleLogger will send errors to stderr and anything less to stdout.
    // To reduce verbosity of messages related to the AWS SDK for Rust we need
    // to spin up two loggers, setting different levels for each. This allows
    // us to retain the mixed logging of stdout/stderr in simplelog.
    match args.log_level {
        LevelFilter::Info => {
            CombinedLogger::init(vec![
                SimpleLogger::new(
                    LevelFilter::Info,
                    ConfigBuilder::new()
                        .add_filter_ignore_str("aws_config")
                        .add_filter_ignore_str("aws_credential_types")
                        .add_filter_ignore_str("aws_smithy")
                        .add_filter_ignore_str("tracing::span")
                        .build(),
                ),
                SimpleLogger::new(
                    LevelFilter::Warn,
                    ConfigBuilder::new()
                        .add_filter_allow_str("aws_config")
                        .add_filter_allow_str("aws_credential_types")
                        .add_filter_allow_str("aws_smithy")
                        .add_filter_allow_str("tracing::span")
                        .build(),
                ),
            ])
            .context(error::LoggerSnafu)?;
        }
        _ => {
            SimpleLogger::init(args.log_level, LogConfig::default()).context(error::LoggerSnafu)?
        }
    }

    match args.subcommand {
        SubCommands::Deploy(ref deploy_args) => {
            let rt = Runtime::new().context(error::RuntimeSnafu)?;
            rt.block_on(async {
                deploy::run(&args, deploy_args)
                    .await
                    .context(error::DeploySnafu)
            })
        }
        SubCommands::RenderTaskDef(ref render_args) => {
            let rt = Runtime::new().context(error::RuntimeSnafu)?;
            rt.block_on(async {
                taskdef::run(&args, render_args)
                    .await
                    .context(error::RenderTaskDefSnafu)
            })
        }
    }
}

fn main() {
    // Usage problems exit 1 rather than clap's default code; help and version still exit 0.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            process::exit(0);
        }
        Err(e) => {
            let _ = e.print();
            process::exit(1);
        }
    };

    if let Err(e) = run(args) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

/// Automates blue/green deployments of ECS services
#[derive(Debug, Parser)]
pub(crate) struct Args {
    #[arg(global = true, long, default_value = "INFO")]
    /// How much detail to log; from least to most: ERROR, WARN, INFO, DEBUG, TRACE
    log_level: LevelFilter,

    #[arg(global = true, long, default_value = "Deploy.toml")]
    /// Path to Deploy.toml
    pub(crate) config_path: PathBuf,

    #[command(subcommand)]
    subcommand: SubCommands,
}

#[derive(Debug, Parser)]
enum SubCommands {
    Deploy(deploy::DeployArgs),
    RenderTaskDef(taskdef::RenderTaskDefArgs),
}

mod error {
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(super) enum Error {
        #[snafu(display("Failed to deploy: {}", source))]
        Deploy { source: crate::aws::deploy::Error },

        #[snafu(display("Logger setup error: {}", source))]
        Logger { source: log::SetLoggerError },

        #[snafu(display("Failed to render task definition: {}", source))]
        RenderTaskDef { source: crate::aws::taskdef::Error },

        #[snafu(display("Failed to create async runtime: {}", source))]
        Runtime { source: std::io::Error },
    }
}
type Result<T> = std::result::Result<T, error::Error>;

#[cfg(test)]
mod test {
    use super::Args;
    use clap::Parser;

    const REQUIRED: &[&str] = &[
        "deploysys",
        "deploy",
        "--cluster",
        "prod",
        "--service",
        "web-service",
        "--image",
        "repo/img:2.0",
        "--container-port",
        "8080",
        "--codedeploy-application",
        "web-app",
        "--codedeploy-deployment-group",
        "web-group",
    ];

    #[test]
    fn deploy_accepts_required_flags() {
        assert!(Args::try_parse_from(REQUIRED.iter().copied()).is_ok());
    }

    #[test]
    fn deploy_rejects_missing_required_flags() {
        // Drop each required flag (with its value) in turn
        for flag_index in (2..REQUIRED.len()).step_by(2) {
            let mut argv = REQUIRED.to_vec();
            argv.drain(flag_index..flag_index + 2);
            assert!(
                Args::try_parse_from(argv).is_err(),
                "parse succeeded without {}",
                REQUIRED[flag_index]
            );
        }
    }

    #[test]
    fn deploy_rejects_unknown_flags() {
        let mut argv = REQUIRED.to_vec();
        argv.push("--definitely-not-a-flag");
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn image_flag_repeats() {
        let mut argv = REQUIRED.to_vec();
        argv.extend(["--image", "sidecar=repo/sidecar:2.0"]);
        assert!(Args::try_parse_from(argv).is_ok());
    }
}
