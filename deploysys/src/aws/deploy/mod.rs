//! The deploy module owns the 'deploy' subcommand and controls the process of updating a
//! service's container image through a CodeDeploy blue/green rollout: resolve the current
//! task definition, render the new revision, emit the appspec, register the revision, and
//! create the deployment.

pub(crate) mod codedeploy;

use crate::aws::appspec::AppSpec;
use crate::aws::client::build_client_config;
use crate::aws::taskdef;
use crate::aws::taskdef::transform::{self, ImageMap};
use crate::Args;
use aws_sdk_codedeploy::Client as CodeDeployClient;
use aws_sdk_ecs::Client as EcsClient;
use clap::Parser;
use deploysys_config::DeployConfig;
use log::{info, trace, warn};
use snafu::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};

/// Default path for the emitted deployment descriptor
pub(crate) const DEFAULT_APPSPEC_PATH: &str = "appspec_ecs.yaml";

/// Updates a service's container image via a CodeDeploy blue/green deployment
#[derive(Debug, Parser)]
pub(crate) struct DeployArgs {
    /// The ECS cluster containing the service
    #[arg(long)]
    cluster: String,

    /// The ECS service to deploy
    #[arg(long)]
    service: String,

    /// New image reference; either IMAGE for every container or NAME=IMAGE per container
    #[arg(long = "image", required = true)]
    images: Vec<String>,

    /// The container port receiving traffic from the load balancer
    #[arg(long)]
    container_port: u16,

    /// The CodeDeploy application for the service
    #[arg(long)]
    codedeploy_application: String,

    /// The CodeDeploy deployment group for the service
    #[arg(long)]
    codedeploy_deployment_group: String,

    /// Use this task definition file as-is instead of rendering one from the live service
    #[arg(long)]
    task_definition_file: Option<PathBuf>,

    /// Use this appspec file instead of emitting one
    #[arg(long)]
    appspec_file: Option<PathBuf>,

    /// Task role ARN to set on the rendered definition
    #[arg(long)]
    task_role_arn: Option<String>,

    /// AWS region; overrides Deploy.toml
    #[arg(long)]
    region: Option<String>,
}

/// Common entrypoint from main()
pub(crate) async fn run(args: &Args, deploy_args: &DeployArgs) -> Result<()> {
    let deploy_config =
        DeployConfig::from_path_or_default(&args.config_path).context(error::ConfigSnafu)?;
    let aws = deploy_config.aws.unwrap_or_default();

    let client_config = build_client_config(deploy_args.region.as_deref(), &aws).await;
    let ecs_client = EcsClient::new(&client_config);
    let codedeploy_client = CodeDeployClient::new(&client_config);

    // Resolve and render the task definition, or take the caller's file as-is
    let task_def = match &deploy_args.task_definition_file {
        Some(path) => {
            warn!(
                "Using task definition from {}; --image and --task-role-arn do not apply to it",
                path.display()
            );
            taskdef::read_task_def(path).context(error::TaskDefFileSnafu)?
        }
        None => {
            let images = ImageMap::parse(&deploy_args.images).context(error::ImageSnafu)?;
            let source = taskdef::ecs::current_task_definition(
                &ecs_client,
                &deploy_args.cluster,
                &deploy_args.service,
            )
            .await
            .context(error::ResolveSnafu)?;
            trace!("Source task definition: {:#?}", source);

            let rendered =
                transform::new_revision(&source, &images, deploy_args.task_role_arn.as_deref())
                    .context(error::RenderSnafu)?;
            taskdef::write_task_def(&rendered, Path::new(taskdef::DEFAULT_TASK_DEF_PATH))
                .context(error::TaskDefFileSnafu)?;
            info!("Wrote task definition to {}", taskdef::DEFAULT_TASK_DEF_PATH);
            rendered
        }
    };

    // Emit the appspec, unless the caller brought their own
    let appspec_path = match &deploy_args.appspec_file {
        Some(path) => path.clone(),
        None => {
            let container_name = &task_def
                .container_definitions
                .first()
                .context(error::NoContainersSnafu {
                    family: task_def.family.as_str(),
                })?
                .name;
            let appspec = AppSpec::for_container(container_name, deploy_args.container_port);
            appspec
                .write(DEFAULT_APPSPEC_PATH)
                .context(error::AppspecSnafu)?;
            info!("Wrote appspec to {}", DEFAULT_APPSPEC_PATH);
            PathBuf::from(DEFAULT_APPSPEC_PATH)
        }
    };

    // Register the revision and point the appspec at it
    let task_def_arn = taskdef::ecs::register(&ecs_client, &task_def)
        .await
        .context(error::RegisterSnafu)?;
    let mut appspec = AppSpec::from_path(&appspec_path).context(error::AppspecSnafu)?;
    appspec.substitute_task_definition(&task_def_arn);

    // Hand the rollout to CodeDeploy; we do not wait for it to finish
    let deployment_id = codedeploy::create_deployment(
        &codedeploy_client,
        &deploy_args.codedeploy_application,
        &deploy_args.codedeploy_deployment_group,
        &appspec.to_yaml().context(error::AppspecSnafu)?,
    )
    .await
    .context(error::CreateDeploymentSnafu)?;

    info!(
        "Created deployment {} for service '{}' in cluster '{}'",
        deployment_id, deploy_args.service, deploy_args.cluster
    );
    Ok(())
}

mod error {
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(crate) enum Error {
        #[snafu(display("Appspec error: {}", source))]
        Appspec { source: crate::aws::appspec::Error },

        #[snafu(display("Error reading config: {}", source))]
        Config { source: deploysys_config::Error },

        #[snafu(display("Failed to create deployment: {}", source))]
        CreateDeployment {
            source: crate::aws::deploy::codedeploy::Error,
        },

        #[snafu(display("Invalid --image argument: {}", source))]
        Image {
            source: crate::aws::taskdef::transform::Error,
        },

        #[snafu(display("Task definition '{}' has no container definitions", family))]
        NoContainers { family: String },

        #[snafu(display("Failed to register task definition: {}", source))]
        Register {
            source: crate::aws::taskdef::ecs::Error,
        },

        #[snafu(display("Failed to render task definition: {}", source))]
        Render {
            source: crate::aws::taskdef::transform::Error,
        },

        #[snafu(display("Failed to resolve current task definition: {}", source))]
        Resolve {
            source: crate::aws::taskdef::ecs::Error,
        },

        #[snafu(display("Task definition file error: {}", source))]
        TaskDefFile {
            source: crate::aws::taskdef::Error,
        },
    }
}
pub(crate) use error::Error;
type Result<T> = std::result::Result<T, error::Error>;
