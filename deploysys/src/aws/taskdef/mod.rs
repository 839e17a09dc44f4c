//! The taskdef module owns the 'render-task-def' subcommand and the task definition
//! handling shared with 'deploy': resolving a service's live definition, rendering the
//! next revision, and reading/writing task definition files.

pub(crate) mod definition;
pub(crate) mod ecs;
pub(crate) mod transform;

use crate::aws::client::build_client_config;
use crate::Args;
use aws_sdk_ecs::Client as EcsClient;
use clap::Parser;
use definition::TaskDef;
use deploysys_config::DeployConfig;
use log::{info, trace};
use snafu::ResultExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use transform::ImageMap;

/// Default path for the rendered task definition artifact
pub(crate) const DEFAULT_TASK_DEF_PATH: &str = "task_def.json";

/// Renders a new task definition revision for a service without deploying it
#[derive(Debug, Parser)]
pub(crate) struct RenderTaskDefArgs {
    /// The ECS cluster containing the service
    #[arg(long)]
    cluster: String,

    /// The ECS service whose live task definition is the source
    #[arg(long)]
    service: String,

    /// New image reference; either IMAGE for every container or NAME=IMAGE per container
    #[arg(long = "image", required = true)]
    images: Vec<String>,

    /// Task role ARN to set on the rendered definition
    #[arg(long)]
    task_role_arn: Option<String>,

    /// AWS region; overrides Deploy.toml
    #[arg(long)]
    region: Option<String>,

    /// Where to write the rendered task definition
    #[arg(long, default_value = DEFAULT_TASK_DEF_PATH)]
    output: PathBuf,
}

/// Common entrypoint from main()
pub(crate) async fn run(args: &Args, render_args: &RenderTaskDefArgs) -> Result<()> {
    let deploy_config =
        DeployConfig::from_path_or_default(&args.config_path).context(error::ConfigSnafu)?;
    let aws = deploy_config.aws.unwrap_or_default();

    let images = ImageMap::parse(&render_args.images).context(error::ImageSnafu)?;

    let client_config = build_client_config(render_args.region.as_deref(), &aws).await;
    let ecs_client = EcsClient::new(&client_config);

    let source =
        ecs::current_task_definition(&ecs_client, &render_args.cluster, &render_args.service)
            .await
            .context(error::ResolveSnafu)?;
    trace!("Source task definition: {:#?}", source);

    let rendered = transform::new_revision(&source, &images, render_args.task_role_arn.as_deref())
        .context(error::RenderSnafu)?;

    write_task_def(&rendered, &render_args.output)?;
    info!(
        "Wrote task definition to {}",
        render_args.output.display()
    );
    Ok(())
}

/// Writes a task definition document, replacing any existing file at the path
pub(crate) fn write_task_def(task_def: &TaskDef, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(task_def).context(error::SerializeSnafu)?;
    fs::write(path, json).context(error::FileSnafu { op: "write", path })
}

/// Reads a caller-supplied task definition document
pub(crate) fn read_task_def(path: &Path) -> Result<TaskDef> {
    let file = File::open(path).context(error::FileSnafu { op: "open", path })?;
    serde_json::from_reader(file).context(error::DeserializeSnafu { path })
}

mod error {
    use snafu::Snafu;
    use std::io;
    use std::path::PathBuf;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(crate) enum Error {
        #[snafu(display("Error reading config: {}", source))]
        Config { source: deploysys_config::Error },

        #[snafu(display("Failed to deserialize task definition from '{}': {}", path.display(), source))]
        Deserialize {
            path: PathBuf,
            source: serde_json::Error,
        },

        #[snafu(display("Failed to {} '{}': {}", op, path.display(), source))]
        File {
            op: String,
            path: PathBuf,
            source: io::Error,
        },

        #[snafu(display("Invalid --image argument: {}", source))]
        Image {
            source: crate::aws::taskdef::transform::Error,
        },

        #[snafu(display("Failed to render task definition: {}", source))]
        Render {
            source: crate::aws::taskdef::transform::Error,
        },

        #[snafu(display("Failed to resolve current task definition: {}", source))]
        Resolve {
            source: crate::aws::taskdef::ecs::Error,
        },

        #[snafu(display("Failed to serialize task definition: {}", source))]
        Serialize { source: serde_json::Error },
    }
}
pub(crate) use error::Error;
type Result<T> = std::result::Result<T, error::Error>;

#[cfg(test)]
mod test {
    use super::definition::TaskDef;
    use super::{read_task_def, write_task_def};
    use serde_json::json;

    #[test]
    fn task_def_file_round_trip() {
        let task_def: TaskDef = serde_json::from_value(json!({
            "family": "web-service",
            "containerDefinitions": [{"name": "web", "image": "repo/img:2.0"}],
            "volumes": [],
            "placementConstraints": []
        }))
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task_def.json");
        write_task_def(&task_def, &path).unwrap();
        let reread = read_task_def(&path).unwrap();

        assert_eq!(reread, task_def);
    }

    #[test]
    fn writing_twice_is_byte_identical() {
        let task_def: TaskDef = serde_json::from_value(json!({
            "family": "web-service",
            "containerDefinitions": [{
                "name": "web",
                "image": "repo/img:2.0",
                "dockerLabels": {"team": "platform", "env": "prod"}
            }]
        }))
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let first_path = dir.path().join("first.json");
        let second_path = dir.path().join("second.json");
        write_task_def(&task_def, &first_path).unwrap();
        write_task_def(&task_def, &second_path).unwrap();

        assert_eq!(
            std::fs::read(&first_path).unwrap(),
            std::fs::read(&second_path).unwrap()
        );
    }
}
