//! The ecs module owns the calls to the ECS control plane: resolving a service's live task
//! definition and registering new revisions.

use super::definition::TaskDef;
use aws_sdk_ecs::types as ecs;
use aws_sdk_ecs::Client as EcsClient;
use log::{info, trace};
use snafu::{OptionExt, ResultExt};

/// Fetches the task definition currently deployed for the given service
pub(crate) async fn current_task_definition(
    client: &EcsClient,
    cluster: &str,
    service: &str,
) -> Result<TaskDef> {
    info!(
        "Describing service '{}' in cluster '{}'",
        service, cluster
    );
    let response = client
        .describe_services()
        .cluster(cluster)
        .services(service)
        .send()
        .await
        .context(error::DescribeServicesSnafu { cluster, service })?;

    let service_detail = response
        .services()
        .first()
        .context(error::MissingInResponseSnafu {
            request_type: "DescribeServices",
            missing: format!("service '{}'", service),
        })?;
    let task_def_arn =
        service_detail
            .task_definition()
            .context(error::MissingInResponseSnafu {
                request_type: "DescribeServices",
                missing: "task definition ARN",
            })?;

    info!("Fetching task definition {}", task_def_arn);
    let response = client
        .describe_task_definition()
        .task_definition(task_def_arn)
        .send()
        .await
        .context(error::DescribeTaskDefinitionSnafu { arn: task_def_arn })?;
    let task_definition = response
        .task_definition()
        .context(error::MissingInResponseSnafu {
            request_type: "DescribeTaskDefinition",
            missing: "task definition",
        })?;
    trace!("Described task definition: {:#?}", task_definition);

    TaskDef::from_sdk(task_definition).context(error::ConvertSnafu)
}

/// Registers the given document as a new task definition revision and returns its ARN
pub(crate) async fn register(client: &EcsClient, task_def: &TaskDef) -> Result<String> {
    let container_definitions = task_def
        .container_definitions
        .iter()
        .map(|container| container.to_sdk())
        .collect::<std::result::Result<Vec<_>, _>>()
        .context(error::ConvertSnafu)?;

    let volumes = match &task_def.volumes {
        Some(volumes) => Some(
            volumes
                .iter()
                .map(|volume| volume.to_sdk())
                .collect::<std::result::Result<Vec<_>, _>>()
                .context(error::ConvertSnafu)?,
        ),
        None => None,
    };

    info!("Registering task definition in family '{}'", task_def.family);
    let response = client
        .register_task_definition()
        .family(&task_def.family)
        .set_task_role_arn(task_def.task_role_arn.clone())
        .set_execution_role_arn(task_def.execution_role_arn.clone())
        .set_network_mode(task_def.network_mode.as_deref().map(ecs::NetworkMode::from))
        .set_container_definitions(Some(container_definitions))
        .set_volumes(volumes)
        .set_placement_constraints(task_def.placement_constraints.as_ref().map(|constraints| {
            constraints
                .iter()
                .map(|constraint| constraint.to_sdk())
                .collect()
        }))
        .set_requires_compatibilities(
            task_def
                .requires_compatibilities
                .as_ref()
                .map(|compat| compat.iter().map(|c| ecs::Compatibility::from(c.as_str())).collect()),
        )
        .set_cpu(task_def.cpu.clone())
        .set_memory(task_def.memory.clone())
        .send()
        .await
        .context(error::RegisterTaskDefinitionSnafu {
            family: task_def.family.as_str(),
        })?;

    let arn = response
        .task_definition()
        .and_then(|task_definition| task_definition.task_definition_arn())
        .context(error::MissingInResponseSnafu {
            request_type: "RegisterTaskDefinition",
            missing: "task definition ARN",
        })?;
    info!("Registered task definition {}", arn);

    Ok(arn.to_string())
}

mod error {
    use aws_sdk_ecs::error::SdkError;
    use aws_sdk_ecs::operation::describe_services::DescribeServicesError;
    use aws_sdk_ecs::operation::describe_task_definition::DescribeTaskDefinitionError;
    use aws_sdk_ecs::operation::register_task_definition::RegisterTaskDefinitionError;
    use aws_smithy_types::error::display::DisplayErrorContext;
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    #[allow(clippy::large_enum_variant)]
    pub(crate) enum Error {
        #[snafu(display("Failed to convert task definition: {}", source))]
        Convert {
            source: crate::aws::taskdef::definition::Error,
        },

        #[snafu(display(
            "Failed to describe service '{}' in cluster '{}': {}",
            service,
            cluster,
            DisplayErrorContext(source)
        ))]
        DescribeServices {
            cluster: String,
            service: String,
            source: SdkError<DescribeServicesError>,
        },

        #[snafu(display(
            "Failed to describe task definition '{}': {}",
            arn,
            DisplayErrorContext(source)
        ))]
        DescribeTaskDefinition {
            arn: String,
            source: SdkError<DescribeTaskDefinitionError>,
        },

        #[snafu(display("Response to {} was missing {}", request_type, missing))]
        MissingInResponse {
            request_type: String,
            missing: String,
        },

        #[snafu(display(
            "Failed to register task definition in family '{}': {}",
            family,
            DisplayErrorContext(source)
        ))]
        RegisterTaskDefinition {
            family: String,
            source: SdkError<RegisterTaskDefinitionError>,
        },
    }
}
pub(crate) use error::Error;
type Result<T> = std::result::Result<T, error::Error>;
