//! The definition module owns the task definition document model: the fields of an ECS task
//! definition that RegisterTaskDefinition accepts and that our rendering reads and writes,
//! along with conversions to and from the SDK's types.
//!
//! The model is deliberately partial; exotic task definition features (FSx volumes, inference
//! accelerators, proxy configuration) are not represented and will not survive a round trip
//! through it.

use aws_sdk_ecs::types as ecs;
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, ResultExt};
use std::collections::BTreeMap;

// Maps use BTreeMap rather than HashMap so that serializing the same document twice produces
// identical bytes.
type Labels = BTreeMap<String, String>;

/// A task definition document, as registered with ECS and as written to task_def.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskDef {
    pub(crate) family: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) task_role_arn: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) execution_role_arn: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) network_mode: Option<String>,

    pub(crate) container_definitions: Vec<ContainerDef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) volumes: Option<Vec<VolumeDef>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) placement_constraints: Option<Vec<PlacementConstraintDef>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) requires_compatibilities: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) cpu: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) memory: Option<String>,
}

/// One container within a task definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContainerDef {
    pub(crate) name: String,
    pub(crate) image: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) cpu: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) memory: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) memory_reservation: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) essential: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) entry_point: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) command: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) working_directory: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) environment: Option<Vec<KeyValueDef>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) secrets: Option<Vec<SecretDef>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) port_mappings: Option<Vec<PortMappingDef>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) mount_points: Option<Vec<MountPointDef>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) volumes_from: Option<Vec<VolumeFromDef>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) depends_on: Option<Vec<DependencyDef>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) links: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) docker_labels: Option<Labels>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) ulimits: Option<Vec<UlimitDef>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) log_configuration: Option<LogConfigurationDef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) health_check: Option<HealthCheckDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct KeyValueDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SecretDef {
    pub(crate) name: String,
    pub(crate) value_from: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PortMappingDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) container_port: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) host_port: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) protocol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MountPointDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) source_volume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) container_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) read_only: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VolumeFromDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) source_container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) read_only: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DependencyDef {
    pub(crate) container_name: String,
    pub(crate) condition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UlimitDef {
    pub(crate) name: String,
    pub(crate) soft_limit: i32,
    pub(crate) hard_limit: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LogConfigurationDef {
    pub(crate) log_driver: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) options: Option<Labels>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) secret_options: Option<Vec<SecretDef>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HealthCheckDef {
    pub(crate) command: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) interval: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) timeout: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) retries: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) start_period: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VolumeDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) host: Option<HostVolumeDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) docker_volume_configuration: Option<DockerVolumeDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) efs_volume_configuration: Option<EfsVolumeDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HostVolumeDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) source_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DockerVolumeDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) autoprovision: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) driver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) driver_opts: Option<Labels>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) labels: Option<Labels>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EfsVolumeDef {
    pub(crate) file_system_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) root_directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) transit_encryption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) transit_encryption_port: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) authorization_config: Option<EfsAuthorizationDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EfsAuthorizationDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) access_point_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) iam: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PlacementConstraintDef {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub(crate) constraint_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) expression: Option<String>,
}

/// Converts an empty slice to None so that absent fields stay absent in the document
fn vec_opt<T: Clone>(values: &[T]) -> Option<Vec<T>> {
    (!values.is_empty()).then(|| values.to_vec())
}

fn labels_opt(labels: Option<&std::collections::HashMap<String, String>>) -> Option<Labels> {
    labels.map(|map| {
        map.iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<Labels>()
    })
}

impl TaskDef {
    /// Builds a document from the task definition returned by DescribeTaskDefinition
    pub(crate) fn from_sdk(task_def: &ecs::TaskDefinition) -> Result<Self> {
        let container_definitions = task_def
            .container_definitions()
            .iter()
            .map(ContainerDef::from_sdk)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            family: task_def
                .family()
                .context(error::MissingFieldSnafu { field: "family" })?
                .to_string(),
            task_role_arn: task_def.task_role_arn().map(str::to_string),
            execution_role_arn: task_def.execution_role_arn().map(str::to_string),
            network_mode: task_def.network_mode().map(|mode| mode.as_str().to_string()),
            container_definitions,
            volumes: Some(
                task_def
                    .volumes()
                    .iter()
                    .map(VolumeDef::from_sdk)
                    .collect::<Vec<_>>(),
            ),
            placement_constraints: Some(
                task_def
                    .placement_constraints()
                    .iter()
                    .map(PlacementConstraintDef::from_sdk)
                    .collect::<Vec<_>>(),
            ),
            requires_compatibilities: vec_opt(task_def.requires_compatibilities())
                .map(|compat| compat.iter().map(|c| c.as_str().to_string()).collect()),
            cpu: task_def.cpu().map(str::to_string),
            memory: task_def.memory().map(str::to_string),
        })
    }
}

impl ContainerDef {
    fn from_sdk(container: &ecs::ContainerDefinition) -> Result<Self> {
        Ok(Self {
            name: container
                .name()
                .context(error::MissingFieldSnafu {
                    field: "containerDefinitions[].name",
                })?
                .to_string(),
            image: container
                .image()
                .context(error::MissingFieldSnafu {
                    field: "containerDefinitions[].image",
                })?
                .to_string(),
            cpu: (container.cpu() != 0).then(|| container.cpu()),
            memory: container.memory(),
            memory_reservation: container.memory_reservation(),
            essential: container.essential(),
            entry_point: vec_opt(container.entry_point()),
            command: vec_opt(container.command()),
            working_directory: container.working_directory().map(str::to_string),
            environment: vec_opt(container.environment()).map(|env| {
                env.iter()
                    .map(|kv| KeyValueDef {
                        name: kv.name().map(str::to_string),
                        value: kv.value().map(str::to_string),
                    })
                    .collect()
            }),
            secrets: vec_opt(container.secrets())
                .map(|secrets| secrets.iter().map(SecretDef::from_sdk).collect()),
            port_mappings: vec_opt(container.port_mappings()).map(|mappings| {
                mappings
                    .iter()
                    .map(|mapping| PortMappingDef {
                        name: mapping.name().map(str::to_string),
                        container_port: mapping.container_port(),
                        host_port: mapping.host_port(),
                        protocol: mapping.protocol().map(|p| p.as_str().to_string()),
                    })
                    .collect()
            }),
            mount_points: vec_opt(container.mount_points()).map(|mounts| {
                mounts
                    .iter()
                    .map(|mount| MountPointDef {
                        source_volume: mount.source_volume().map(str::to_string),
                        container_path: mount.container_path().map(str::to_string),
                        read_only: mount.read_only(),
                    })
                    .collect()
            }),
            volumes_from: vec_opt(container.volumes_from()).map(|volumes| {
                volumes
                    .iter()
                    .map(|volume| VolumeFromDef {
                        source_container: volume.source_container().map(str::to_string),
                        read_only: volume.read_only(),
                    })
                    .collect()
            }),
            depends_on: vec_opt(container.depends_on()).map(|deps| {
                deps.iter()
                    .map(|dep| DependencyDef {
                        container_name: dep.container_name().to_string(),
                        condition: dep.condition().as_str().to_string(),
                    })
                    .collect()
            }),
            links: vec_opt(container.links()),
            docker_labels: labels_opt(container.docker_labels()),
            ulimits: vec_opt(container.ulimits()).map(|ulimits| {
                ulimits
                    .iter()
                    .map(|ulimit| UlimitDef {
                        name: ulimit.name().as_str().to_string(),
                        soft_limit: ulimit.soft_limit(),
                        hard_limit: ulimit.hard_limit(),
                    })
                    .collect()
            }),
            log_configuration: container.log_configuration().map(|config| {
                LogConfigurationDef {
                    log_driver: config.log_driver().as_str().to_string(),
                    options: labels_opt(config.options()),
                    secret_options: vec_opt(config.secret_options())
                        .map(|secrets| secrets.iter().map(SecretDef::from_sdk).collect()),
                }
            }),
            health_check: container.health_check().map(|check| HealthCheckDef {
                command: check.command().to_vec(),
                interval: check.interval(),
                timeout: check.timeout(),
                retries: check.retries(),
                start_period: check.start_period(),
            }),
        })
    }

    /// Builds the SDK container definition submitted to RegisterTaskDefinition
    pub(crate) fn to_sdk(&self) -> Result<ecs::ContainerDefinition> {
        let secrets = match &self.secrets {
            Some(secrets) => Some(
                secrets
                    .iter()
                    .map(SecretDef::to_sdk)
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => None,
        };

        let depends_on = match &self.depends_on {
            Some(deps) => Some(
                deps.iter()
                    .map(|dep| {
                        ecs::ContainerDependency::builder()
                            .container_name(&dep.container_name)
                            .condition(ecs::ContainerCondition::from(dep.condition.as_str()))
                            .build()
                            .context(error::BuildSnafu {
                                what: "container dependency",
                            })
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => None,
        };

        let ulimits = match &self.ulimits {
            Some(ulimits) => Some(
                ulimits
                    .iter()
                    .map(|ulimit| {
                        ecs::Ulimit::builder()
                            .name(ecs::UlimitName::from(ulimit.name.as_str()))
                            .soft_limit(ulimit.soft_limit)
                            .hard_limit(ulimit.hard_limit)
                            .build()
                            .context(error::BuildSnafu { what: "ulimit" })
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => None,
        };

        let log_configuration = match &self.log_configuration {
            Some(config) => {
                let secret_options = match &config.secret_options {
                    Some(secrets) => Some(
                        secrets
                            .iter()
                            .map(SecretDef::to_sdk)
                            .collect::<Result<Vec<_>>>()?,
                    ),
                    None => None,
                };
                Some(
                    ecs::LogConfiguration::builder()
                        .log_driver(ecs::LogDriver::from(config.log_driver.as_str()))
                        .set_options(config.options.clone().map(|map| map.into_iter().collect()))
                        .set_secret_options(secret_options)
                        .build()
                        .context(error::BuildSnafu {
                            what: "log configuration",
                        })?,
                )
            }
            None => None,
        };

        let health_check = match &self.health_check {
            Some(check) => Some(
                ecs::HealthCheck::builder()
                    .set_command(Some(check.command.clone()))
                    .set_interval(check.interval)
                    .set_timeout(check.timeout)
                    .set_retries(check.retries)
                    .set_start_period(check.start_period)
                    .build()
                    .context(error::BuildSnafu {
                        what: "health check",
                    })?,
            ),
            None => None,
        };

        Ok(ecs::ContainerDefinition::builder()
            .name(&self.name)
            .image(&self.image)
            .set_cpu(self.cpu)
            .set_memory(self.memory)
            .set_memory_reservation(self.memory_reservation)
            .set_essential(self.essential)
            .set_entry_point(self.entry_point.clone())
            .set_command(self.command.clone())
            .set_working_directory(self.working_directory.clone())
            .set_environment(self.environment.as_ref().map(|env| {
                env.iter()
                    .map(|kv| {
                        ecs::KeyValuePair::builder()
                            .set_name(kv.name.clone())
                            .set_value(kv.value.clone())
                            .build()
                    })
                    .collect()
            }))
            .set_secrets(secrets)
            .set_port_mappings(self.port_mappings.as_ref().map(|mappings| {
                mappings
                    .iter()
                    .map(|mapping| {
                        ecs::PortMapping::builder()
                            .set_name(mapping.name.clone())
                            .set_container_port(mapping.container_port)
                            .set_host_port(mapping.host_port)
                            .set_protocol(
                                mapping
                                    .protocol
                                    .as_deref()
                                    .map(ecs::TransportProtocol::from),
                            )
                            .build()
                    })
                    .collect()
            }))
            .set_mount_points(self.mount_points.as_ref().map(|mounts| {
                mounts
                    .iter()
                    .map(|mount| {
                        ecs::MountPoint::builder()
                            .set_source_volume(mount.source_volume.clone())
                            .set_container_path(mount.container_path.clone())
                            .set_read_only(mount.read_only)
                            .build()
                    })
                    .collect()
            }))
            .set_volumes_from(self.volumes_from.as_ref().map(|volumes| {
                volumes
                    .iter()
                    .map(|volume| {
                        ecs::VolumeFrom::builder()
                            .set_source_container(volume.source_container.clone())
                            .set_read_only(volume.read_only)
                            .build()
                    })
                    .collect()
            }))
            .set_depends_on(depends_on)
            .set_links(self.links.clone())
            .set_docker_labels(
                self.docker_labels
                    .clone()
                    .map(|labels| labels.into_iter().collect()),
            )
            .set_ulimits(ulimits)
            .set_log_configuration(log_configuration)
            .set_health_check(health_check)
            .build())
    }
}

impl SecretDef {
    fn from_sdk(secret: &ecs::Secret) -> Self {
        Self {
            name: secret.name().to_string(),
            value_from: secret.value_from().to_string(),
        }
    }

    fn to_sdk(&self) -> Result<ecs::Secret> {
        ecs::Secret::builder()
            .name(&self.name)
            .value_from(&self.value_from)
            .build()
            .context(error::BuildSnafu { what: "secret" })
    }
}

impl VolumeDef {
    fn from_sdk(volume: &ecs::Volume) -> Self {
        Self {
            name: volume.name().map(str::to_string),
            host: volume.host().map(|host| HostVolumeDef {
                source_path: host.source_path().map(str::to_string),
            }),
            docker_volume_configuration: volume.docker_volume_configuration().map(|config| {
                DockerVolumeDef {
                    scope: config.scope().map(|scope| scope.as_str().to_string()),
                    autoprovision: config.autoprovision(),
                    driver: config.driver().map(str::to_string),
                    driver_opts: labels_opt(config.driver_opts()),
                    labels: labels_opt(config.labels()),
                }
            }),
            efs_volume_configuration: volume.efs_volume_configuration().map(|config| {
                EfsVolumeDef {
                    file_system_id: config.file_system_id().to_string(),
                    root_directory: config.root_directory().map(str::to_string),
                    transit_encryption: config
                        .transit_encryption()
                        .map(|encryption| encryption.as_str().to_string()),
                    transit_encryption_port: config.transit_encryption_port(),
                    authorization_config: config.authorization_config().map(|auth| {
                        EfsAuthorizationDef {
                            access_point_id: auth.access_point_id().map(str::to_string),
                            iam: auth.iam().map(|iam| iam.as_str().to_string()),
                        }
                    }),
                }
            }),
        }
    }

    pub(crate) fn to_sdk(&self) -> Result<ecs::Volume> {
        let efs_volume_configuration = match &self.efs_volume_configuration {
            Some(config) => Some(
                ecs::EfsVolumeConfiguration::builder()
                    .file_system_id(&config.file_system_id)
                    .set_root_directory(config.root_directory.clone())
                    .set_transit_encryption(
                        config
                            .transit_encryption
                            .as_deref()
                            .map(ecs::EfsTransitEncryption::from),
                    )
                    .set_transit_encryption_port(config.transit_encryption_port)
                    .set_authorization_config(config.authorization_config.as_ref().map(|auth| {
                        ecs::EfsAuthorizationConfig::builder()
                            .set_access_point_id(auth.access_point_id.clone())
                            .set_iam(
                                auth.iam
                                    .as_deref()
                                    .map(ecs::EfsAuthorizationConfigIam::from),
                            )
                            .build()
                    }))
                    .build()
                    .context(error::BuildSnafu {
                        what: "EFS volume configuration",
                    })?,
            ),
            None => None,
        };

        Ok(ecs::Volume::builder()
            .set_name(self.name.clone())
            .set_host(self.host.as_ref().map(|host| {
                ecs::HostVolumeProperties::builder()
                    .set_source_path(host.source_path.clone())
                    .build()
            }))
            .set_docker_volume_configuration(self.docker_volume_configuration.as_ref().map(
                |config| {
                    ecs::DockerVolumeConfiguration::builder()
                        .set_scope(config.scope.as_deref().map(ecs::Scope::from))
                        .set_autoprovision(config.autoprovision)
                        .set_driver(config.driver.clone())
                        .set_driver_opts(
                            config
                                .driver_opts
                                .clone()
                                .map(|opts| opts.into_iter().collect()),
                        )
                        .set_labels(
                            config
                                .labels
                                .clone()
                                .map(|labels| labels.into_iter().collect()),
                        )
                        .build()
                },
            ))
            .set_efs_volume_configuration(efs_volume_configuration)
            .build())
    }
}

impl PlacementConstraintDef {
    fn from_sdk(constraint: &ecs::TaskDefinitionPlacementConstraint) -> Self {
        Self {
            constraint_type: constraint
                .r#type()
                .map(|constraint_type| constraint_type.as_str().to_string()),
            expression: constraint.expression().map(str::to_string),
        }
    }

    pub(crate) fn to_sdk(&self) -> ecs::TaskDefinitionPlacementConstraint {
        ecs::TaskDefinitionPlacementConstraint::builder()
            .set_type(
                self.constraint_type
                    .as_deref()
                    .map(ecs::TaskDefinitionPlacementConstraintType::from),
            )
            .set_expression(self.expression.clone())
            .build()
    }
}

mod error {
    use aws_smithy_types::error::operation::BuildError;
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(crate) enum Error {
        #[snafu(display("Failed to build {}: {}", what, source))]
        Build { what: String, source: BuildError },

        #[snafu(display("Task definition was missing {}", field))]
        MissingField { field: String },
    }
}
pub(crate) use error::Error;
type Result<T> = std::result::Result<T, error::Error>;

#[cfg(test)]
mod test {
    use super::TaskDef;
    use aws_sdk_ecs::types as ecs;
    use serde_json::json;

    fn fargate_task_definition() -> ecs::TaskDefinition {
        ecs::TaskDefinition::builder()
            .family("web-service")
            .execution_role_arn("arn:aws:iam::123456789012:role/ecsTaskExecutionRole")
            .requires_compatibilities(ecs::Compatibility::Fargate)
            .cpu("256")
            .memory("512")
            .container_definitions(
                ecs::ContainerDefinition::builder()
                    .name("web")
                    .image("repo/img:1.0")
                    .essential(true)
                    .port_mappings(
                        ecs::PortMapping::builder()
                            .container_port(8080)
                            .protocol(ecs::TransportProtocol::Tcp)
                            .build(),
                    )
                    .build(),
            )
            .build()
    }

    #[test]
    fn document_from_describe_output() {
        let task_def = TaskDef::from_sdk(&fargate_task_definition()).unwrap();

        assert_eq!(task_def.family, "web-service");
        assert_eq!(task_def.network_mode, None);
        assert_eq!(task_def.task_role_arn, None);
        assert_eq!(
            task_def.requires_compatibilities,
            Some(vec!["FARGATE".to_string()])
        );
        assert_eq!(task_def.cpu.as_deref(), Some("256"));
        assert_eq!(task_def.memory.as_deref(), Some("512"));

        let container = &task_def.container_definitions[0];
        assert_eq!(container.name, "web");
        assert_eq!(container.image, "repo/img:1.0");
        assert_eq!(container.essential, Some(true));
        let mapping = &container.port_mappings.as_ref().unwrap()[0];
        assert_eq!(mapping.container_port, Some(8080));
        assert_eq!(mapping.protocol.as_deref(), Some("tcp"));
    }

    #[test]
    fn document_serializes_with_ecs_field_names() {
        let task_def = TaskDef::from_sdk(&fargate_task_definition()).unwrap();
        let value = serde_json::to_value(&task_def).unwrap();

        assert_eq!(value["family"], json!("web-service"));
        assert_eq!(
            value["executionRoleArn"],
            json!("arn:aws:iam::123456789012:role/ecsTaskExecutionRole")
        );
        assert_eq!(value["requiresCompatibilities"], json!(["FARGATE"]));
        assert_eq!(
            value["containerDefinitions"][0]["portMappings"][0]["containerPort"],
            json!(8080)
        );

        // Absent source fields stay absent rather than serializing as null
        assert!(value.get("networkMode").is_none());
        assert!(value.get("taskRoleArn").is_none());
    }

    #[test]
    fn document_parses_caller_supplied_json() {
        let task_def: TaskDef = serde_json::from_value(json!({
            "family": "api",
            "networkMode": "awsvpc",
            "containerDefinitions": [
                {
                    "name": "api",
                    "image": "repo/api:3.1",
                    "environment": [{"name": "MODE", "value": "prod"}],
                    "dockerLabels": {"team": "platform"}
                }
            ],
            "volumes": []
        }))
        .unwrap();

        assert_eq!(task_def.network_mode.as_deref(), Some("awsvpc"));
        assert_eq!(task_def.volumes, Some(vec![]));
        let container = &task_def.container_definitions[0];
        assert_eq!(
            container.docker_labels.as_ref().unwrap().get("team"),
            Some(&"platform".to_string())
        );
    }
}
