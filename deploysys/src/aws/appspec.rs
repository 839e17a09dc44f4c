//! The appspec module owns the CodeDeploy deployment descriptor: building one for a target
//! container and port, writing it out, and substituting the registered task definition ARN
//! for the placeholder before the descriptor is submitted.

use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::fs;
use std::path::Path;

/// Stands in for the task definition ARN until a revision has been registered
pub(crate) const TASK_DEFINITION_PLACEHOLDER: &str = "<TASK_DEFINITION>";

/// Fargate platform version pinned in emitted appspecs
const PLATFORM_VERSION: &str = "1.4.0";

const APPSPEC_VERSION: f64 = 0.0;
const TARGET_SERVICE_TYPE: &str = "AWS::ECS::Service";

/// A CodeDeploy appspec for an ECS blue/green deployment
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct AppSpec {
    pub(crate) version: f64,
    #[serde(rename = "Resources")]
    pub(crate) resources: Vec<Resource>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Resource {
    #[serde(rename = "TargetService")]
    pub(crate) target_service: TargetService,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct TargetService {
    #[serde(rename = "Type")]
    pub(crate) resource_type: String,
    #[serde(rename = "Properties")]
    pub(crate) properties: TargetServiceProperties,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct TargetServiceProperties {
    pub(crate) task_definition: String,
    pub(crate) load_balancer_info: LoadBalancerInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) platform_version: Option<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct LoadBalancerInfo {
    pub(crate) container_name: String,
    pub(crate) container_port: u16,
}

impl AppSpec {
    /// Builds an appspec routing the given port to the given container, with the task
    /// definition left as a placeholder
    pub(crate) fn for_container(container_name: &str, container_port: u16) -> Self {
        Self {
            version: APPSPEC_VERSION,
            resources: vec![Resource {
                target_service: TargetService {
                    resource_type: TARGET_SERVICE_TYPE.to_string(),
                    properties: TargetServiceProperties {
                        task_definition: TASK_DEFINITION_PLACEHOLDER.to_string(),
                        load_balancer_info: LoadBalancerInfo {
                            container_name: container_name.to_string(),
                            container_port,
                        },
                        platform_version: Some(PLATFORM_VERSION.to_string()),
                    },
                },
            }],
        }
    }

    pub(crate) fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let appspec_str = fs::read_to_string(path).context(error::FileSnafu {
            op: "read",
            path,
        })?;
        serde_yaml::from_str(&appspec_str).context(error::InvalidYamlSnafu { path })
    }

    /// Writes the appspec, replacing any existing file at the path
    pub(crate) fn write<P>(&self, path: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        fs::write(path, self.to_yaml()?).context(error::FileSnafu { op: "write", path })
    }

    pub(crate) fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context(error::SerializeSnafu)
    }

    /// Points placeholder task definition references at the given ARN. References that
    /// already name a concrete task definition are left alone.
    pub(crate) fn substitute_task_definition(&mut self, arn: &str) {
        for resource in &mut self.resources {
            let properties = &mut resource.target_service.properties;
            if properties.task_definition == TASK_DEFINITION_PLACEHOLDER {
                properties.task_definition = arn.to_string();
            }
        }
    }
}

mod error {
    use snafu::Snafu;
    use std::io;
    use std::path::PathBuf;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(crate) enum Error {
        #[snafu(display("Failed to {} '{}': {}", op, path.display(), source))]
        File {
            op: String,
            path: PathBuf,
            source: io::Error,
        },

        #[snafu(display("Invalid appspec at '{}': {}", path.display(), source))]
        InvalidYaml {
            path: PathBuf,
            source: serde_yaml::Error,
        },

        #[snafu(display("Failed to serialize appspec: {}", source))]
        Serialize { source: serde_yaml::Error },
    }
}
pub(crate) use error::Error;
type Result<T> = std::result::Result<T, error::Error>;

#[cfg(test)]
mod test {
    use super::{AppSpec, TASK_DEFINITION_PLACEHOLDER};

    const ARN: &str = "arn:aws:ecs:us-west-2:123456789012:task-definition/web-service:4";

    #[test]
    fn emitted_appspec_names_container_and_port() {
        let appspec = AppSpec::for_container("web", 8080);
        let yaml = appspec.to_yaml().unwrap();

        assert!(yaml.contains("ContainerName: web"));
        assert!(yaml.contains("ContainerPort: 8080"));
        assert!(yaml.contains("PlatformVersion: 1.4.0"));
        assert!(yaml.contains(TASK_DEFINITION_PLACEHOLDER));
    }

    #[test]
    fn substitution_replaces_placeholder() {
        let mut appspec = AppSpec::for_container("web", 8080);
        appspec.substitute_task_definition(ARN);

        assert_eq!(
            appspec.resources[0].target_service.properties.task_definition,
            ARN
        );
    }

    #[test]
    fn substitution_leaves_concrete_references_alone() {
        let mut appspec = AppSpec::for_container("web", 8080);
        appspec.resources[0].target_service.properties.task_definition =
            "arn:aws:ecs:us-west-2:123456789012:task-definition/web-service:3".to_string();
        appspec.substitute_task_definition(ARN);

        assert_eq!(
            appspec.resources[0].target_service.properties.task_definition,
            "arn:aws:ecs:us-west-2:123456789012:task-definition/web-service:3"
        );
    }

    #[test]
    fn write_overwrites_existing_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("appspec_ecs.yaml");
        std::fs::write(&path, "stale contents").unwrap();

        let appspec = AppSpec::for_container("web", 8080);
        appspec.write(&path).unwrap();

        let reread = AppSpec::from_path(&path).unwrap();
        assert_eq!(reread, appspec);
    }

    #[test]
    fn caller_supplied_appspec_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("appspec_ecs.yaml");
        std::fs::write(
            &path,
            r#"
version: 0.0
Resources:
  - TargetService:
      Type: AWS::ECS::Service
      Properties:
        TaskDefinition: <TASK_DEFINITION>
        LoadBalancerInfo:
          ContainerName: api
          ContainerPort: 9000
"#,
        )
        .unwrap();

        let appspec = AppSpec::from_path(&path).unwrap();
        let properties = &appspec.resources[0].target_service.properties;
        assert_eq!(properties.load_balancer_info.container_name, "api");
        assert_eq!(properties.load_balancer_info.container_port, 9000);
        assert_eq!(properties.platform_version, None);
    }
}
