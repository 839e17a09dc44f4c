//! The transform module owns the rendering of a new task definition revision from a source
//! definition: image substitution, the field filtering ECS expects on registration, and the
//! optional task role override.

use super::definition::TaskDef;
use snafu::ensure;
use std::collections::BTreeMap;

/// How new image references map onto the containers of a task definition
#[derive(Debug, PartialEq)]
pub(crate) enum ImageMap {
    /// A single reference applied to every container
    All(String),
    /// `NAME=IMAGE` mappings; unmapped containers keep their current image
    PerContainer(BTreeMap<String, String>),
}

impl ImageMap {
    /// Parses `--image` values: either one bare image reference, or any number of
    /// `NAME=IMAGE` mappings.
    pub(crate) fn parse<S>(values: &[S]) -> Result<Self>
    where
        S: AsRef<str>,
    {
        let mut mappings = BTreeMap::new();
        let mut bare = None;

        for value in values {
            let value = value.as_ref();
            match value.split_once('=') {
                Some((name, image)) => {
                    ensure!(
                        !name.is_empty() && !image.is_empty(),
                        error::InvalidImageSnafu { value }
                    );
                    ensure!(
                        mappings.insert(name.to_string(), image.to_string()).is_none(),
                        error::DuplicateContainerSnafu { name }
                    );
                }
                None => {
                    ensure!(bare.is_none(), error::MultipleImagesSnafu);
                    bare = Some(value.to_string());
                }
            }
        }

        match (bare, mappings.is_empty()) {
            (Some(image), true) => Ok(Self::All(image)),
            (None, false) => Ok(Self::PerContainer(mappings)),
            (Some(_), false) => error::MixedImageFormsSnafu.fail(),
            (None, true) => error::NoImagesSnafu.fail(),
        }
    }
}

/// Renders the next revision of a task definition: every container's image is replaced
/// according to the image map, and the field set is filtered the way registration expects.
///
/// `networkMode` and `taskRoleArn` are carried over only when the source has them;
/// `requiresCompatibilities`, `cpu`, and `memory` are carried over only for Fargate
/// definitions, since ECS requires them there and rejects task-level CPU/memory elsewhere.
pub(crate) fn new_revision(
    source: &TaskDef,
    images: &ImageMap,
    task_role_override: Option<&str>,
) -> Result<TaskDef> {
    ensure!(
        !source.container_definitions.is_empty(),
        error::NoContainersSnafu {
            family: source.family.as_str()
        }
    );

    if let ImageMap::PerContainer(mappings) = images {
        for name in mappings.keys() {
            ensure!(
                source
                    .container_definitions
                    .iter()
                    .any(|container| &container.name == name),
                error::UnknownContainerSnafu {
                    name: name.as_str(),
                    family: source.family.as_str()
                }
            );
        }
    }

    let container_definitions = source
        .container_definitions
        .iter()
        .map(|container| {
            let mut container = container.clone();
            match images {
                ImageMap::All(image) => container.image = image.clone(),
                ImageMap::PerContainer(mappings) => {
                    if let Some(image) = mappings.get(&container.name) {
                        container.image = image.clone();
                    }
                }
            }
            container
        })
        .collect();

    let fargate = source
        .requires_compatibilities
        .as_deref()
        .map_or(false, |compat| compat.iter().any(|c| c == "FARGATE"));

    Ok(TaskDef {
        family: source.family.clone(),
        task_role_arn: task_role_override
            .map(str::to_string)
            .or_else(|| source.task_role_arn.clone()),
        execution_role_arn: source.execution_role_arn.clone(),
        network_mode: source.network_mode.clone(),
        container_definitions,
        volumes: source.volumes.clone(),
        placement_constraints: source.placement_constraints.clone(),
        requires_compatibilities: fargate
            .then(|| source.requires_compatibilities.clone())
            .flatten(),
        cpu: fargate.then(|| source.cpu.clone()).flatten(),
        memory: fargate.then(|| source.memory.clone()).flatten(),
    })
}

mod error {
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(crate) enum Error {
        #[snafu(display("Duplicate image mapping for container '{}'", name))]
        DuplicateContainer { name: String },

        #[snafu(display("Invalid image mapping '{}'; expected NAME=IMAGE", value))]
        InvalidImage { value: String },

        #[snafu(display("Cannot mix a bare image reference with NAME=IMAGE mappings"))]
        MixedImageForms,

        #[snafu(display("More than one bare image reference; use NAME=IMAGE to target containers"))]
        MultipleImages,

        #[snafu(display("Task definition '{}' has no container definitions", family))]
        NoContainers { family: String },

        #[snafu(display("No image references given"))]
        NoImages,

        #[snafu(display("No container named '{}' in task definition '{}'", name, family))]
        UnknownContainer { name: String, family: String },
    }
}
pub(crate) use error::Error;
type Result<T> = std::result::Result<T, error::Error>;

#[cfg(test)]
mod test {
    use super::super::definition::{ContainerDef, TaskDef};
    use super::{new_revision, ImageMap};
    use std::collections::BTreeMap;

    fn container(name: &str, image: &str) -> ContainerDef {
        ContainerDef {
            name: name.to_string(),
            image: image.to_string(),
            cpu: None,
            memory: None,
            memory_reservation: None,
            essential: Some(true),
            entry_point: None,
            command: None,
            working_directory: None,
            environment: None,
            secrets: None,
            port_mappings: None,
            mount_points: None,
            volumes_from: None,
            depends_on: None,
            links: None,
            docker_labels: None,
            ulimits: None,
            log_configuration: None,
            health_check: None,
        }
    }

    fn fargate_source() -> TaskDef {
        TaskDef {
            family: "web-service".to_string(),
            task_role_arn: None,
            execution_role_arn: Some("arn:aws:iam::123456789012:role/exec".to_string()),
            network_mode: None,
            container_definitions: vec![container("web", "repo/img:1.0")],
            volumes: Some(vec![]),
            placement_constraints: Some(vec![]),
            requires_compatibilities: Some(vec!["FARGATE".to_string()]),
            cpu: Some("256".to_string()),
            memory: Some("512".to_string()),
        }
    }

    fn ec2_source() -> TaskDef {
        TaskDef {
            family: "batch".to_string(),
            task_role_arn: Some("arn:aws:iam::123456789012:role/task".to_string()),
            execution_role_arn: None,
            network_mode: Some("bridge".to_string()),
            container_definitions: vec![
                container("app", "repo/app:1.0"),
                container("sidecar", "repo/sidecar:1.0"),
            ],
            volumes: Some(vec![]),
            placement_constraints: Some(vec![]),
            requires_compatibilities: Some(vec!["EC2".to_string()]),
            cpu: Some("1024".to_string()),
            memory: Some("2048".to_string()),
        }
    }

    #[test]
    fn bare_image_replaces_every_container() {
        let images = ImageMap::All("repo/img:2.0".to_string());
        let rendered = new_revision(&ec2_source(), &images, None).unwrap();

        for container in &rendered.container_definitions {
            assert_eq!(container.image, "repo/img:2.0");
        }
    }

    #[test]
    fn mapping_replaces_only_named_containers() {
        let images = ImageMap::PerContainer(BTreeMap::from([(
            "app".to_string(),
            "repo/app:2.0".to_string(),
        )]));
        let rendered = new_revision(&ec2_source(), &images, None).unwrap();

        assert_eq!(rendered.container_definitions[0].image, "repo/app:2.0");
        assert_eq!(rendered.container_definitions[1].image, "repo/sidecar:1.0");
    }

    #[test]
    fn mapping_unknown_container_is_an_error() {
        let images = ImageMap::PerContainer(BTreeMap::from([(
            "nginx".to_string(),
            "repo/nginx:2.0".to_string(),
        )]));
        assert!(new_revision(&ec2_source(), &images, None).is_err());
    }

    #[test]
    fn network_mode_carried_only_when_present() {
        let images = ImageMap::All("repo/img:2.0".to_string());

        let rendered = new_revision(&fargate_source(), &images, None).unwrap();
        assert_eq!(rendered.network_mode, None);

        let rendered = new_revision(&ec2_source(), &images, None).unwrap();
        assert_eq!(rendered.network_mode.as_deref(), Some("bridge"));
    }

    #[test]
    fn task_role_carried_only_when_present() {
        let images = ImageMap::All("repo/img:2.0".to_string());

        let rendered = new_revision(&fargate_source(), &images, None).unwrap();
        assert_eq!(rendered.task_role_arn, None);

        let rendered = new_revision(&ec2_source(), &images, None).unwrap();
        assert_eq!(
            rendered.task_role_arn.as_deref(),
            Some("arn:aws:iam::123456789012:role/task")
        );
    }

    #[test]
    fn task_role_override_wins() {
        let images = ImageMap::All("repo/img:2.0".to_string());
        let rendered = new_revision(
            &fargate_source(),
            &images,
            Some("arn:aws:iam::123456789012:role/override"),
        )
        .unwrap();

        assert_eq!(
            rendered.task_role_arn.as_deref(),
            Some("arn:aws:iam::123456789012:role/override")
        );
    }

    #[test]
    fn fargate_keeps_task_level_sizing() {
        let images = ImageMap::All("repo/img:2.0".to_string());
        let rendered = new_revision(&fargate_source(), &images, None).unwrap();

        assert_eq!(
            rendered.requires_compatibilities,
            Some(vec!["FARGATE".to_string()])
        );
        assert_eq!(rendered.cpu.as_deref(), Some("256"));
        assert_eq!(rendered.memory.as_deref(), Some("512"));
        assert_eq!(
            rendered.execution_role_arn.as_deref(),
            Some("arn:aws:iam::123456789012:role/exec")
        );
    }

    #[test]
    fn non_fargate_drops_task_level_sizing() {
        let images = ImageMap::All("repo/img:2.0".to_string());
        let rendered = new_revision(&ec2_source(), &images, None).unwrap();

        assert_eq!(rendered.requires_compatibilities, None);
        assert_eq!(rendered.cpu, None);
        assert_eq!(rendered.memory, None);
    }

    #[test]
    fn rendering_is_deterministic() {
        let images = ImageMap::All("repo/img:2.0".to_string());
        let first = new_revision(&fargate_source(), &images, None).unwrap();
        let second = new_revision(&fargate_source(), &images, None).unwrap();

        assert_eq!(
            serde_json::to_string_pretty(&first).unwrap(),
            serde_json::to_string_pretty(&second).unwrap()
        );
    }

    #[test]
    fn image_map_parses_bare_reference() {
        let images = ImageMap::parse(&["repo/img:2.0"]).unwrap();
        assert_eq!(images, ImageMap::All("repo/img:2.0".to_string()));
    }

    #[test]
    fn image_map_parses_mappings() {
        let images = ImageMap::parse(&["app=repo/app:2.0", "sidecar=repo/sidecar:2.0"]).unwrap();
        assert_eq!(
            images,
            ImageMap::PerContainer(BTreeMap::from([
                ("app".to_string(), "repo/app:2.0".to_string()),
                ("sidecar".to_string(), "repo/sidecar:2.0".to_string()),
            ]))
        );
    }

    #[test]
    fn image_map_rejects_mixed_forms() {
        assert!(ImageMap::parse(&["repo/img:2.0", "app=repo/app:2.0"]).is_err());
    }

    #[test]
    fn image_map_rejects_repeated_bare_reference() {
        assert!(ImageMap::parse(&["repo/img:2.0", "repo/img:3.0"]).is_err());
    }

    #[test]
    fn image_map_rejects_duplicate_mapping() {
        assert!(ImageMap::parse(&["app=repo/app:2.0", "app=repo/app:3.0"]).is_err());
    }
}
