//! The config module owns the definition and loading process for our configuration sources.

use log::info;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::fs;
use std::path::Path;

/// Configuration for a deployment run, typically loaded from Deploy.toml
#[derive(Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
    // Config for talking to AWS
    pub aws: Option<AwsConfig>,
}

impl DeployConfig {
    /// Deserializes a DeployConfig from a given path
    pub fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        info!("Using deploy config at path: {}", path.display());
        let deploy_config_str = fs::read_to_string(path).context(error::FileSnafu { path })?;
        toml::from_str(&deploy_config_str).context(error::InvalidTomlSnafu { path })
    }

    /// Deserializes a DeployConfig from a given path, if it exists, otherwise builds a default
    /// config
    pub fn from_path_or_default<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        if path.as_ref().exists() {
            Self::from_path(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// AWS-specific configuration
#[derive(Debug, Default, Deserialize, Serialize, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub role: Option<String>,
    pub profile: Option<String>,
}

mod error {
    use snafu::Snafu;
    use std::io;
    use std::path::PathBuf;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub enum Error {
        #[snafu(display("Failed to read '{}': {}", path.display(), source))]
        File { path: PathBuf, source: io::Error },

        #[snafu(display("Invalid config file at '{}': {}", path.display(), source))]
        InvalidToml {
            path: PathBuf,
            source: toml::de::Error,
        },
    }
}
pub use error::Error;
pub type Result<T> = std::result::Result<T, error::Error>;

#[cfg(test)]
mod test {
    use super::{AwsConfig, DeployConfig};

    #[test]
    fn aws_table_parses() {
        let config: DeployConfig = toml::from_str(
            r#"
            [aws]
            region = "us-west-2"
            profile = "deployer"
            role = "arn:aws:iam::123456789012:role/deploy"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.aws,
            Some(AwsConfig {
                region: Some("us-west-2".to_string()),
                role: Some("arn:aws:iam::123456789012:role/deploy".to_string()),
                profile: Some("deployer".to_string()),
            })
        );
    }

    #[test]
    fn missing_file_yields_default() {
        let config = DeployConfig::from_path_or_default("nonexistent/Deploy.toml").unwrap();
        assert_eq!(config, DeployConfig::default());
    }
}
