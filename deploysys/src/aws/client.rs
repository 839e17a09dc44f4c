//! The client module owns the shared AWS SDK configuration: region selection, optional named
//! profile, and optional role assumption.

use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use deploysys_config::AwsConfig;

const SESSION_NAME: &str = "deploysys";

/// Builds the SDK configuration used for every client in a run. The region comes from the
/// command line if given, then Deploy.toml, then the SDK's default provider chain; the same
/// precedence the rest of the config follows.
pub(crate) async fn build_client_config(region: Option<&str>, aws: &AwsConfig) -> SdkConfig {
    let maybe_region = region
        .map(str::to_string)
        .or_else(|| aws.region.clone())
        .map(Region::new);

    let mut loader = aws_config::defaults(BehaviorVersion::v2023_11_09());
    if let Some(region) = maybe_region.clone() {
        loader = loader.region(region);
    }
    if let Some(profile) = &aws.profile {
        loader = loader.profile_name(profile.as_str());
    }

    if let Some(role) = &aws.role {
        let mut builder = AssumeRoleProvider::builder(role.as_str()).session_name(SESSION_NAME);
        if let Some(region) = maybe_region {
            builder = builder.region(region);
        }
        let provider = match &aws.profile {
            Some(profile) => {
                builder
                    .build_from_provider(
                        aws_config::profile::ProfileFileCredentialsProvider::builder()
                            .profile_name(profile.as_str())
                            .build(),
                    )
                    .await
            }
            None => builder.build().await,
        };
        loader = loader.credentials_provider(provider);
    }

    loader.load().await
}
