//! The codedeploy module owns the CreateDeployment call that hands the rollout to CodeDeploy.

use aws_sdk_codedeploy::types::{AppSpecContent, RevisionLocation, RevisionLocationType};
use aws_sdk_codedeploy::Client as CodeDeployClient;
use log::info;
use snafu::{OptionExt, ResultExt};

/// Creates a deployment in the given application and deployment group, with the appspec
/// passed inline as the revision. Returns the deployment id; the rollout itself is
/// CodeDeploy's from here on.
pub(crate) async fn create_deployment(
    client: &CodeDeployClient,
    application: &str,
    deployment_group: &str,
    appspec_content: &str,
) -> Result<String> {
    let revision = RevisionLocation::builder()
        .revision_type(RevisionLocationType::AppSpecContent)
        .app_spec_content(AppSpecContent::builder().content(appspec_content).build())
        .build();

    info!(
        "Creating deployment in application '{}', deployment group '{}'",
        application, deployment_group
    );
    let response = client
        .create_deployment()
        .application_name(application)
        .deployment_group_name(deployment_group)
        .revision(revision)
        .send()
        .await
        .context(error::CreateDeploymentSnafu {
            application,
            deployment_group,
        })?;

    let deployment_id = response
        .deployment_id()
        .context(error::MissingInResponseSnafu {
            request_type: "CreateDeployment",
            missing: "deployment id",
        })?;

    Ok(deployment_id.to_string())
}

mod error {
    use aws_sdk_codedeploy::error::SdkError;
    use aws_sdk_codedeploy::operation::create_deployment::CreateDeploymentError;
    use aws_smithy_types::error::display::DisplayErrorContext;
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(crate) enum Error {
        #[snafu(display(
            "Failed to create deployment in application '{}', deployment group '{}': {}",
            application,
            deployment_group,
            DisplayErrorContext(source)
        ))]
        CreateDeployment {
            application: String,
            deployment_group: String,
            source: SdkError<CreateDeploymentError>,
        },

        #[snafu(display("Response to {} was missing {}", request_type, missing))]
        MissingInResponse {
            request_type: String,
            missing: String,
        },
    }
}
pub(crate) use error::Error;
type Result<T> = std::result::Result<T, error::Error>;
