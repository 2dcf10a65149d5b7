use k8s_openapi::api::core::v1::PodTemplate;
use kube::ResourceExt;
use tokio_util::sync::CancellationToken;

use crate::cluster::Cluster;
use crate::error::{is_not_found, Error};
use crate::types::{name_prefix, Job, INSTANCE_ANNOTATION, PREFIX_ANNOTATION};
use crate::wait::cancellable;

/// Fetches the job's pod template from `namespace` and checks that the job
/// is allowed to instantiate it.
pub async fn resolve<C: Cluster + ?Sized>(
    cluster: &C,
    job: &Job,
    namespace: &str,
    cancel: &CancellationToken,
) -> Result<PodTemplate, Error> {
    let template = cancellable(cancel, cluster.get_template(namespace, &job.template))
        .await?
        .map_err(|error| {
            if is_not_found(&error) {
                Error::TemplateNotFound {
                    name: job.template.clone(),
                    namespace: namespace.to_string(),
                }
            } else {
                Error::GetTemplateFailed(error)
            }
        })?;

    check_marker(&template, INSTANCE_ANNOTATION, &job.instance.to_lowercase())?;
    check_marker(&template, PREFIX_ANNOTATION, &name_prefix(&job.name))?;

    let count = template
        .template
        .as_ref()
        .and_then(|spec| spec.spec.as_ref())
        .map_or(0, |spec| spec.containers.len());
    if count != 1 {
        return Err(Error::ContainerCount {
            template: template.name(),
            count,
        });
    }

    tracing::debug!(template = %template.name(), %namespace, "resolved pod template");

    Ok(template)
}

fn check_marker(template: &PodTemplate, marker: &'static str, expected: &str) -> Result<(), Error> {
    let value = template
        .annotations()
        .get(marker)
        .or_else(|| template.labels().get(marker))
        .map(|value| value.to_lowercase())
        .unwrap_or_default();

    if value != expected {
        return Err(Error::MarkerMismatch {
            marker,
            expected: expected.to_string(),
        });
    }

    Ok(())
}
