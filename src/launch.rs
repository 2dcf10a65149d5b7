use k8s_openapi::api::core::v1::{Pod, PodTemplate};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use tokio_util::sync::CancellationToken;

use crate::cluster::PodAccessor;
use crate::error::Error;
use crate::execution::Execution;
use crate::types::{generate_name, Job};
use crate::wait::{cancellable, Poll};

/// Creates a pod for `job` from a resolved template and binds an execution
/// to it.
pub async fn launch(
    pods: Box<dyn PodAccessor>,
    template: &PodTemplate,
    job: &Job,
    poll: Poll,
    cancel: &CancellationToken,
) -> Result<Execution, Error> {
    let pod = construct_pod_for_job(template, job)?;

    let pod = cancellable(cancel, pods.create(&pod))
        .await?
        .map_err(Error::CreatePodFailed)?;
    if pod.metadata.name.is_none() {
        return Err(Error::MissingObjectKey(".metadata.name"));
    }

    tracing::info!(
        pod = %pod.name(),
        namespace = %pods.namespace(),
        "created pod"
    );

    Ok(Execution::new(job.clone(), pods, pod, poll))
}

fn construct_pod_for_job(template: &PodTemplate, job: &Job) -> Result<Pod, Error> {
    let template_spec = template.template.clone().unwrap_or_default();
    let mut pod = Pod {
        metadata: ObjectMeta {
            name: None,
            namespace: None,
            generate_name: Some(generate_name(&job.name)),
            ..template_spec.metadata.unwrap_or_default()
        },
        spec: template_spec.spec,
        status: None,
    };

    let container = pod
        .spec
        .as_mut()
        .and_then(|spec| spec.containers.first_mut())
        .ok_or_else(|| Error::ContainerCount {
            template: template.name(),
            count: 0,
        })?;
    container.args = Some(job.args.clone());

    Ok(pod)
}
