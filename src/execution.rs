use futures_util::stream::TryStreamExt;
use k8s_openapi::api::core::v1::Pod;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::cluster::PodAccessor;
use crate::error::Error;
use crate::types::Job;
use crate::wait::{cancellable, Poll, PollError};

const STARTED_PHASES: [&str; 3] = ["Running", "Succeeded", "Failed"];

/// A job run bound to the pod created for it.
pub struct Execution {
    job: Job,
    pods: Box<dyn PodAccessor>,
    pod: Option<Pod>,
    poll: Poll,
}

impl Execution {
    pub fn new(job: Job, pods: Box<dyn PodAccessor>, pod: Pod, poll: Poll) -> Self {
        Execution {
            job,
            pods,
            pod: Some(pod),
            poll,
        }
    }

    pub fn namespace(&self) -> &str {
        self.pods.namespace()
    }

    /// Latest observed snapshot, or `None` once the pod is deleted.
    pub fn pod(&self) -> Option<&Pod> {
        self.pod.as_ref()
    }

    fn pod_name(&self) -> Result<String, Error> {
        self.pod
            .as_ref()
            .ok_or(Error::NoPod)?
            .metadata
            .name
            .clone()
            .ok_or(Error::MissingObjectKey(".metadata.name"))
    }

    /// Waits for the pod to start and copies its log to `sink` until the
    /// container exits.
    pub async fn copy_logs<W>(&mut self, sink: &mut W, cancel: &CancellationToken) -> Result<(), Error>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.wait_until_started(cancel).await?;

        let name = self.pod_name()?;
        let mut logs = cancellable(cancel, self.pods.log_stream(&name))
            .await?
            .map_err(Error::OpenLogStreamFailed)?;

        tracing::debug!(pod = %name, "streaming pod logs");

        let copy = async {
            while let Some(chunk) = logs.try_next().await.map_err(Error::ReadLogStreamFailed)? {
                sink.write_all(&chunk).await.map_err(Error::CopyLogsFailed)?;
            }
            sink.flush().await.map_err(Error::CopyLogsFailed)
        };
        cancellable(cancel, copy).await?
    }

    async fn wait_until_started(&mut self, cancel: &CancellationToken) -> Result<(), Error> {
        let name = self.pod_name()?;
        let pods = &*self.pods;
        let pod = &mut self.pod;
        let name_ref = name.as_str();

        self.poll
            .until(cancel, move || pods.get(name_ref), |fresh: Pod| {
                let started = fresh
                    .status
                    .as_ref()
                    .and_then(|status| status.phase.as_deref())
                    .map_or(false, |phase| STARTED_PHASES.contains(&phase));
                *pod = Some(fresh);
                started.then(|| ())
            })
            .await
            .map_err(|error| poll_error(error, name.clone(), "start"))
    }

    /// Waits for the pod's container to terminate and returns its exit code.
    pub async fn wait_for_completion(&mut self, cancel: &CancellationToken) -> Result<i32, Error> {
        let name = self.pod_name()?;
        let pods = &*self.pods;
        let pod = &mut self.pod;
        let name_ref = name.as_str();

        let exit_code = self
            .poll
            .until(cancel, move || pods.get(name_ref), |fresh: Pod| {
                let exit_code = fresh
                    .status
                    .as_ref()
                    .and_then(|status| status.container_statuses.as_ref())
                    .and_then(|statuses| statuses.first())
                    .and_then(|status| status.state.as_ref())
                    .and_then(|state| state.terminated.as_ref())
                    .map(|terminated| terminated.exit_code);
                *pod = Some(fresh);
                exit_code
            })
            .await
            .map_err(|error| poll_error(error, name.clone(), "terminate"))?;

        tracing::info!(pod = %name, job = %self.job.name, exit_code, "container terminated");

        Ok(exit_code)
    }

    /// Deletes the pod. Does nothing if no pod is bound any more.
    pub async fn delete(&mut self, cancel: &CancellationToken) -> Result<(), Error> {
        let name = match self.pod.as_ref().and_then(|pod| pod.metadata.name.clone()) {
            Some(name) => name,
            None => return Ok(()),
        };
        let namespace = self.pods.namespace().to_string();

        cancellable(cancel, self.pods.delete(&name))
            .await?
            .map_err(|source| Error::DeletePodFailed {
                name: name.clone(),
                namespace: namespace.clone(),
                source,
            })?;

        tracing::info!(pod = %name, %namespace, "deleted pod");

        self.pod = None;

        Ok(())
    }
}

fn poll_error(error: PollError<kube::Error>, name: String, condition: &'static str) -> Error {
    match error {
        PollError::Timeout => Error::PollTimeout { name, condition },
        PollError::Cancelled => Error::Cancelled,
        PollError::Failed(error) => Error::GetPodFailed(error),
    }
}
