use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

use crate::cluster::Cluster;
use crate::error::Error;
use crate::execution::Execution;
use crate::types::Job;
use crate::wait::Poll;
use crate::{launch, template};

/// Exit code reported when the run fails before the container's own exit
/// code is known.
pub const FAILURE_EXIT_CODE: i32 = 128;

const CLEANUP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Runner<C> {
    cluster: C,
    poll: Poll,
}

impl<C: Cluster> Runner<C> {
    pub fn new(cluster: C) -> Self {
        Runner {
            cluster,
            poll: Poll::default(),
        }
    }

    /// Resolves the job's template and creates its pod.
    pub async fn start(&self, job: &Job, cancel: &CancellationToken) -> Result<Execution, Error> {
        let namespace = job.namespace_or(self.cluster.default_namespace());
        let template = template::resolve(&self.cluster, job, namespace, cancel).await?;

        launch::launch(
            self.cluster.pods(namespace),
            &template,
            job,
            self.poll,
            cancel,
        )
        .await
    }

    /// Runs the job to completion, streaming the pod's log to `out`, and
    /// returns the container's exit code. The pod is deleted on every path
    /// once it exists; a failed deletion is logged and does not change the
    /// result.
    pub async fn run<W>(&self, job: &Job, out: &mut W, cancel: &CancellationToken) -> Result<i32, Error>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut execution = self.start(job, cancel).await?;

        let res = drive(&mut execution, out, cancel).await;

        // Runs even when `cancel` already fired.
        let cleanup = CancellationToken::new();
        let deleted = tokio::time::timeout(CLEANUP_TIMEOUT, execution.delete(&cleanup)).await;
        match deleted {
            Ok(Ok(())) => {}
            Ok(Err(error)) => tracing::error!(%error, "unable to delete pod"),
            Err(_) => tracing::error!(
                pod = ?execution.pod().and_then(|pod| pod.metadata.name.as_deref()),
                namespace = %execution.namespace(),
                "timed out deleting pod"
            ),
        }

        res
    }
}

async fn drive<W>(execution: &mut Execution, out: &mut W, cancel: &CancellationToken) -> Result<i32, Error>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    execution.copy_logs(out, cancel).await?;
    execution.wait_for_completion(cancel).await
}

/// Maps the outcome of a run to the process exit code.
pub fn exit_code(res: &Result<i32, Error>) -> i32 {
    match res {
        Ok(code) => *code,
        Err(_) => FAILURE_EXIT_CODE,
    }
}
