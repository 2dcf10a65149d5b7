use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Pod template {name:?} not found in {namespace:?} namespace")]
    TemplateNotFound { name: String, namespace: String },
    #[error("Failed to get pod template: {0}")]
    GetTemplateFailed(#[source] kube::Error),
    #[error("Template marker {marker} does not match {expected:?}")]
    MarkerMismatch {
        marker: &'static str,
        expected: String,
    },
    #[error("Only one container per pod is supported, {template:?} has {count}")]
    ContainerCount { template: String, count: usize },
    #[error("Failed to create pod: {0}")]
    CreatePodFailed(#[source] kube::Error),
    #[error("MissingObjectKey: {0}")]
    MissingObjectKey(&'static str),
    #[error("No pod is bound to the execution")]
    NoPod,
    #[error("Timed out waiting for pod {name:?} to {condition}")]
    PollTimeout {
        name: String,
        condition: &'static str,
    },
    #[error("Failed to get pod: {0}")]
    GetPodFailed(#[source] kube::Error),
    #[error("Failed to open log stream: {0}")]
    OpenLogStreamFailed(#[source] kube::Error),
    #[error("Failed to read log stream: {0}")]
    ReadLogStreamFailed(#[source] kube::Error),
    #[error("Failed to copy logs: {0}")]
    CopyLogsFailed(#[source] std::io::Error),
    #[error("Error deleting pod {name:?} in {namespace:?} namespace: {source}")]
    DeletePodFailed {
        name: String,
        namespace: String,
        #[source]
        source: kube::Error,
    },
    #[error("Cancelled")]
    Cancelled,
}

/// Coarse failure classes of a job run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Launch,
    PollTimeout,
    Stream,
    Delete,
    Cluster,
    Cancelled,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TemplateNotFound { .. } => ErrorKind::NotFound,
            Error::MarkerMismatch { .. } | Error::ContainerCount { .. } => ErrorKind::Validation,
            Error::CreatePodFailed(_) | Error::MissingObjectKey(_) => ErrorKind::Launch,
            Error::PollTimeout { .. } => ErrorKind::PollTimeout,
            Error::OpenLogStreamFailed(_)
            | Error::ReadLogStreamFailed(_)
            | Error::CopyLogsFailed(_) => ErrorKind::Stream,
            Error::DeletePodFailed { .. } => ErrorKind::Delete,
            Error::GetTemplateFailed(_) | Error::GetPodFailed(_) | Error::NoPod => {
                ErrorKind::Cluster
            }
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }
}

/// Whether a cluster error is the API server reporting a missing object.
pub fn is_not_found(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 404)
}
