//! In-memory cluster used by the unit tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use futures_util::stream::{self, StreamExt};
use k8s_openapi::api::core::v1::{Pod, PodTemplate};
use kube::error::ErrorResponse;

use crate::cluster::{Cluster, LogStream, PodAccessor};

pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{} ({})", reason, code),
        reason: reason.to_string(),
        code,
    })
}

pub fn template(name: &str, namespace: &str, instance: &str, prefix: &str) -> PodTemplate {
    serde_json::from_value(serde_json::json!({
        "metadata": {
            "name": name,
            "namespace": namespace,
            "annotations": {
                "batch.example.com/instance": instance,
                "batch.example.com/prefix": prefix,
            },
        },
        "template": {
            "metadata": {
                "name": "ignored",
                "namespace": "ignored",
                "labels": { "app": "batch" },
            },
            "spec": {
                "restartPolicy": "Never",
                "containers": [{
                    "name": "main",
                    "image": "busybox",
                    "args": ["from", "template"],
                }],
            },
        },
    }))
    .unwrap()
}

pub fn pod_in_phase(phase: &str) -> Pod {
    serde_json::from_value(serde_json::json!({
        "metadata": { "name": "test-job-abcde", "namespace": "batch" },
        "status": { "phase": phase },
    }))
    .unwrap()
}

pub fn pod_with_no_statuses() -> Pod {
    serde_json::from_value(serde_json::json!({
        "metadata": { "name": "test-job-abcde", "namespace": "batch" },
        "status": { "phase": "Running", "containerStatuses": [] },
    }))
    .unwrap()
}

pub fn pod_running() -> Pod {
    serde_json::from_value(serde_json::json!({
        "metadata": { "name": "test-job-abcde", "namespace": "batch" },
        "status": {
            "phase": "Running",
            "containerStatuses": [{
                "name": "main",
                "image": "busybox",
                "imageID": "",
                "ready": true,
                "restartCount": 0,
                "state": { "running": {} },
            }],
        },
    }))
    .unwrap()
}

pub fn pod_terminated(exit_code: i32) -> Pod {
    serde_json::from_value(serde_json::json!({
        "metadata": { "name": "test-job-abcde", "namespace": "batch" },
        "status": {
            "phase": if exit_code == 0 { "Succeeded" } else { "Failed" },
            "containerStatuses": [{
                "name": "main",
                "image": "busybox",
                "imageID": "",
                "ready": false,
                "restartCount": 0,
                "state": { "terminated": { "exitCode": exit_code } },
            }],
        },
    }))
    .unwrap()
}

#[derive(Default)]
pub struct State {
    pub templates: BTreeMap<(String, String), PodTemplate>,
    /// Pods submitted for creation, with the namespace they went to.
    pub created: Vec<(String, Pod)>,
    /// Snapshots served by `get`, in order. The last one repeats.
    pub snapshots: VecDeque<Pod>,
    pub gets: usize,
    pub logs: Vec<Vec<u8>>,
    pub log_error: Option<u16>,
    /// Fail the stream after the configured chunks.
    pub log_read_error: bool,
    pub log_opened: bool,
    pub create_error: Option<u16>,
    pub delete_error: Option<u16>,
    pub delete_calls: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeCluster {
    pub default_namespace: String,
    pub state: Arc<Mutex<State>>,
}

impl FakeCluster {
    pub fn new(default_namespace: &str) -> Self {
        FakeCluster {
            default_namespace: default_namespace.to_string(),
            state: Default::default(),
        }
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn with_template(self, template: PodTemplate) -> Self {
        let key = (
            template.metadata.namespace.clone().unwrap_or_default(),
            template.metadata.name.clone().unwrap_or_default(),
        );
        self.state().templates.insert(key, template);
        self
    }

    pub fn with_snapshots(self, snapshots: impl IntoIterator<Item = Pod>) -> Self {
        self.state().snapshots.extend(snapshots);
        self
    }

    pub fn with_logs(self, chunks: &[&str]) -> Self {
        self.state().logs = chunks.iter().map(|c| c.as_bytes().to_vec()).collect();
        self
    }
}

impl Cluster for FakeCluster {
    fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    fn get_template<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, kube::Result<PodTemplate>> {
        let found = self
            .state()
            .templates
            .get(&(namespace.to_string(), name.to_string()))
            .cloned();
        Box::pin(async move { found.ok_or_else(|| api_error(404, "NotFound")) })
    }

    fn pods(&self, namespace: &str) -> Box<dyn PodAccessor> {
        Box::new(FakePods {
            state: self.state.clone(),
            namespace: namespace.to_string(),
        })
    }
}

pub struct FakePods {
    pub state: Arc<Mutex<State>>,
    pub namespace: String,
}

impl PodAccessor for FakePods {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn create<'a>(&'a self, pod: &'a Pod) -> BoxFuture<'a, kube::Result<Pod>> {
        let mut state = self.state.lock().unwrap();
        let res = match state.create_error {
            Some(code) => Err(api_error(code, "Forbidden")),
            None => {
                state.created.push((self.namespace.clone(), pod.clone()));
                let mut created = pod.clone();
                created.metadata.name = Some(format!(
                    "{}abcde",
                    pod.metadata.generate_name.clone().unwrap_or_default()
                ));
                created.metadata.namespace = Some(self.namespace.clone());
                Ok(created)
            }
        };
        Box::pin(async move { res })
    }

    fn get<'a>(&'a self, _name: &'a str) -> BoxFuture<'a, kube::Result<Pod>> {
        let mut state = self.state.lock().unwrap();
        state.gets += 1;
        let pod = if state.snapshots.len() > 1 {
            state.snapshots.pop_front()
        } else {
            state.snapshots.front().cloned()
        };
        let res = pod.ok_or_else(|| api_error(404, "NotFound"));
        Box::pin(async move { res })
    }

    fn delete<'a>(&'a self, name: &'a str) -> BoxFuture<'a, kube::Result<()>> {
        let mut state = self.state.lock().unwrap();
        state.delete_calls.push(name.to_string());
        let res = match state.delete_error {
            Some(code) => Err(api_error(code, "InternalError")),
            None => Ok(()),
        };
        Box::pin(async move { res })
    }

    fn log_stream<'a>(&'a self, _name: &'a str) -> BoxFuture<'a, kube::Result<LogStream<'a>>> {
        let mut state = self.state.lock().unwrap();
        let res = match state.log_error {
            Some(code) => Err(api_error(code, "BadRequest")),
            None => {
                state.log_opened = true;
                let mut chunks: Vec<kube::Result<Vec<u8>>> =
                    state.logs.iter().cloned().map(Ok).collect();
                if state.log_read_error {
                    chunks.push(Err(api_error(500, "InternalError")));
                }
                Ok(stream::iter(chunks).boxed())
            }
        };
        Box::pin(async move { res })
    }
}
