use std::path::Path;

use futures_util::future::BoxFuture;
use futures_util::stream::{BoxStream, StreamExt, TryStreamExt};
use k8s_openapi::api::core::v1::{Pod, PodTemplate};
use kube::api::{Api, DeleteParams, LogParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

/// Chunks of a followed container log.
pub type LogStream<'a> = BoxStream<'a, kube::Result<Vec<u8>>>;

/// Access to the cluster objects a job run needs.
pub trait Cluster: Send + Sync {
    /// Namespace used when the job does not name one.
    fn default_namespace(&self) -> &str;

    fn get_template<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, kube::Result<PodTemplate>>;

    /// Pod operations scoped to one namespace.
    fn pods(&self, namespace: &str) -> Box<dyn PodAccessor>;
}

/// Pod operations within a single namespace.
pub trait PodAccessor: Send + Sync {
    fn namespace(&self) -> &str;

    fn create<'a>(&'a self, pod: &'a Pod) -> BoxFuture<'a, kube::Result<Pod>>;

    fn get<'a>(&'a self, name: &'a str) -> BoxFuture<'a, kube::Result<Pod>>;

    fn delete<'a>(&'a self, name: &'a str) -> BoxFuture<'a, kube::Result<()>>;

    /// Opens a log stream following the pod's container until it exits.
    fn log_stream<'a>(&'a self, name: &'a str) -> BoxFuture<'a, kube::Result<LogStream<'a>>>;
}

pub struct KubeCluster {
    client: Client,
    namespace: String,
}

impl KubeCluster {
    /// Connects using the given kubeconfig file, or the inferred
    /// configuration (`KUBECONFIG`, `~/.kube/config`, in-cluster) if none.
    pub async fn connect(kubeconfig: Option<&Path>) -> anyhow::Result<Self> {
        let config = match kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
            }
            None => Config::infer().await?,
        };
        let namespace = config.default_namespace.clone();
        let client = Client::try_from(config)?;

        tracing::debug!(%namespace, "connected to cluster");

        Ok(KubeCluster { client, namespace })
    }
}

impl Cluster for KubeCluster {
    fn default_namespace(&self) -> &str {
        &self.namespace
    }

    fn get_template<'a>(
        &'a self,
        namespace: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, kube::Result<PodTemplate>> {
        let api = Api::<PodTemplate>::namespaced(self.client.clone(), namespace);
        Box::pin(async move { api.get(name).await })
    }

    fn pods(&self, namespace: &str) -> Box<dyn PodAccessor> {
        Box::new(KubePods {
            api: Api::namespaced(self.client.clone(), namespace),
            namespace: namespace.to_string(),
            log_params: LogParams {
                follow: true,
                ..LogParams::default()
            },
        })
    }
}

struct KubePods {
    api: Api<Pod>,
    namespace: String,
    log_params: LogParams,
}

impl PodAccessor for KubePods {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn create<'a>(&'a self, pod: &'a Pod) -> BoxFuture<'a, kube::Result<Pod>> {
        Box::pin(async move { self.api.create(&PostParams::default(), pod).await })
    }

    fn get<'a>(&'a self, name: &'a str) -> BoxFuture<'a, kube::Result<Pod>> {
        Box::pin(self.api.get(name))
    }

    fn delete<'a>(&'a self, name: &'a str) -> BoxFuture<'a, kube::Result<()>> {
        Box::pin(async move {
            self.api
                .delete(name, &DeleteParams::default())
                .await
                .map(|_| ())
        })
    }

    fn log_stream<'a>(&'a self, name: &'a str) -> BoxFuture<'a, kube::Result<LogStream<'a>>> {
        Box::pin(async move {
            let logs = self.api.log_stream(name, &self.log_params).await?;
            Ok(logs.map_ok(|chunk| chunk.to_vec()).boxed())
        })
    }
}
