mod cli;
mod cluster;
mod error;
mod execution;
#[cfg(test)]
mod fake;
mod launch;
mod runner;
mod template;
mod types;
mod wait;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::cli::{Cli, CONFIG_EXIT_CODE};
use crate::cluster::KubeCluster;
use crate::runner::{exit_code, Runner};

#[tokio::main]
async fn main() {
    // stdout carries the pod's log.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let job = match cli.job(|key| std::env::var(key).ok()) {
        Ok(job) => job,
        Err(error) => {
            tracing::error!(%error);
            std::process::exit(CONFIG_EXIT_CODE);
        }
    };

    let cluster = match KubeCluster::connect(cli.kubeconfig.as_deref()).await {
        Ok(cluster) => cluster,
        Err(error) => {
            tracing::error!(%error, "unable to load cluster configuration");
            std::process::exit(CONFIG_EXIT_CODE);
        }
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping job");
            on_signal.cancel();
        }
    });

    let span = tracing::info_span!(
        "job",
        instance = %job.instance,
        name = %job.name,
        template = %job.template
    );
    let runner = Runner::new(cluster);
    let mut stdout = tokio::io::stdout();
    let res = runner
        .run(&job, &mut stdout, &cancel)
        .instrument(span)
        .await;
    if let Err(error) = &res {
        tracing::error!(%error, kind = ?error.kind(), "job failed");
    }

    std::process::exit(exit_code(&res));
}
