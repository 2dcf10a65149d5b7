use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::types::Job;

pub const INSTANCE_ENV: &str = "AUTOSERV";
pub const JOB_NAME_ENV: &str = "AUTO_JOB_NAME";

/// Exit code for configuration problems found before contacting the cluster.
pub const CONFIG_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "jobrun",
    version,
    about = "Batch scheduler to Kubernetes bridge",
    long_about = "Runs a scheduler job as a Kubernetes pod created from a pod template, \
                  streams its log and exits with the container's exit code."
)]
pub struct Cli {
    /// Name of the pod template to instantiate.
    pub template: String,

    /// Arguments for the container, usually given after `--`.
    pub args: Vec<String>,

    /// Kubernetes client configuration file.
    #[arg(long, value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// The namespace for creating the pod.
    #[arg(short, long, value_name = "NAMESPACE")]
    pub namespace: Option<String>,
}

#[derive(Debug, Error)]
#[error("both AUTOSERV and AUTO_JOB_NAME environment variables are required")]
pub struct MissingIdentity;

impl Cli {
    /// Builds the job from the parsed arguments and the scheduler's
    /// environment, looked up through `env`.
    pub fn job<F>(&self, env: F) -> Result<Job, MissingIdentity>
    where
        F: Fn(&str) -> Option<String>,
    {
        let instance = env(INSTANCE_ENV).unwrap_or_default();
        let name = env(JOB_NAME_ENV).unwrap_or_default();
        if instance.is_empty() || name.is_empty() {
            return Err(MissingIdentity);
        }

        Ok(Job {
            instance,
            name,
            namespace: self.namespace.clone().unwrap_or_default(),
            template: self.template.clone(),
            args: self.args.clone(),
        })
    }
}
