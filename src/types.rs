/// Annotation naming the scheduler instance allowed to use a template.
pub const INSTANCE_ANNOTATION: &str = "batch.example.com/instance";

/// Annotation naming the job-name prefix allowed to use a template.
pub const PREFIX_ANNOTATION: &str = "batch.example.com/prefix";

/// A single job invocation handed over by the scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    /// Scheduler instance identifier.
    pub instance: String,

    /// Job name, used for the pod name and the prefix check.
    pub name: String,

    /// Target namespace. Empty means the cluster config default.
    pub namespace: String,

    /// Name of the pod template to instantiate.
    pub template: String,

    /// Arguments passed to the container.
    pub args: Vec<String>,
}

impl Job {
    pub fn namespace_or<'a>(&'a self, default: &'a str) -> &'a str {
        if self.namespace.is_empty() {
            default
        } else {
            &self.namespace
        }
    }
}

/// Lowercase leading alphanumeric run of the trimmed job name.
pub fn name_prefix(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect()
}

/// `generateName` for pods of a job: trimmed, lowercased, underscores
/// replaced by hyphens and terminated by a single hyphen.
pub fn generate_name(name: &str) -> String {
    let mut base = name.trim().to_lowercase().replace('_', "-");
    base.truncate(base.trim_end_matches('-').len());
    base.push('-');
    base
}
