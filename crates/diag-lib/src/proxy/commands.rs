//! Argument construction for `consul-k8s` subcommands

use crate::models::ProxyArtifact;

/// Default name of the CLI binary
pub const DEFAULT_CLI: &str = "consul-k8s";

/// Builds `consul-k8s` invocations scoped to a namespace and context
#[derive(Debug, Clone)]
pub struct ConsulK8s {
    program: String,
    namespace: String,
    context: Option<String>,
}

impl ConsulK8s {
    pub fn new(program: impl Into<String>, namespace: impl Into<String>, context: Option<String>) -> Self {
        Self {
            program: program.into(),
            namespace: namespace.into(),
            context,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn finish(&self, mut args: Vec<String>) -> Vec<String> {
        if let Some(context) = &self.context {
            args.push("-context".to_string());
            args.push(context.clone());
        }
        args
    }

    fn namespaced(&self, parts: &[&str]) -> Vec<String> {
        let mut args: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
        args.push("-n".to_string());
        args.push(self.namespace.clone());
        args
    }

    /// `consul-k8s status`
    pub fn status(&self) -> Vec<String> {
        self.finish(vec!["status".to_string()])
    }

    /// `consul-k8s proxy list -n NS`
    pub fn proxy_list(&self) -> Vec<String> {
        self.finish(self.namespaced(&["proxy", "list"]))
    }

    /// Arguments producing one bundle artifact for `proxy`
    pub fn artifact(&self, artifact: ProxyArtifact, proxy: &str) -> Vec<String> {
        let args = match artifact {
            ProxyArtifact::StatusTable => self.namespaced(&["proxy", "read", proxy]),
            ProxyArtifact::StatusJson => {
                let mut args = self.namespaced(&["proxy", "read", proxy]);
                args.extend(["-o".to_string(), "json".to_string()]);
                args
            }
            ProxyArtifact::StatusRaw => {
                let mut args = self.namespaced(&["proxy", "read", proxy]);
                args.extend(["-o".to_string(), "raw".to_string()]);
                args
            }
            ProxyArtifact::Stats => self.namespaced(&["proxy", "stats", proxy]),
            ProxyArtifact::LogLevels => self.namespaced(&["proxy", "log", proxy]),
            ProxyArtifact::UpstreamTroubleshoot => {
                self.namespaced(&["troubleshoot", "upstreams", "-pod", proxy])
            }
        };
        self.finish(args)
    }
}
