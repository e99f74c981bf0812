// Copyright 2023 The Skene Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use kube::client::ClientBuilder;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tower::limit::RateLimitLayer;

use super::error::{Error, Result};

/// The client side throttle defaults, matching the upstream client defaults.
const DEFAULT_QPS: f32 = 5.0;
const DEFAULT_BURST: u32 = 10;

/// Settings for resolving cluster access through a kubeconfig file.
#[derive(Args, Clone, Debug, Default)]
pub struct Factory {
    /// Path to the kubeconfig file to use (defaults to the standard chain)
    #[clap(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Name of the kubeconfig context to use (defaults to the current context)
    #[clap(long, env = "KUBE_CONTEXT")]
    pub context: Option<String>,
}

impl Factory {
    /// Resolves the rest config from the kubeconfig chain, honoring the
    /// context override when one is set.
    pub async fn load_config(&self) -> Result<Config> {
        let kubeconfig = match &self.kubeconfig {
            Some(path) => Kubeconfig::read_from(path).map_err(Error::KubeconfigError)?,
            None => Kubeconfig::read().map_err(Error::KubeconfigError)?,
        };

        let options = KubeConfigOptions { context: self.context.clone(), ..KubeConfigOptions::default() };
        Config::from_custom_kubeconfig(kubeconfig, &options).await.map_err(Error::KubeconfigError)
    }
}

/// Client side throttle settings for the Kubernetes API.
///
/// Zero values fall back to the defaults: 5 qps with a burst of 10.
#[derive(Args, Clone, Copy, Debug, Default)]
pub struct Options {
    /// Maximum sustained queries per second against the Kubernetes API
    #[clap(long = "kube-api-qps", env = "KUBE_API_QPS", default_value_t = DEFAULT_QPS)]
    pub qps: f32,

    /// Burst capacity allowed on top of the sustained query rate
    #[clap(long = "kube-api-burst", env = "KUBE_API_BURST", default_value_t = DEFAULT_BURST)]
    pub burst: u32,
}

/// Builds a rate limited client, along with the config it was built from.
///
/// `Some(factory)` resolves cluster access through a kubeconfig file, `None`
/// expects to be running inside a cluster. There is no fallback between the
/// two paths and no retry; failures are wrapped and returned as they are.
pub async fn create_client(factory: Option<&Factory>, options: &Options) -> Result<(Client, Config)> {
    let config = match factory {
        Some(factory) => factory.load_config().await?,
        None => Config::incluster().map_err(Error::InClusterError)?,
    };

    let (burst, window) = rate_limit(options);
    let client = ClientBuilder::try_from(config.clone())
        .map_err(Error::CreateClientFailed)?
        .with_layer(&RateLimitLayer::new(burst, window))
        .build();

    Ok((client, config))
}

// Admitting `burst` requests per `burst / qps` seconds sustains `qps` while
// letting short spikes spend the whole burst allowance at once.
fn rate_limit(options: &Options) -> (u64, Duration) {
    let qps = if options.qps > 0.0 { options.qps } else { DEFAULT_QPS };
    let burst = if options.burst > 0 { options.burst } else { DEFAULT_BURST };

    (u64::from(burst), Duration::from_secs_f32(burst as f32 / qps))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
  - name: left
    cluster:
      server: https://left.example.com:6443
  - name: right
    cluster:
      server: https://right.example.com:6443
contexts:
  - name: left
    context:
      cluster: left
      user: admin
  - name: right
    context:
      cluster: right
      user: admin
current-context: left
users:
  - name: admin
    user:
      token: secret
"#;

    fn write_kubeconfig() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(KUBECONFIG.as_bytes()).unwrap();
        file
    }

    #[test]
    fn throttle_defaults_apply_on_zero() {
        let (burst, window) = rate_limit(&Options::default());
        assert_eq!(burst, 10);
        assert_eq!(window, Duration::from_secs(2));
    }

    #[test]
    fn throttle_follows_the_configured_rate() {
        let options = Options { qps: 50.0, burst: 100 };
        let (burst, window) = rate_limit(&options);
        assert_eq!(burst, 100);
        assert_eq!(window, Duration::from_secs(2));

        let options = Options { qps: 1.0, burst: 3 };
        let (burst, window) = rate_limit(&options);
        assert_eq!(burst, 3);
        assert_eq!(window, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn factory_resolves_the_current_context() {
        let file = write_kubeconfig();
        let factory = Factory { kubeconfig: Some(file.path().to_path_buf()), context: None };

        let config = factory.load_config().await.unwrap();
        assert_eq!(config.cluster_url.host(), Some("left.example.com"));
    }

    #[tokio::test]
    async fn factory_honors_the_context_override() {
        let file = write_kubeconfig();
        let factory =
            Factory { kubeconfig: Some(file.path().to_path_buf()), context: Some("right".to_string()) };

        let config = factory.load_config().await.unwrap();
        assert_eq!(config.cluster_url.host(), Some("right.example.com"));
    }

    #[tokio::test]
    async fn factory_rejects_an_unknown_context() {
        let file = write_kubeconfig();
        let factory =
            Factory { kubeconfig: Some(file.path().to_path_buf()), context: Some("nowhere".to_string()) };

        assert!(factory.load_config().await.is_err());
    }

    #[tokio::test]
    async fn factory_rejects_an_unreadable_kubeconfig() {
        let factory =
            Factory { kubeconfig: Some(PathBuf::from("/definitely/not/a/kubeconfig")), context: None };

        assert!(factory.load_config().await.is_err());
    }

    #[tokio::test]
    async fn create_client_returns_the_resolved_config() {
        let file = write_kubeconfig();
        let factory = Factory { kubeconfig: Some(file.path().to_path_buf()), context: None };

        let (_client, config) = create_client(Some(&factory), &Options::default()).await.unwrap();
        assert_eq!(config.cluster_url.host(), Some("left.example.com"));
    }

    #[tokio::test]
    async fn in_cluster_resolution_fails_outside_a_cluster() {
        assert!(create_client(None, &Options::default()).await.is_err());
    }
}
