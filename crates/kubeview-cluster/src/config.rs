use std::env;
use std::path::{
    Path,
    PathBuf,
};

use kube::Client;
use kube::config::{
    Config,
    KubeConfigOptions,
    Kubeconfig,
};
use log::{
    debug,
    info,
};

use crate::error::ConfigError;

const KUBECONFIG_ENV: &str = "KUBECONFIG";

#[cfg(windows)]
const PATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
const PATH_SEPARATOR: char = ':';

/// How to reach the cluster, as chosen on the command line.
#[derive(Debug, Clone, Default)]
pub struct ClusterOptions {
    /// Explicit kubeconfig path list. Takes precedence over `KUBECONFIG`.
    pub kubeconfig: Option<String>,
    /// Context to use instead of the kubeconfig's current context.
    pub context: Option<String>,
}

/// Where credentials are loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KubeconfigSource {
    Files(Vec<PathBuf>),
    InCluster,
}

/// Resolves the credential source: the given path list (or `KUBECONFIG`),
/// then `~/.kube/config`, then in-cluster service-account credentials.
/// Only paths that exist on disk count.
pub fn resolve_source(
    explicit: Option<&str>, env_value: Option<&str>, home: Option<&Path>,
) -> KubeconfigSource {
    let mut paths: Vec<PathBuf> = explicit
        .or(env_value)
        .map(|value| {
            value
                .split(PATH_SEPARATOR)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .filter(|p| p.exists())
                .collect()
        })
        .unwrap_or_default();

    if paths.is_empty()
        && let Some(home) = home
    {
        let default_path = home.join(".kube").join("config");
        if default_path.exists() {
            paths.push(default_path);
        }
    }

    if paths.is_empty() {
        KubeconfigSource::InCluster
    } else {
        KubeconfigSource::Files(paths)
    }
}

/// [`resolve_source`] against the real environment and home directory.
pub fn detect_source(explicit: Option<&str>) -> KubeconfigSource {
    let env_value = env::var(KUBECONFIG_ENV).ok();
    let home = dirs::home_dir();
    resolve_source(explicit, env_value.as_deref(), home.as_deref())
}

/// Reads every path and merges them in order; earlier files win on
/// conflicting entries.
pub fn merge_kubeconfigs(paths: &[PathBuf]) -> Result<Kubeconfig, ConfigError> {
    let mut merged = Kubeconfig::default();

    for path in paths {
        debug!("Reading kubeconfig from {path:?}");
        let kubeconfig =
            Kubeconfig::read_from(path).map_err(|source| ConfigError::ReadKubeconfig {
                path: path.display().to_string(),
                source,
            })?;
        merged = merged
            .merge(kubeconfig)
            .map_err(|source| ConfigError::MergeKubeconfig {
                path: path.display().to_string(),
                source,
            })?;
    }

    Ok(merged)
}

pub async fn load_config(options: &ClusterOptions) -> Result<Config, ConfigError> {
    match detect_source(options.kubeconfig.as_deref()) {
        KubeconfigSource::Files(paths) => {
            info!("Loading kubeconfig from {paths:?}");
            let kubeconfig = merge_kubeconfigs(&paths)?;
            let config = Config::from_custom_kubeconfig(
                kubeconfig,
                &KubeConfigOptions {
                    context: options.context.clone(),
                    ..Default::default()
                },
            )
            .await?;
            Ok(config)
        }
        KubeconfigSource::InCluster => {
            info!("No kubeconfig found, using in-cluster configuration");
            Ok(Config::incluster()?)
        }
    }
}

/// Builds the API client once at startup.
pub async fn create_client(options: &ClusterOptions) -> Result<Client, ConfigError> {
    let config = load_config(options).await?;
    info!("Connecting to cluster at {}", config.cluster_url);
    Ok(Client::try_from(config)?)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;

    lazy_static::lazy_static! {
        static ref ENV_LOCK: Mutex<()> = Mutex::new(());
    }

    const KUBECONFIG_CONTENT: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: test-cluster
  cluster:
    server: https://test-server.com
contexts:
- name: test-context
  context:
    cluster: test-cluster
    user: test-user
    namespace: team-a
- name: other-context
  context:
    cluster: test-cluster
    user: test-user
current-context: test-context
users:
- name: test-user
  user:
    token: test-token
"#;

    fn write_kubeconfig(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, KUBECONFIG_CONTENT).unwrap();
        path
    }

    #[test]
    fn test_explicit_paths_take_precedence() {
        let temp_dir = TempDir::new().unwrap();
        let explicit = write_kubeconfig(temp_dir.path(), "explicit");
        let from_env = write_kubeconfig(temp_dir.path(), "env");

        let source = resolve_source(
            explicit.to_str(),
            from_env.to_str(),
            Some(temp_dir.path()),
        );
        assert_eq!(source, KubeconfigSource::Files(vec![explicit]));
    }

    #[test]
    fn test_env_path_list_keeps_existing_files() {
        let temp_dir = TempDir::new().unwrap();
        let first = write_kubeconfig(temp_dir.path(), "first");
        let second = write_kubeconfig(temp_dir.path(), "second");
        let missing = temp_dir.path().join("missing");

        let env_value = format!(
            "{}{PATH_SEPARATOR}{}{PATH_SEPARATOR}{}",
            first.display(),
            missing.display(),
            second.display()
        );
        let source = resolve_source(None, Some(&env_value), None);
        assert_eq!(source, KubeconfigSource::Files(vec![first, second]));
    }

    #[test]
    fn test_falls_back_to_home_config() {
        let temp_dir = TempDir::new().unwrap();
        let kube_dir = temp_dir.path().join(".kube");
        fs::create_dir_all(&kube_dir).unwrap();
        let home_config = write_kubeconfig(&kube_dir, "config");

        let missing = temp_dir.path().join("missing");
        let source = resolve_source(None, missing.to_str(), Some(temp_dir.path()));
        assert_eq!(source, KubeconfigSource::Files(vec![home_config]));
    }

    #[test]
    fn test_falls_back_to_in_cluster() {
        let temp_dir = TempDir::new().unwrap();
        let source = resolve_source(None, None, Some(temp_dir.path()));
        assert_eq!(source, KubeconfigSource::InCluster);

        assert_eq!(resolve_source(None, None, None), KubeconfigSource::InCluster);
    }

    #[test]
    fn test_detect_source_reads_kubeconfig_env() {
        let _env_guard = ENV_LOCK.lock().unwrap();
        let original = env::var(KUBECONFIG_ENV).ok();

        let temp_dir = TempDir::new().unwrap();
        let path = write_kubeconfig(temp_dir.path(), "kubeconfig");
        unsafe { env::set_var(KUBECONFIG_ENV, &path) };

        assert_eq!(detect_source(None), KubeconfigSource::Files(vec![path]));

        match original {
            Some(val) => unsafe { env::set_var(KUBECONFIG_ENV, val) },
            None => unsafe { env::remove_var(KUBECONFIG_ENV) },
        }
    }

    #[test]
    fn test_merge_kubeconfigs() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_kubeconfig(temp_dir.path(), "kubeconfig");

        let merged = merge_kubeconfigs(&[path]).unwrap();
        assert_eq!(merged.contexts.len(), 2);
        assert_eq!(merged.current_context.as_deref(), Some("test-context"));
    }

    #[test]
    fn test_merge_kubeconfigs_with_invalid_path() {
        let paths = vec![PathBuf::from("/invalid/path/that/should/not/exist")];
        let err = merge_kubeconfigs(&paths).unwrap_err();
        assert!(matches!(err, ConfigError::ReadKubeconfig { .. }));
    }

    #[tokio::test]
    async fn test_load_config_with_explicit_context() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_kubeconfig(temp_dir.path(), "kubeconfig");

        let current = load_config(&ClusterOptions {
            kubeconfig: path.to_str().map(String::from),
            context: None,
        })
        .await
        .unwrap();
        assert_eq!(current.default_namespace, "team-a");

        let other = load_config(&ClusterOptions {
            kubeconfig: path.to_str().map(String::from),
            context: Some("other-context".to_string()),
        })
        .await
        .unwrap();
        assert_eq!(other.default_namespace, "default");
        assert_eq!(other.cluster_url.host(), Some("test-server.com"));
    }

    #[tokio::test]
    async fn test_load_config_with_unknown_context_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_kubeconfig(temp_dir.path(), "kubeconfig");

        let result = load_config(&ClusterOptions {
            kubeconfig: path.to_str().map(String::from),
            context: Some("missing-context".to_string()),
        })
        .await;
        assert!(matches!(result, Err(ConfigError::Kubeconfig(_))));
    }
}
