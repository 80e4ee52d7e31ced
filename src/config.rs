#[derive(Debug, Clone)]
pub struct Config {
    config_file: std::path::PathBuf,
    credentials_file: std::path::PathBuf,
    inner: ConfigData,
}

impl Config {
    pub fn new(
        config_file: Option<std::path::PathBuf>,
        credentials_file: Option<std::path::PathBuf>,
        inner: ConfigData,
    ) -> Result<Self, crate::error::Error> {
        let config_file_ = match config_file {
            Some(v) => v,
            None => default_path(ENV_CONFIG_FILE, "config")?,
        };
        let credentials_file_ = match credentials_file {
            Some(v) => v,
            None => default_path(ENV_SHARED_CREDENTIALS_FILE, "credentials")?,
        };

        Ok(Self {
            config_file: config_file_,
            credentials_file: credentials_file_,
            inner,
        })
    }

    pub fn into_inner(self) -> ConfigData {
        self.inner
    }

    /// Path of the read-only config file (`~/.aws/config`)
    pub fn config_file(&self) -> &std::path::Path {
        &self.config_file
    }

    /// Path of the credentials file holding session profiles (`~/.aws/credentials`)
    pub fn credentials_file(&self) -> &std::path::Path {
        &self.credentials_file
    }
}

impl std::ops::Deref for Config {
    type Target = ConfigData;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Clone)]
pub struct ConfigData {
    /// Lead time before expiry at which a session is refreshed
    pub expiration_threshold: chrono::Duration,
    /// Region for STS calls; overrides the profile's own region
    pub region: Option<String>,
}

impl Default for ConfigData {
    fn default() -> Self {
        Self {
            expiration_threshold: chrono::Duration::minutes(DEFAULT_EXPIRATION_THRESHOLD_MINUTES),
            region: None,
        }
    }
}

const DEFAULT_EXPIRATION_THRESHOLD_MINUTES: i64 = 5;

const ENV_CONFIG_FILE: &str = "AWS_CONFIG_FILE";
const ENV_SHARED_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";

fn default_path(env_name: &str, file_name: &str) -> Result<std::path::PathBuf, crate::error::Error> {
    if let Ok(p) = std::env::var(env_name) {
        if !p.is_empty() {
            return Ok(expand_tilde(&p));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".aws").join(file_name))
        .ok_or_else(|| {
            crate::error::Error::ConfigError(format!(
                "cannot determine home directory; provide ${env_name}"
            ))
        })
}

fn expand_tilde(path: &str) -> std::path::PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => path.into(),
    }
}
