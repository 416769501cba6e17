use log::info;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SetupError;
use crate::retry::RetryPolicy;

pub const BOOTSTRAP_CONFIG_FILE: &str = "bootstrap.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapConfig {
    pub layout: LayoutConfig,
    pub prerequisites: PrerequisitesConfig,
    pub compose: ComposeConfig,
    pub certificates: CertificatesConfig,
    pub site: SiteDefaults,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub install_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub archive_pattern: String,
    pub release_subdir: String,
    pub env_file: PathBuf,
    pub volume: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from("server"),
            scratch_dir: PathBuf::from("/tmp/server-release"),
            archive_pattern: "server-release-*.zip".to_string(),
            release_subdir: "server".to_string(),
            env_file: PathBuf::from(".env"),
            volume: "server_db_data".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrerequisitesConfig {
    pub commands: Vec<String>,
    pub ports: Vec<u16>,
}

impl Default for PrerequisitesConfig {
    fn default() -> Self {
        Self {
            commands: ["docker", "unzip", "md5sum", "sha256sum"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ports: vec![80, 443, 1883, 5432, 8080, 8443, 8883],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComposeConfig {
    pub file: PathBuf,
    pub arm64_file: PathBuf,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("docker-compose.yml"),
            arm64_file: PathBuf::from("docker-compose.arm64.yml"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CertificatesConfig {
    pub container: String,
    pub cert_dir: String,
    /// Host path of the root CA; survives cleanup so it can be reused.
    pub ca_file: PathBuf,
    pub client_identity: String,
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    pub keystore_patch: Option<KeystorePatch>,
    pub registration: Option<Registration>,
}

impl Default for CertificatesConfig {
    fn default() -> Self {
        Self {
            container: "server".to_string(),
            cert_dir: "/opt/server/certs".to_string(),
            ca_file: PathBuf::from("ca/rootCA.crt"),
            client_identity: "admin".to_string(),
            max_attempts: 6,
            retry_delay_secs: 20,
            keystore_patch: None,
            registration: None,
        }
    }
}

impl CertificatesConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_secs(self.retry_delay_secs),
        }
    }

    pub fn has_post_steps(&self) -> bool {
        self.keystore_patch.is_some() || self.registration.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeystorePatch {
    /// Relative to the working directory.
    pub file: PathBuf,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Registration {
    #[serde(default)]
    pub workdir: Option<String>,
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteDefaults {
    pub country: String,
    pub state: String,
    pub city: String,
    pub org_unit: String,
}

impl Default for SiteDefaults {
    fn default() -> Self {
        Self {
            country: "US".to_string(),
            state: "California".to_string(),
            city: "San Jose".to_string(),
            org_unit: "IT".to_string(),
        }
    }
}

impl BootstrapConfig {
    /// Loads `path` if given, else `bootstrap.toml` from `workdir` when it
    /// exists, else built-in defaults.
    pub fn load(path: Option<&Path>, workdir: &Path) -> Result<Self, SetupError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let candidate = workdir.join(BOOTSTRAP_CONFIG_FILE);
                if !candidate.is_file() {
                    info!("No {BOOTSTRAP_CONFIG_FILE} found, using built-in defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };

        info!("Loading bootstrap config from {}", path.display());
        let content = std::fs::read_to_string(&path).map_err(|e| SetupError::Config {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Self::parse(&content).map_err(|reason| SetupError::Config { path, reason })
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let config: BootstrapConfig =
            toml::from_str(content).map_err(|e| format!("TOML parse error: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.layout.archive_pattern.is_empty() {
            return Err("layout.archive_pattern must not be empty".to_string());
        }
        if self.layout.release_subdir.is_empty() {
            return Err("layout.release_subdir must not be empty".to_string());
        }
        if let Some(patch) = &self.certificates.keystore_patch
            && patch.from.is_empty()
        {
            return Err("certificates.keystore_patch.from must not be empty".to_string());
        }
        if let Some(reg) = &self.certificates.registration
            && reg.command.is_empty()
        {
            return Err("certificates.registration.command must not be empty".to_string());
        }
        Ok(())
    }
}
