//! Configuration Module
//!
//! Handles loading configuration from:
//! 1. $CLOAK_CONFIG, ~/.cloak/config.toml or ./config.toml (first found)
//! 2. Environment variables (override TOML values)
//!
//! Environment variables take precedence over TOML config.

use std::path::PathBuf;
use std::sync::Arc;
use std::{env, fs};

use anyhow::{Context, Result, bail};
use cloak_privacy::{Address, PoolVersion, Root};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::router::{
    Groth16Verifier, MockVerifier, ProofVerifier, RouterSettings, VerificationMode,
    VerifierAdapter,
};

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".cloak";

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloakConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub verifier: VerifierConfig,
}

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Keep the ledger in memory only (lost on restart)
    #[serde(default)]
    pub in_memory: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            in_memory: false,
        }
    }
}

fn default_db_path() -> String {
    "./cloak-db".to_string()
}

/// Router roles and fresh-ledger state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub admin: Address,
    #[serde(default)]
    pub relayer: Address,
    /// Live V2 root on a fresh ledger
    #[serde(default)]
    pub v2_root: Root,
    /// Live V3 root on a fresh ledger
    #[serde(default)]
    pub v3_root: Root,
    #[serde(default)]
    pub active_version: PoolVersion,
    #[serde(default = "default_true")]
    pub verifier_set_once: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            admin: Address::default(),
            relayer: Address::default(),
            v2_root: Root::default(),
            v3_root: Root::default(),
            active_version: PoolVersion::default(),
            verifier_set_once: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Verifier backends (TOML format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Starting mode: "garaga", "tongo", "semaphore" or "mock"
    #[serde(default = "default_mode")]
    pub mode: VerificationMode,
    /// Groth16 verifying key serving the garaga mode
    #[serde(default)]
    pub groth16_vk: Option<String>,
    /// Groth16 membership verifying key serving the semaphore mode
    #[serde(default)]
    pub semaphore_vk: Option<String>,
    /// Groth16 verifying key serving the tongo mode
    #[serde(default)]
    pub tongo_vk: Option<String>,
    /// What the mock backend answers
    #[serde(default)]
    pub mock_result: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            groth16_vk: None,
            semaphore_vk: None,
            tongo_vk: None,
            mock_result: false,
        }
    }
}

fn default_mode() -> VerificationMode {
    VerificationMode::Garaga
}

impl CloakConfig {
    /// Load configuration from the first config file found, with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(config_path) = Self::find_config_file() {
            info!("Loading config from: {}", config_path.display());
            let contents = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;
            config = toml::from_str(&contents).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?;
        } else {
            info!("No config file found, using defaults and environment variables");
        }

        config.apply_overrides(|key| env::var(key).ok());

        Ok(config)
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check CLOAK_CONFIG env var
        if let Ok(path) = env::var("CLOAK_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            warn!("CLOAK_CONFIG points to missing file {}", path.display());
        }

        // 2. Check ~/.cloak/config.toml
        if let Some(config_path) = Self::default_config_path() {
            if config_path.exists() {
                return Some(config_path);
            }
        }

        // 3. Check ./config.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        None
    }

    /// Apply `CLOAK_*` overrides; unparsable values are logged and ignored
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Database
        if let Some(v) = lookup("CLOAK_DB_PATH") {
            self.database.path = v;
        }
        if let Some(v) = lookup("CLOAK_DB_IN_MEMORY") {
            self.database.in_memory = is_truthy(&v);
        }

        // API
        if let Some(v) = lookup("CLOAK_API_HOST") {
            self.api.host = v;
        }
        if let Some(v) = lookup("CLOAK_API_PORT") {
            match v.parse() {
                Ok(port) => self.api.port = port,
                Err(_) => warn!("Ignoring invalid CLOAK_API_PORT={}", v),
            }
        }

        // Router
        if let Some(v) = lookup("CLOAK_ADMIN") {
            match Address::from_hex(&v) {
                Ok(addr) => self.router.admin = addr,
                Err(e) => warn!("Ignoring CLOAK_ADMIN: {}", e),
            }
        }
        if let Some(v) = lookup("CLOAK_RELAYER") {
            match Address::from_hex(&v) {
                Ok(addr) => self.router.relayer = addr,
                Err(e) => warn!("Ignoring CLOAK_RELAYER: {}", e),
            }
        }
        if let Some(v) = lookup("CLOAK_ACTIVE_VERSION") {
            match v.parse() {
                Ok(version) => self.router.active_version = version,
                Err(e) => warn!("Ignoring CLOAK_ACTIVE_VERSION: {}", e),
            }
        }

        // Verifier
        if let Some(v) = lookup("CLOAK_VERIFIER_MODE") {
            match v.parse() {
                Ok(mode) => self.verifier.mode = mode,
                Err(e) => warn!("Ignoring CLOAK_VERIFIER_MODE: {}", e),
            }
        }
        if let Some(v) = lookup("CLOAK_GROTH16_VK") {
            self.verifier.groth16_vk = Some(v);
        }
        if let Some(v) = lookup("CLOAK_SEMAPHORE_VK") {
            self.verifier.semaphore_vk = Some(v);
        }
        if let Some(v) = lookup("CLOAK_TONGO_VK") {
            self.verifier.tongo_vk = Some(v);
        }
        if let Some(v) = lookup("CLOAK_MOCK_VERIFIER") {
            self.verifier.mock_result = is_truthy(&v);
        }
    }

    /// Convert to RouterSettings
    pub fn to_router_settings(&self) -> RouterSettings {
        RouterSettings {
            admin: self.router.admin,
            relayer: self.router.relayer,
            verifier_set_once: self.router.verifier_set_once,
            active_version: self.router.active_version,
            initial_roots: vec![
                (PoolVersion::V2, self.router.v2_root),
                (PoolVersion::V3, self.router.v3_root),
            ],
        }
    }

    /// Build the verifier adapter: every configured key plus the mock backend
    /// Refuse settings the router cannot boot with
    pub fn validate(&self) -> Result<()> {
        if self.router.admin.is_placeholder() {
            bail!("no admin configured: set router.admin or CLOAK_ADMIN");
        }
        Ok(())
    }

    pub fn build_verifier(&self) -> Result<VerifierAdapter> {
        let cfg = &self.verifier;
        let mut backends: Vec<(VerificationMode, Arc<dyn ProofVerifier>)> = vec![(
            VerificationMode::Mock,
            Arc::new(MockVerifier::new(cfg.mock_result)),
        )];

        let keyed = [
            (VerificationMode::Garaga, &cfg.groth16_vk, "groth16"),
            (VerificationMode::Semaphore, &cfg.semaphore_vk, "semaphore"),
            (VerificationMode::Tongo, &cfg.tongo_vk, "tongo"),
        ];
        for (mode, path, label) in keyed {
            if let Some(path) = path {
                let backend = Groth16Verifier::from_file(path)
                    .with_context(|| format!("Failed to load {} verifier", mode))?
                    .with_label(label);
                backends.push((mode, Arc::new(backend)));
            }
        }

        let Some(live) = backends
            .iter()
            .position(|(mode, _)| *mode == cfg.mode)
        else {
            bail!(
                "verifier mode {} has no backend; set its verifying key path",
                cfg.mode
            );
        };

        let (mode, backend) = backends.swap_remove(live);
        let mut adapter = VerifierAdapter::new(self.router.admin, mode, backend);
        for (mode, backend) in backends {
            adapter.register(mode, backend);
        }

        if mode == VerificationMode::Mock {
            warn!(
                "Mock verifier is live: every proof is {}",
                if cfg.mock_result { "accepted" } else { "rejected" }
            );
        }
        Ok(adapter)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let sample = Self {
            api: ApiConfig::default(),
            database: DatabaseConfig::default(),
            router: RouterConfig {
                admin: Address::from(cloak_privacy::FieldElement::from_u64(0xad)),
                relayer: Address::from(cloak_privacy::FieldElement::from_u64(0x7e)),
                ..RouterConfig::default()
            },
            verifier: VerifierConfig {
                mode: VerificationMode::Garaga,
                groth16_vk: Some("./keys/action.vk".to_string()),
                semaphore_vk: Some("./keys/membership.vk".to_string()),
                tongo_vk: None,
                mock_result: false,
            },
        };

        toml::to_string_pretty(&sample).unwrap_or_default()
    }
}

fn is_truthy(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}
