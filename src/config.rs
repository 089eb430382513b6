use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::constants::{CONFIG_ENV_VAR, DEFAULT_DEDIMANIA_URL};

/// Controller config.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// The address of the game server's XML-RPC port, f.e. "127.0.0.1:5000".
    ///
    /// A game server will listen on the port 5000 by default, where each
    /// additional instance will use 5001, 5002, etc.
    pub rpc_address: String,

    /// The "SuperAdmin" login defined in the `<authorization_levels>`
    /// config in `/UserData/Config/*.txt`.
    ///
    /// Validation replays can only be read with "SuperAdmin" privileges.
    pub rpc_login: String,

    /// The "SuperAdmin" password.
    pub rpc_password: String,

    pub dedimania: DedimaniaConfig,
}

/// Ranking service config.
#[derive(Deserialize, Debug, Clone)]
pub struct DedimaniaConfig {
    /// The service endpoint that accepts XML-RPC posts.
    #[serde(default = "default_url")]
    pub url: String,

    /// The community code of the server account, as registered
    /// at the ranking service.
    pub auth_code: String,

    /// Every request fails with a timeout after this duration.
    #[serde(default = "default_request_timeout_millis")]
    pub request_timeout_millis: u64,

    /// The interval at which the session is checked, and reopened if lost.
    #[serde(default = "default_liveness_interval_secs")]
    pub liveness_interval_secs: u64,

    /// The interval at which the player list is reported.
    #[serde(default = "default_player_update_interval_secs")]
    pub player_update_interval_secs: u64,

    /// Accept gzip-compressed responses.
    #[serde(default = "default_compress")]
    pub compress: bool,
}

fn default_url() -> String {
    DEFAULT_DEDIMANIA_URL.to_string()
}

fn default_request_timeout_millis() -> u64 {
    5_000
}

fn default_liveness_interval_secs() -> u64 {
    30
}

fn default_player_update_interval_secs() -> u64 {
    180
}

fn default_compress() -> bool {
    true
}

impl DedimaniaConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_millis)
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_secs(self.liveness_interval_secs)
    }

    pub fn player_update_interval(&self) -> Duration {
        Duration::from_secs(self.player_update_interval_secs)
    }
}

impl Config {
    /// Read the config file listed in the `DEDISYNC_CONFIG` environment variable.
    ///
    /// # Panics
    /// - when `DEDISYNC_CONFIG` is not set
    /// - when `DEDISYNC_CONFIG` does not point to a valid TOML config
    /// - when an assertion on one or more values fails
    pub fn load() -> Config {
        fn parse_file(f: PathBuf) -> anyhow::Result<Config> {
            let f_str = std::fs::read_to_string(f)?;
            Config::from_toml(&f_str)
        }

        let env_file = match std::env::var(CONFIG_ENV_VAR) {
            Ok(f) => Some(PathBuf::from(f)).filter(|p| p.is_file()),
            Err(_) => None,
        };

        if let Some(f) = env_file {
            let cfg = parse_file(f).expect("failed to parse config file");
            check_config(&cfg);
            return cfg;
        }

        panic!("cannot locate config: use the '{}' env var", CONFIG_ENV_VAR)
    }

    pub fn from_toml(toml_str: &str) -> anyhow::Result<Config> {
        Ok(toml::from_str(toml_str)?)
    }
}

/// Try to catch configuration errors early.
pub fn check_config(config: &Config) {
    let dedi = &config.dedimania;
    assert!(
        !dedi.auth_code.trim().is_empty(),
        "config: 'auth_code' must not be empty!"
    );
    assert!(
        dedi.liveness_interval_secs > 0 && dedi.player_update_interval_secs > 0,
        "config: intervals must be larger than zero!"
    );
    assert!(
        dedi.request_timeout() < dedi.liveness_interval(),
        "config: 'request_timeout_millis' must be shorter than 'liveness_interval_secs'!"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        rpc_address = "127.0.0.1:5000"
        rpc_login = "SuperAdmin"
        rpc_password = "SuperAdmin"

        [dedimania]
        auth_code = "abc123"
    "#;

    #[test]
    fn defaults() {
        let cfg = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(DEFAULT_DEDIMANIA_URL, cfg.dedimania.url);
        assert_eq!(Duration::from_secs(5), cfg.dedimania.request_timeout());
        assert_eq!(Duration::from_secs(30), cfg.dedimania.liveness_interval());
        assert_eq!(Duration::from_secs(180), cfg.dedimania.player_update_interval());
        assert!(cfg.dedimania.compress);
        check_config(&cfg);
    }

    #[test]
    fn missing_code() {
        let toml_str = MINIMAL.replace("auth_code = \"abc123\"", "");
        assert!(Config::from_toml(&toml_str).is_err());
    }

    #[test]
    #[should_panic]
    fn timeout_longer_than_interval() {
        let toml_str = MINIMAL.replace(
            "auth_code = \"abc123\"",
            "auth_code = \"abc123\"\nrequest_timeout_millis = 40000",
        );
        let cfg = Config::from_toml(&toml_str).unwrap();
        check_config(&cfg);
    }
}
