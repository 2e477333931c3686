use config::{Config, Environment, File};
use serde::Deserialize;

use crate::browser::BrowserSettings;
use crate::provider::Credentials;
use crate::CLIENT_NAME;

const CONFIG_NAME: &str = "config.toml";

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub browser: BrowserSettings,
    #[serde(default)]
    pub providers: Providers,
    /// Budget, in seconds, for each individual wait on page state.
    pub wait_secs: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct Providers {
    pub hsbc: Option<CredentialEntry>,
    pub banregio: Option<CredentialEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialEntry {
    pub username: String,
    pub password: String,
}

impl From<CredentialEntry> for Credentials {
    fn from(entry: CredentialEntry) -> Self {
        Credentials {
            username: entry.username,
            password: entry.password,
        }
    }
}

impl Settings {
    pub fn new(config_path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut s = Config::builder()
            .set_default("wait_secs", 10)?
            .set_default("browser.engine", "chrome")?
            .set_default("browser.headless", true)?
            .add_source(Environment::with_prefix("LATIGO").separator("__"));

        if let Some(path) = config_path {
            s = s.add_source(File::with_name(path));
        } else {
            s = s.add_source(File::with_name(&default_config_path()));
        }

        s.build()?.try_deserialize()
    }
}

pub(crate) fn default_config_path() -> String {
    dirs::config_dir()
        .unwrap_or_else(|| std::env::current_dir().expect("read current working dir"))
        .join(CLIENT_NAME)
        .join(CONFIG_NAME)
        .display()
        .to_string()
}
