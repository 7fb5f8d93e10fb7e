use color_eyre::Result;
use serde::Deserialize;
use std::{env, fs, net::SocketAddr};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub log_level: String,
    pub listen: SocketAddr,
    pub cookie_secret: String,
    pub db: Option<String>,
    /// Usernames allowed to create boards.
    #[serde(default)]
    pub admins: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env = env::var("PERCH_CONFIG");
        let path = env.as_deref().unwrap_or("perch.toml");
        let config_str = fs::read_to_string(path)?;
        Ok(toml::from_str(&config_str)?)
    }
}
