use std::{fmt::Display, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Context};
use rand::RngCore;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub upload_preset: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub token_secret: Vec<u8>,
    pub web_dir: PathBuf,
    pub upload_dir: PathBuf,
    pub public_url: String,
    pub cloudinary: Option<CloudinaryConfig>,
}

impl Config {
    /// Reads the process environment, after folding in a `.env` file if one exists.
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenv::dotenv();

        let port: u16 = try_load("PORT", "8090")?;
        let token_secret = match var("TOKEN_SECRET") {
            Some(secret) => secret.into_bytes(),
            None => {
                warn!("TOKEN_SECRET not set, tokens will not survive a restart");
                let mut secret = vec![0u8; 32];
                rand::rng().fill_bytes(&mut secret);
                secret
            }
        };

        let cloudinary = cloudinary(var("CLOUDINARY_CLOUD_NAME"), var("CLOUDINARY_UPLOAD_PRESET"));

        Ok(Self {
            port,
            database_url: try_load("DATABASE_URL", "sqlite://wanderhub.db?mode=rwc")?,
            token_secret,
            web_dir: try_load("WEB_DIR", "../FrontEnd/dist")?,
            upload_dir: try_load("UPLOAD_DIR", "uploads")?,
            public_url: try_load("PUBLIC_URL", &format!("http://localhost:{port}"))?,
            cloudinary,
        })
    }
}

fn var(key: &str) -> Option<String> {
    dotenv::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Hosted uploads need both settings; anything less falls back to `UPLOAD_DIR`.
fn cloudinary(cloud_name: Option<String>, upload_preset: Option<String>) -> Option<CloudinaryConfig> {
    match (cloud_name, upload_preset) {
        (Some(cloud_name), Some(upload_preset)) => Some(CloudinaryConfig { cloud_name, upload_preset }),
        (None, None) => None,
        (cloud_name, _) => {
            let missing = if cloud_name.is_some() { "CLOUDINARY_UPLOAD_PRESET" } else { "CLOUDINARY_CLOUD_NAME" };
            warn!("{missing} not set, storing images in UPLOAD_DIR instead");
            None
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            anyhow!("{e}")
        })
        .with_context(|| format!("environment misconfigured: {key}"))
}
