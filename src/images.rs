use std::path::{Path, PathBuf};

use axum::body::Bytes;
use futures_util::future::try_join_all;
use reqwest::multipart::{Form, Part};
use uuid::Uuid;

use crate::{config::Config, AppResult, GetField};

/// Route prefix under which locally stored images are served.
pub const UPLOADS_ROUTE: &str = "/uploads";

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Where listing photos end up. Either the hosted image service, or a local
/// directory that the server itself exposes under [`UPLOADS_ROUTE`].
#[derive(Debug, Clone)]
pub enum ImageStore {
    Cloudinary {
        client: reqwest::Client,
        upload_url: String,
        upload_preset: String,
    },
    Local {
        dir: PathBuf,
        public_base: String,
    },
}

impl ImageStore {
    pub fn from_config(config: &Config) -> Self {
        match &config.cloudinary {
            Some(cloudinary) => ImageStore::Cloudinary {
                client: reqwest::Client::new(),
                upload_url: format!(
                    "https://api.cloudinary.com/v1_1/{}/image/upload",
                    cloudinary.cloud_name
                ),
                upload_preset: cloudinary.upload_preset.clone(),
            },
            None => ImageStore::local(&config.upload_dir, &config.public_url),
        }
    }

    pub fn local(dir: impl AsRef<Path>, public_url: &str) -> Self {
        ImageStore::Local {
            dir: dir.as_ref().to_path_buf(),
            public_base: format!("{}{UPLOADS_ROUTE}", public_url.trim_end_matches('/')),
        }
    }

    pub fn local_dir(&self) -> Option<&Path> {
        match self {
            ImageStore::Local { dir, .. } => Some(dir),
            ImageStore::Cloudinary { .. } => None,
        }
    }

    /// Stores one image and returns its public URL.
    pub async fn upload(&self, image: UploadedImage) -> AppResult<String> {
        match self {
            ImageStore::Cloudinary { client, upload_url, upload_preset } => {
                let mut part = Part::bytes(image.bytes.to_vec()).file_name(image.file_name);
                if let Some(content_type) = &image.content_type {
                    part = part.mime_str(content_type)?;
                }
                let form = Form::new()
                    .text("upload_preset", upload_preset.clone())
                    .part("file", part);

                let body: serde_json::Value = client
                    .post(upload_url)
                    .multipart(form)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;

                let url = body.get_str_field("secure_url")?;
                tracing::debug!(%url, "image uploaded");
                Ok(url)
            }
            ImageStore::Local { dir, public_base } => {
                tokio::fs::create_dir_all(dir).await?;

                let name = format!("{}.{}", Uuid::now_v7().simple(), extension(&image.file_name));
                tokio::fs::write(dir.join(&name), &image.bytes).await?;

                tracing::debug!(%name, "image stored locally");
                Ok(format!("{public_base}/{name}"))
            }
        }
    }

    /// Uploads concurrently; URLs come back in the order the images were given.
    pub async fn upload_all(&self, images: Vec<UploadedImage>) -> AppResult<Vec<String>> {
        try_join_all(images.into_iter().map(|image| self.upload(image))).await
    }
}

fn extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "bin".to_owned())
}
