use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clients::traits::MediaUploader;
use crate::error::{Error, Result};
use crate::models::MediaRef;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    error: Option<UploadFailure>,
}

#[derive(Debug, Deserialize)]
struct UploadFailure {
    message: String,
}

/// Unsigned uploads to a Cloudinary account through an upload preset
pub struct CloudinaryUploader {
    client: Client,
    upload_url: String,
    preset: String,
}

impl CloudinaryUploader {
    pub fn new(cloud_name: &str, preset: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            upload_url: format!("https://api.cloudinary.com/v1_1/{}/upload", cloud_name),
            preset: preset.to_string(),
        })
    }
}

/// `image/<extension>` for a photo file name
fn mime_for(file_name: &str) -> String {
    match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!("image/{}", ext.to_lowercase()),
        _ => "application/octet-stream".to_string(),
    }
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    async fn upload(&self, media: &MediaRef) -> Result<String> {
        let path = match media {
            MediaRef::Durable(url) => return Ok(url.clone()),
            MediaRef::Local(path) => path,
        };

        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("photo")
            .to_string();
        let mime = mime_for(&file_name);
        debug!(file = %file_name, bytes = bytes.len(), mime = %mime, "Uploading photo");

        let part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(&mime)?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.preset.clone());

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body: UploadResponse = response.json().await?;

        match (body.secure_url, body.error) {
            (Some(url), _) if status.is_success() => Ok(url),
            (_, Some(failure)) => {
                warn!(file = %file_name, "Upload rejected: {}", failure.message);
                Err(Error::Http(failure.message))
            }
            _ => Err(Error::Http(format!("upload of {} returned {}", file_name, status))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for("IMG_0042.JPG"), "image/jpg");
        assert_eq!(mime_for("room.png"), "image/png");
        assert_eq!(mime_for("scan"), "application/octet-stream");
    }

    #[tokio::test]
    async fn durable_media_is_passed_through() {
        let uploader = CloudinaryUploader::new("colocation", "colocations").unwrap();
        let url = "https://res.cloudinary.com/colocation/image/upload/v1/a.jpg";
        let result = uploader
            .upload(&MediaRef::Durable(url.to_string()))
            .await
            .unwrap();
        assert_eq!(result, url);
    }

    #[tokio::test]
    async fn missing_local_file_is_an_io_error() {
        let uploader = CloudinaryUploader::new("colocation", "colocations").unwrap();
        let media = MediaRef::Local("/nonexistent/coloc/photo.jpg".into());
        assert!(matches!(uploader.upload(&media).await, Err(Error::Io(_))));
    }
}
