use async_trait::async_trait;
use axum::http::HeaderMap;
use bytes::Bytes;
use serde::Deserialize;

use crate::config::UploadConfig;

#[derive(Debug)]
pub struct UploadError(pub String);

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Image upload failed: {}", self.0)
    }
}

/// Hosted image storage. Returns the public URL of the stored image.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, bytes: Bytes, filename: &str) -> Result<String, UploadError>;
}

/// Unsigned multipart upload to a hosted image service.
pub struct HttpImageUploader {
    client: reqwest::Client,
    url: String,
    preset: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

impl HttpImageUploader {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            preset: config.preset.clone(),
        }
    }
}

#[async_trait]
impl ImageUploader for HttpImageUploader {
    async fn upload(&self, bytes: Bytes, filename: &str) -> Result<String, UploadError> {
        let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .text("upload_preset", self.preset.clone())
            .part("file", part);

        let resp = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(UploadError(format!("upload service returned {}", resp.status())));
        }

        resp.json::<UploadResponse>()
            .await
            .map(|r| r.secure_url)
            .map_err(|e| UploadError(format!("unreadable upload response: {e}")))
    }
}

/// Fields of a multipart profile update.
#[derive(Debug, Default)]
pub struct ProfileForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub image: Option<(String, Bytes)>,
}

pub async fn parse_profile_form(headers: &HeaderMap, body: Bytes) -> Result<ProfileForm, String> {
    let boundary = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| "Missing multipart boundary".to_string())?;

    let stream = futures_util::stream::once(async { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut form = ProfileForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Multipart error: {e}"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let filename = field.file_name().unwrap_or("avatar").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| format!("Field read error: {e}"))?;
            if !data.is_empty() {
                form.image = Some((filename, data));
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| format!("Field read error: {e}"))?;
        let value = Some(value).filter(|v| !v.trim().is_empty());
        match name.as_str() {
            "username" => form.username = value,
            "email" => form.email = value,
            "password" => form.password = value,
            _ => {}
        }
    }

    Ok(form)
}
