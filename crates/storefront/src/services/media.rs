//! Media API client for image uploads.
//!
//! Files are posted as unsigned multipart uploads to the configured media
//! account. The response's `secure_url` is the only thing kept; the image
//! bytes themselves are never stored locally.
//!
//! Every failure (transport error, non-success status, a response without a
//! URL) is reported as a [`MediaError`], and callers leave the entity they
//! were updating untouched.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::MediaConfig;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors talking to the media API.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("media API returned status {status}")]
    Api { status: u16 },

    #[error("media API response had no secure_url")]
    MissingUrl,

    #[error("invalid media endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Reasons an uploaded file is refused before it leaves the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("file is empty")]
    Empty,
    #[error("file exceeds {max} bytes")]
    TooLarge { max: usize },
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),
}

/// Accepted image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Png,
    Jpeg,
    Webp,
}

impl ImageType {
    /// Parse a MIME type, ignoring parameters and case.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

/// An image ready to be sent.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub image_type: ImageType,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Validate raw upload data.
    ///
    /// # Errors
    ///
    /// Returns an [`UploadRejection`] for empty, oversized or non-image files.
    pub fn new(
        file_name: Option<&str>,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self, UploadRejection> {
        if bytes.is_empty() {
            return Err(UploadRejection::Empty);
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(UploadRejection::TooLarge {
                max: MAX_UPLOAD_BYTES,
            });
        }
        let content_type = content_type.unwrap_or_default();
        let image_type = ImageType::from_mime(content_type)
            .ok_or_else(|| UploadRejection::UnsupportedType(content_type.to_owned()))?;

        let file_name = file_name
            .map(|n| n.rsplit(['/', '\\']).next().unwrap_or_default().trim())
            .filter(|n| !n.is_empty())
            .map_or_else(|| format!("upload.{}", image_type.extension()), str::to_owned);

        Ok(Self {
            file_name,
            image_type,
            bytes,
        })
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

/// Pull the hosted URL out of an upload response body.
fn parse_upload_response(body: &[u8]) -> Result<String, MediaError> {
    let parsed: UploadResponse = serde_json::from_slice(body).map_err(|_| MediaError::MissingUrl)?;
    parsed
        .secure_url
        .filter(|u| !u.is_empty())
        .ok_or(MediaError::MissingUrl)
}

/// Media API client.
#[derive(Clone)]
pub struct MediaClient {
    client: reqwest::Client,
    upload_url: Url,
    upload_preset: String,
}

impl MediaClient {
    /// Create a new media API client.
    ///
    /// # Errors
    ///
    /// Returns error if the upload endpoint is invalid or the HTTP client
    /// fails to build.
    pub fn new(config: &MediaConfig) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            upload_url: config.upload_url()?,
            upload_preset: config.upload_preset.clone(),
        })
    }

    /// Upload an image and return its hosted URL.
    ///
    /// # Errors
    ///
    /// Returns `MediaError` if the request fails, the API answers with a
    /// non-success status, or the response carries no URL.
    #[tracing::instrument(skip(self, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    pub async fn upload(&self, file: UploadFile) -> Result<String, MediaError> {
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(file.image_type.mime())?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        let response = self
            .client
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Api {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let url = parse_upload_response(&body)?;
        tracing::debug!(%url, "image uploaded");
        Ok(url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::extract::Multipart;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;

    const UPLOAD_PATH: &str = "/v1_1/demo/image/upload";

    fn config(base: &str) -> MediaConfig {
        MediaConfig {
            cloud_name: "demo".to_owned(),
            upload_preset: "unsigned-avatars".to_owned(),
            api_base: Url::parse(base).unwrap(),
        }
    }

    /// Serve `router` on an ephemeral port and point a client at it.
    async fn client_for(router: Router) -> MediaClient {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        MediaClient::new(&config(&format!("http://{addr}"))).unwrap()
    }

    fn png() -> UploadFile {
        UploadFile::new(Some("avatar.png"), Some("image/png"), vec![0x89, b'P', b'N', b'G']).unwrap()
    }

    #[tokio::test]
    async fn upload_sends_preset_and_file() {
        async fn accept(mut multipart: Multipart) -> Json<Value> {
            let mut preset = None;
            let mut file = None;
            while let Some(field) = multipart.next_field().await.unwrap() {
                let name = field.name().map(str::to_owned);
                match name.as_deref() {
                    Some("upload_preset") => preset = Some(field.text().await.unwrap()),
                    Some("file") => {
                        let name = field.file_name().map(str::to_owned);
                        let mime = field.content_type().map(str::to_owned);
                        file = Some((name, mime, field.bytes().await.unwrap().len()));
                    }
                    _ => {}
                }
            }
            assert_eq!(preset.as_deref(), Some("unsigned-avatars"));
            assert_eq!(
                file,
                Some((Some("avatar.png".to_owned()), Some("image/png".to_owned()), 4))
            );
            Json(json!({ "secure_url": "https://cdn.example/demo/avatar.png" }))
        }

        let client = client_for(Router::new().route(UPLOAD_PATH, post(accept))).await;
        assert_eq!(
            client.upload(png()).await.unwrap(),
            "https://cdn.example/demo/avatar.png"
        );
    }

    #[tokio::test]
    async fn upload_reports_error_status() {
        let router = Router::new().route(
            UPLOAD_PATH,
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "storage offline") }),
        );
        let client = client_for(router).await;
        assert!(matches!(
            client.upload(png()).await,
            Err(MediaError::Api { status: 500 })
        ));
    }

    #[tokio::test]
    async fn upload_without_secure_url_fails() {
        let router = Router::new().route(UPLOAD_PATH, post(|| async { Json(json!({})) }));
        let client = client_for(router).await;
        assert!(matches!(
            client.upload(png()).await,
            Err(MediaError::MissingUrl)
        ));
    }

    #[tokio::test]
    async fn upload_to_unreachable_host_is_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = MediaClient::new(&config(&format!("http://{addr}"))).unwrap();
        assert!(matches!(
            client.upload(png()).await,
            Err(MediaError::Http(_))
        ));
    }

    #[test]
    fn accepts_supported_images() {
        let file = UploadFile::new(Some("C:\\pics\\me.PNG"), Some("image/png"), vec![1, 2, 3]).unwrap();
        assert_eq!(file.image_type, ImageType::Png);
        assert_eq!(file.file_name, "me.PNG");

        let file = UploadFile::new(None, Some("Image/JPEG; charset=binary"), vec![1]).unwrap();
        assert_eq!(file.image_type, ImageType::Jpeg);
        assert_eq!(file.file_name, "upload.jpg");
    }

    #[test]
    fn rejects_bad_uploads() {
        assert_eq!(
            UploadFile::new(None, Some("image/png"), Vec::new()).unwrap_err(),
            UploadRejection::Empty
        );
        assert_eq!(
            UploadFile::new(None, Some("image/gif"), vec![0]).unwrap_err(),
            UploadRejection::UnsupportedType("image/gif".to_owned())
        );
        assert!(matches!(
            UploadFile::new(None, None, vec![0]),
            Err(UploadRejection::UnsupportedType(_))
        ));
        assert_eq!(
            UploadFile::new(None, Some("image/webp"), vec![0; MAX_UPLOAD_BYTES + 1]).unwrap_err(),
            UploadRejection::TooLarge {
                max: MAX_UPLOAD_BYTES
            }
        );
    }

    #[test]
    fn upload_response_needs_secure_url() {
        assert_eq!(
            parse_upload_response(br#"{"secure_url":"https://cdn.example/i.png","bytes":3}"#)
                .unwrap(),
            "https://cdn.example/i.png"
        );
        assert!(matches!(
            parse_upload_response(br#"{"url":"http://cdn.example/i.png"}"#),
            Err(MediaError::MissingUrl)
        ));
        assert!(matches!(
            parse_upload_response(br#"{"secure_url":""}"#),
            Err(MediaError::MissingUrl)
        ));
        assert!(matches!(
            parse_upload_response(b"<html>bad gateway</html>"),
            Err(MediaError::MissingUrl)
        ));
    }
}
