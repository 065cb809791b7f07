//! CMS REST client.
//!
//! Four calls against `{base_url}`, each carrying the same header block
//! (`Content-Type: application/json`, `X-API-Key`). Create and update hand
//! back the raw status and body so callers decide what counts as success;
//! `get_post` maps 404 to `None` because "absent" is an expected answer.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ureq::http::Response;
use ureq::{Agent, Body};

use crate::config::Credentials;
use crate::error::{Result, VaultpressError};
use crate::post::PostPayload;

/// A post as returned by the CMS: an arbitrary JSON object.
pub type PostRecord = serde_json::Map<String, Value>;

/// Why an image is being uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaPurpose {
    /// The representative image of the post
    Thumbnail,
    /// Any other inline image
    Post,
}

/// Response of `POST /media`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaUploadResponse {
    /// Hosted URL of the uploaded image
    pub url: String,
}

/// Status and parsed body of a create or update call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Body parsed as JSON; non-JSON text is kept as a string, empty as null
    pub body: Value,
}

impl ApiResponse {
    /// Whether the status is in the 4xx/5xx range.
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Operations the publisher and metadata sync need from the CMS.
pub trait CmsApi {
    /// Upload an image given as a `data:` URL.
    fn upload_media(&self, data_url: &str, purpose: MediaPurpose) -> Result<MediaUploadResponse>;

    /// Fetch a post by slug; `Ok(None)` when it does not exist.
    fn get_post(&self, slug: &str) -> Result<Option<PostRecord>>;

    /// Create a post. The response is returned uninterpreted.
    fn create_post(&self, payload: &PostPayload) -> Result<ApiResponse>;

    /// Replace the post at `slug`. The response is returned uninterpreted.
    fn update_post(&self, slug: &str, payload: &PostPayload) -> Result<ApiResponse>;
}

impl<T: CmsApi + ?Sized> CmsApi for &T {
    fn upload_media(&self, data_url: &str, purpose: MediaPurpose) -> Result<MediaUploadResponse> {
        (**self).upload_media(data_url, purpose)
    }

    fn get_post(&self, slug: &str) -> Result<Option<PostRecord>> {
        (**self).get_post(slug)
    }

    fn create_post(&self, payload: &PostPayload) -> Result<ApiResponse> {
        (**self).create_post(payload)
    }

    fn update_post(&self, slug: &str, payload: &PostPayload) -> Result<ApiResponse> {
        (**self).update_post(slug, payload)
    }
}

#[derive(Serialize)]
struct MediaUploadRequest<'a> {
    image_base64: &'a str,
    purpose: MediaPurpose,
}

/// Blocking HTTP implementation of [`CmsApi`].
pub struct HttpCmsApi {
    agent: Agent,
    base_url: String,
    api_key: String,
}

impl HttpCmsApi {
    /// Create a client that honors the proxy environment variables.
    pub fn new(credentials: &Credentials, timeout: Duration) -> Self {
        Self::with_proxy(credentials, timeout, ureq::Proxy::try_from_env())
    }

    /// Create a client with an explicit proxy; `None` connects directly.
    pub fn with_proxy(
        credentials: &Credentials,
        timeout: Duration,
        proxy: Option<ureq::Proxy>,
    ) -> Self {
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .proxy(proxy)
            .build();
        Self {
            agent: Agent::new_with_config(config),
            base_url: credentials.base_url.trim_end_matches('/').to_string(),
            api_key: credentials.api_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn post_url(&self, slug: &str) -> String {
        self.url(&format!("/posts/{}", urlencoding::encode(slug)))
    }
}

impl CmsApi for HttpCmsApi {
    fn upload_media(&self, data_url: &str, purpose: MediaPurpose) -> Result<MediaUploadResponse> {
        let url = self.url("/media");
        log::debug!("POST {} (purpose: {:?}, {} bytes)", url, purpose, data_url.len());

        let mut response = self
            .agent
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-API-Key", &self.api_key)
            .send_json(MediaUploadRequest {
                image_base64: data_url,
                purpose,
            })?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(VaultpressError::HttpStatus {
                operation: "Media upload",
                status,
            });
        }
        Ok(response.body_mut().read_json::<MediaUploadResponse>()?)
    }

    fn get_post(&self, slug: &str) -> Result<Option<PostRecord>> {
        let url = self.post_url(slug);
        log::debug!("GET {}", url);

        let mut response = self
            .agent
            .get(&url)
            .header("Content-Type", "application/json")
            .header("X-API-Key", &self.api_key)
            .call()?;

        let status = response.status().as_u16();
        if status == 404 {
            return Ok(None);
        }
        if status >= 400 {
            return Err(VaultpressError::HttpStatus {
                operation: "Fetch post",
                status,
            });
        }
        let text = response.body_mut().read_to_string()?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn create_post(&self, payload: &PostPayload) -> Result<ApiResponse> {
        let url = self.url("/posts");
        log::debug!("POST {}", url);

        let response = self
            .agent
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-API-Key", &self.api_key)
            .send_json(payload)?;
        raw_response(response)
    }

    fn update_post(&self, slug: &str, payload: &PostPayload) -> Result<ApiResponse> {
        let url = self.post_url(slug);
        log::debug!("PUT {}", url);

        let response = self
            .agent
            .put(&url)
            .header("Content-Type", "application/json")
            .header("X-API-Key", &self.api_key)
            .send_json(payload)?;
        raw_response(response)
    }
}

fn raw_response(mut response: Response<Body>) -> Result<ApiResponse> {
    let status = response.status().as_u16();
    let text = response.body_mut().read_to_string()?;
    log::debug!("-> {} ({} bytes)", status, text.len());
    Ok(ApiResponse {
        status,
        body: parse_body(text),
    })
}

fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client(base: &str) -> HttpCmsApi {
        let creds = Credentials {
            base_url: base.into(),
            api_key: "k".into(),
        };
        HttpCmsApi::with_proxy(&creds, Duration::from_secs(1), None)
    }

    #[test]
    fn purpose_serializes_lowercase() {
        assert_eq!(serde_json::to_value(MediaPurpose::Thumbnail).unwrap(), json!("thumbnail"));
        assert_eq!(serde_json::to_value(MediaPurpose::Post).unwrap(), json!("post"));
    }

    #[test]
    fn urls_are_joined_and_slugs_encoded() {
        let api = client("https://cms.example.com/api/");
        assert_eq!(api.url("/media"), "https://cms.example.com/api/media");
        assert_eq!(api.post_url("my-post"), "https://cms.example.com/api/posts/my-post");
        assert_eq!(api.post_url("a b/c"), "https://cms.example.com/api/posts/a%20b%2Fc");
    }

    #[test]
    fn bodies_are_parsed_leniently() {
        assert_eq!(parse_body(r#"{"ok":true}"#.into()), json!({"ok": true}));
        assert_eq!(parse_body("Bad Gateway".into()), json!("Bad Gateway"));
        assert_eq!(parse_body("  ".into()), Value::Null);
    }
}
