#![cfg(feature = "http-backend")]

//! HTTP detection client.
//!
//! Wire protocol: `POST {base}/{model}/{version}?api_key=..&confidence=..&overlap=..`
//! with a multipart `file` field holding the JPEG-encoded frame. A 2xx
//! response carries `{"predictions": [...], "image": {...}}`.

use std::error::Error as _;

use url::Url;

use crate::backend::{BackendClient, BackendRole};
use crate::config::BackendConfig;
use crate::detect::BackendResponse;
use crate::error::BackendError;
use crate::frame::Frame;

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Client for one endpoint (primary or cloud) of the detection service.
///
/// The underlying `ureq::Agent` pools connections and is safe to share;
/// clone it into several clients with [`HttpBackendClient::with_agent`].
pub struct HttpBackendClient {
    role: BackendRole,
    agent: ureq::Agent,
}

impl HttpBackendClient {
    pub fn new(role: BackendRole) -> Self {
        Self::with_agent(role, ureq::AgentBuilder::new().build())
    }

    pub fn with_agent(role: BackendRole, agent: ureq::Agent) -> Self {
        Self { role, agent }
    }

    pub fn role(&self) -> BackendRole {
        self.role
    }

    /// Check that the endpoint answers. The primary is probed at `/health`,
    /// the cloud endpoint at its base URL.
    pub fn probe(&self, config: &BackendConfig) -> Result<u16, BackendError> {
        let mut url = parse_base(self.role, config.endpoint(self.role))?;
        if self.role == BackendRole::Primary {
            push_segments(self.role, &mut url, &["health"])?;
        }
        log::debug!("GET {}", url);
        match self
            .agent
            .request_url("GET", &url)
            .timeout(config.timeout)
            .call()
        {
            Ok(response) => Ok(response.status()),
            Err(ureq::Error::Status(code, _)) => {
                Err(BackendError::http(self.role, code, "health probe failed"))
            }
            Err(ureq::Error::Transport(transport)) => Err(BackendError::transport(
                self.role,
                describe_transport(&transport),
            )),
        }
    }

    fn detection_url(&self, config: &BackendConfig) -> Result<Url, BackendError> {
        let mut url = parse_base(self.role, config.endpoint(self.role))?;
        push_segments(self.role, &mut url, &[&config.model, &config.version])?;
        url.query_pairs_mut()
            .clear()
            .append_pair("api_key", &config.api_key)
            .append_pair("confidence", &config.confidence.to_string())
            .append_pair("overlap", &config.overlap.to_string());
        Ok(url)
    }
}

impl BackendClient for HttpBackendClient {
    fn name(&self) -> &str {
        self.role.as_str()
    }

    fn detect(
        &self,
        frame: &Frame,
        config: &BackendConfig,
    ) -> Result<BackendResponse, BackendError> {
        let url = self.detection_url(config)?;
        let jpeg = frame.encode_jpeg(config.jpeg_quality).map_err(|e| {
            BackendError::transport(self.role, format!("failed to encode frame as jpeg: {}", e))
        })?;
        let (content_type, body) = multipart_file("file", "frame.jpg", "image/jpeg", &jpeg);

        // The query carries the api key; never log it.
        log::debug!("POST {} ({} bytes)", redacted(&url), body.len());

        let response = match self
            .agent
            .request_url("POST", &url)
            .timeout(config.timeout)
            .set("Content-Type", &content_type)
            .send_bytes(&body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let text = response.into_string().unwrap_or_default();
                return Err(BackendError::http(self.role, code, truncate(&text)));
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(BackendError::transport(
                    self.role,
                    describe_transport(&transport),
                ))
            }
        };

        let status = response.status();
        if !(200..300).contains(&status) {
            let text = response.into_string().unwrap_or_default();
            return Err(BackendError::http(self.role, status, truncate(&text)));
        }

        let text = response.into_string().map_err(|e| {
            BackendError::transport(self.role, format!("failed to read response body: {}", e))
        })?;
        BackendResponse::parse(&text).map_err(|e| {
            BackendError::transport(self.role, format!("invalid detection response: {}", e))
        })
    }
}

fn parse_base(role: BackendRole, base: &str) -> Result<Url, BackendError> {
    Url::parse(base)
        .map_err(|e| BackendError::transport(role, format!("invalid endpoint url {}: {}", base, e)))
}

fn push_segments(role: BackendRole, url: &mut Url, segments: &[&str]) -> Result<(), BackendError> {
    url.path_segments_mut()
        .map_err(|_| BackendError::transport(role, "endpoint url cannot carry a path"))?
        .pop_if_empty()
        .extend(segments);
    Ok(())
}

/// Build a single-file `multipart/form-data` body. Returns the content type
/// header value and the body bytes.
fn multipart_file(field: &str, filename: &str, mime: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = format!("------------------------{:016x}", rand::random::<u64>());
    let head = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
        boundary, field, filename, mime
    );
    let tail = format!("\r\n--{}--\r\n", boundary);

    let mut body = Vec::with_capacity(head.len() + data.len() + tail.len());
    body.extend_from_slice(head.as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(tail.as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}

// ureq's own Display includes the full URL, query and api key included.
fn describe_transport(transport: &ureq::Transport) -> String {
    let mut text = transport.kind().to_string();
    if let Some(message) = transport.message() {
        text.push_str(": ");
        text.push_str(message);
    }
    if let Some(source) = transport.source() {
        text.push_str(": ");
        text.push_str(&source.to_string());
    }
    text
}

fn redacted(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_query(None);
    url
}

fn truncate(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let mut short: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    short.push_str("...");
    short
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BackendConfig {
        BackendConfig {
            primary_url: "http://localhost:9001/".to_string(),
            cloud_url: "https://detect.example.com".to_string(),
            model: "ppe-detection".to_string(),
            version: "3".to_string(),
            api_key: "secret key".to_string(),
            confidence: 0.4,
            overlap: 0.3,
            ..BackendConfig::default()
        }
    }

    #[test]
    fn detection_url_carries_model_version_and_query() {
        let client = HttpBackendClient::new(BackendRole::Primary);
        let url = client.detection_url(&config()).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9001/ppe-detection/3?api_key=secret+key&confidence=0.4&overlap=0.3"
        );

        let cloud = HttpBackendClient::new(BackendRole::Secondary);
        let url = cloud.detection_url(&config()).unwrap();
        assert_eq!(url.host_str(), Some("detect.example.com"));
        assert_eq!(url.path(), "/ppe-detection/3");
        assert_eq!(redacted(&url).query(), None);
    }

    #[test]
    fn multipart_body_wraps_file_bytes() {
        let (content_type, body) = multipart_file("file", "frame.jpg", "image/jpeg", b"JPEGDATA");
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with(&format!("--{}\r\n", boundary)));
        assert!(text.contains("name=\"file\"; filename=\"frame.jpg\""));
        assert!(text.contains("Content-Type: image/jpeg\r\n\r\nJPEGDATA\r\n"));
        assert!(text.ends_with(&format!("--{}--\r\n", boundary)));
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let long = "x".repeat(500);
        let short = truncate(&long);
        assert_eq!(short.len(), MAX_ERROR_BODY_CHARS + 3);
        assert_eq!(truncate("  bad gateway \n"), "bad gateway");
    }
}
