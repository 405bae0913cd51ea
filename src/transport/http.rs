use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{chunk_file_name, FinalizeTransport, TransportError, UploadTransport};
use crate::recorder::MediaKind;

/// HTTP implementation of both transports.
///
/// One chunk per multipart POST to `{base}/upload/chunk`, one JSON POST to
/// `{base}/upload/finalize` per session.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn chunk_endpoint(&self) -> String {
        format!("{}/upload/chunk", self.base_url)
    }

    fn finalize_endpoint(&self) -> String {
        format!("{}/upload/finalize", self.base_url)
    }

    async fn parse_body(
        endpoint: &'static str,
        response: reqwest::Response,
    ) -> Result<Value, TransportError> {
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::from_status(endpoint, status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl UploadTransport for HttpTransport {
    async fn upload_chunk(
        &self,
        session_id: &str,
        kind: MediaKind,
        index: usize,
        data: Vec<u8>,
    ) -> Result<Value, TransportError> {
        let size = data.len();
        let form = multipart::Form::new()
            .text("session_id", session_id.to_string())
            .text("kind", kind.to_string())
            .text("index", index.to_string())
            .part(
                "chunk",
                multipart::Part::bytes(data).file_name(chunk_file_name(kind, index)),
            );

        debug!(
            "Uploading chunk {} ({} bytes) to {}",
            index,
            size,
            self.chunk_endpoint()
        );

        let response = self
            .client
            .post(self.chunk_endpoint())
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Self::parse_body("chunk upload", response).await
    }
}

#[async_trait]
impl FinalizeTransport for HttpTransport {
    async fn finalize(&self, session_id: &str) -> Result<Value, TransportError> {
        debug!(
            "Finalizing session {} via {}",
            session_id,
            self.finalize_endpoint()
        );

        let response = self
            .client
            .post(self.finalize_endpoint())
            .json(&serde_json::json!({ "session_id": session_id }))
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Self::parse_body("finalize", response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_normalization() {
        let transport = HttpTransport::new("http://localhost:8080/api/interviews/").unwrap();
        assert_eq!(
            transport.chunk_endpoint(),
            "http://localhost:8080/api/interviews/upload/chunk"
        );
        assert_eq!(
            transport.finalize_endpoint(),
            "http://localhost:8080/api/interviews/upload/finalize"
        );
    }
}
