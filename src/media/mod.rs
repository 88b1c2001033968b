//! Media encoding for upload slots
//!
//! Turns raw image bytes, readers or files into base64 payloads paired with
//! their content type, ready to be embedded inline in Gemini requests.

pub mod mime;

use crate::{Error, Result};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};

/// An in-memory media payload paired with its content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedMedia {
    data: String,
    mime_type: String,
}

impl EncodedMedia {
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type: mime_type.into(),
        }
    }

    /// Wrap an already-encoded payload, e.g. inline data returned by the API.
    pub fn from_base64(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| Error::Decode(format!("invalid base64 payload: {}", e)))
    }

    /// Fails fast when a slot holds no bytes, before anything hits the network.
    pub(crate) fn ensure_present(&self, slot: &str) -> Result<()> {
        if self.is_empty() {
            return Err(Error::InvalidRequest(format!("{} is empty", slot)));
        }
        Ok(())
    }
}

/// Read a whole stream and encode it with the declared content type.
pub async fn encode_reader<R>(mut reader: R, mime_type: &str) -> Result<EncodedMedia>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .await
        .map_err(Error::Encoding)?;

    tracing::debug!("Encoded {} bytes of {}", bytes.len(), mime_type);
    Ok(EncodedMedia::from_bytes(&bytes, mime_type))
}

/// Read and encode a file, detecting its content type.
pub async fn encode_file(path: &Path) -> Result<EncodedMedia> {
    let bytes = tokio::fs::read(path).await.map_err(Error::Encoding)?;
    let mime_type = mime::resolve_mime(path, &bytes);

    tracing::debug!(
        "Encoded {} ({} bytes, {})",
        path.display(),
        bytes.len(),
        mime_type
    );
    Ok(EncodedMedia::from_bytes(&bytes, mime_type))
}
