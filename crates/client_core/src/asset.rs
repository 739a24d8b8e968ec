use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::protocol::AssetKind;
use tracing::debug;

use crate::{error::ClientError, store::AssetUpload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAsset {
    pub field: String,
    pub kind: AssetKind,
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub preview: String,
}

impl PendingAsset {
    pub fn from_bytes(
        field: impl Into<String>,
        kind: AssetKind,
        filename: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        let filename = filename.into();
        let mime_type = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let preview = data_url(&mime_type, &bytes);
        Self {
            field: field.into(),
            kind,
            filename,
            mime_type,
            bytes,
            preview,
        }
    }

    pub async fn read(
        field: impl Into<String>,
        kind: AssetKind,
        path: &Path,
        max_bytes: usize,
    ) -> Result<Self, ClientError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ClientError::Asset(format!("invalid file name: {}", path.display())))?
            .to_string();
        let read_error =
            |err: std::io::Error| ClientError::Asset(format!("failed to read {}: {err}", path.display()));
        let size = tokio::fs::metadata(path).await.map_err(read_error)?.len();
        if size > max_bytes as u64 {
            return Err(oversized(&filename, max_bytes));
        }
        let bytes = tokio::fs::read(path).await.map_err(read_error)?;
        // The file can grow between the two calls.
        if bytes.len() > max_bytes {
            return Err(oversized(&filename, max_bytes));
        }
        debug!(%filename, size_bytes = bytes.len(), "asset: file loaded for preview");
        Ok(Self::from_bytes(field, kind, filename, bytes))
    }

    pub fn to_upload(&self) -> AssetUpload {
        AssetUpload {
            kind: self.kind,
            filename: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            bytes: self.bytes.clone(),
        }
    }
}

pub(crate) fn oversized(filename: &str, max_bytes: usize) -> ClientError {
    ClientError::Asset(format!("{filename} exceeds the {max_bytes} byte upload limit"))
}

fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}
