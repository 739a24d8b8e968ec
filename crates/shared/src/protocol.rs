use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    ProfilePhoto,
    ConsentDocument,
    Attachment,
}

impl AssetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProfilePhoto => "profile_photo",
            Self::ConsentDocument => "consent_document",
            Self::Attachment => "attachment",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetUploadQuery {
    pub kind: AssetKind,
    pub filename: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUploaded {
    pub url: String,
}
