use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Photo,
    Audio,
}

impl std::fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Photo => write!(f, "photo"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

impl std::str::FromStr for AttachmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "photo" | "image" => Ok(Self::Photo),
            "audio" => Ok(Self::Audio),
            _ => Err(format!("Unknown attachment kind: {s}")),
        }
    }
}

/// Media linked to a note. Upload and storage live outside this service; only
/// the reference is kept here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub kind: AttachmentKind,
    pub url: String,
    pub media_type: Option<String>,
    pub duration_sec: Option<i64>,
}
