use crate::domain::MediaKind;

/// Capabilities / limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_media: bool,
    pub max_caption_len: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: u64,
    pub username: Option<String>,
}

/// An in-memory file to upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaUpload {
    pub kind: MediaKind,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub caption: Option<String>,
}
