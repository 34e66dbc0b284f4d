use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::SchemaError;

/// Encoded image bytes plus their mime type.
///
/// Serialized as a `data:<mime>;base64,<bytes>` URL, the form drafts and
/// archives have always stored photos in.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    mime_type: String,
    bytes: Vec<u8>,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// Parse a base64 data URL. Percent-encoded (non-base64) URLs are rejected.
    pub fn from_data_url(url: &str) -> Result<Self, SchemaError> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| SchemaError::InvalidDataUrl("missing data: scheme".into()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| SchemaError::InvalidDataUrl("missing payload separator".into()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| SchemaError::InvalidDataUrl("payload is not base64".into()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .map_err(|e| SchemaError::InvalidDataUrl(e.to_string()))?;
        Ok(Self::new(mime_type, bytes))
    }
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Serialize for ImagePayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_url())
    }
}

impl<'de> Deserialize<'de> for ImagePayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let url = String::deserialize(deserializer)?;
        Self::from_data_url(&url).map_err(serde::de::Error::custom)
    }
}

/// One attached photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoEntry {
    /// Original (sanitized) filename.
    pub name: String,
    #[serde(rename = "dataUrl")]
    pub payload: ImagePayload,
    #[serde(rename = "w")]
    pub width: u32,
    #[serde(rename = "h")]
    pub height: u32,
    #[serde(default)]
    pub caption: String,
}

/// Ordered photo sequence. Photos have no identity beyond their position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Photos(Vec<PhotoEntry>);

impl Photos {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PhotoEntry> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PhotoEntry> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[PhotoEntry] {
        &self.0
    }

    pub fn push(&mut self, entry: PhotoEntry) {
        self.0.push(entry);
    }

    /// Append after the existing photos. Never replaces.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = PhotoEntry>) {
        self.0.extend(entries);
    }

    /// Remove the photo at `index`, shifting later photos down.
    pub fn remove_at(&mut self, index: usize) -> Option<PhotoEntry> {
        if index < self.0.len() {
            Some(self.0.remove(index))
        } else {
            None
        }
    }

    /// Returns false when `index` is out of range.
    pub fn set_caption(&mut self, index: usize, caption: impl Into<String>) -> bool {
        match self.0.get_mut(index) {
            Some(entry) => {
                entry.caption = caption.into();
                true
            }
            None => false,
        }
    }
}

impl From<Vec<PhotoEntry>> for Photos {
    fn from(entries: Vec<PhotoEntry>) -> Self {
        Self(entries)
    }
}

impl<'a> IntoIterator for &'a Photos {
    type Item = &'a PhotoEntry;
    type IntoIter = std::slice::Iter<'a, PhotoEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
