//! Codec collaborator: turning stored bytes into handles and back.

use anyhow::Result;

/// Decode/encode seam between on-disk bytes and in-memory handles.
///
/// The bank treats handles as opaque: decode once on load, encode once on
/// add, and otherwise only own them and hand out references. The codec also
/// names the file extension its assets are stored under.
pub trait AssetCodec {
    /// Decoded in-memory representation of one asset.
    type Handle;

    /// File extension (without the dot) for assets of this codec.
    fn extension(&self) -> &str;

    fn decode(&self, bytes: &[u8]) -> Result<Self::Handle>;

    fn encode(&self, handle: &Self::Handle) -> Result<Vec<u8>>;
}

/// Identity codec: the handle is the raw encoded bytes.
///
/// For callers whose assets are already in their wire format, such as the
/// CLI filing image files it has no need to inspect.
#[derive(Clone, Debug)]
pub struct BlobCodec {
    extension: String,
}

impl BlobCodec {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }
}

impl Default for BlobCodec {
    fn default() -> Self {
        Self::new("tga")
    }
}

impl AssetCodec for BlobCodec {
    type Handle = Vec<u8>;

    fn extension(&self) -> &str {
        &self.extension
    }

    fn decode(&self, bytes: &[u8]) -> Result<Self::Handle> {
        Ok(bytes.to_vec())
    }

    fn encode(&self, handle: &Self::Handle) -> Result<Vec<u8>> {
        Ok(handle.clone())
    }
}
