//! Core assetbank library: a tagged-asset repository with durable sequential IDs.

pub mod bank;
pub mod codec;
pub mod record;
pub mod slots;
pub mod tag_index;
pub mod vfs;

pub type Result<T> = anyhow::Result<T>;

pub use bank::{AssetBank, COUNTER_FILE, SearchPage};
pub use codec::{AssetCodec, BlobCodec};
pub use record::AssetRecord;
pub use slots::SlotTable;
pub use tag_index::TagIndex;
pub use vfs::{DirEntry, DiskFs, Vfs};
