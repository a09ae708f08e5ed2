//! The repository itself: startup loader, durable writer, and the read API.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{info, warn};

use crate::codec::AssetCodec;
use crate::record::AssetRecord;
use crate::slots::SlotTable;
use crate::tag_index::TagIndex;
use crate::vfs::{DiskFs, Vfs};

/// Name of the file in the asset root holding the next ID to assign.
pub const COUNTER_FILE: &str = "nextAssetNumber.txt";

/// A tagged-asset repository rooted at one directory.
///
/// On-disk layout:
/// ```text
/// <root>/
///   nextAssetNumber.txt    next ID to assign, plain decimal
///   <tag>/                 one directory per tag
///     <id>.<ext>           one asset file per record
/// ```
///
/// Disk is the source of truth; memory is a cache rebuilt or mirrored from
/// it. [`AssetBank::initialize`] rebuilds the slot table and tag index from
/// the layout above, [`AssetBank::add`] writes through to disk before
/// touching memory, and the two in-memory structures are only ever updated
/// together. Dropping the bank releases every live handle exactly once.
///
/// The bank assumes a single logical writer; hosts with multiple threads
/// must serialize mutating calls themselves.
pub struct AssetBank<C: AssetCodec> {
    root: PathBuf,
    codec: C,
    fs: Box<dyn Vfs>,
    slots: SlotTable<C::Handle>,
    index: TagIndex,
}

/// One page of search results.
pub struct SearchPage<'a, H> {
    /// Matched records in index order.
    pub records: Vec<&'a AssetRecord<H>>,
    /// Matches left beyond this page: `total - skip - returned`.
    pub remaining: usize,
}

impl<H> SearchPage<'_, H> {
    /// Number of records actually produced for this page.
    pub fn returned(&self) -> usize {
        self.records.len()
    }
}

impl<C: AssetCodec> AssetBank<C> {
    /// Bank over the real filesystem.
    pub fn new(root: impl Into<PathBuf>, codec: C) -> Self {
        Self::with_fs(root, codec, Box::new(DiskFs))
    }

    /// Bank over an explicit filesystem implementation.
    pub fn with_fs(root: impl Into<PathBuf>, codec: C, fs: Box<dyn Vfs>) -> Self {
        Self {
            root: root.into(),
            codec,
            fs,
            slots: SlotTable::new(),
            index: TagIndex::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the root directory and build the in-memory structures.
    ///
    /// A missing root is an empty repository, not an error. Each immediate
    /// subdirectory is a tag; within it, files named `<integer>.<ext>` are
    /// decoded through the codec. Files that fail to decode or whose names
    /// do not parse are skipped. Calling this again rebuilds from disk.
    ///
    /// Returns the number of records loaded.
    pub fn initialize(&mut self) -> Result<usize> {
        self.slots = SlotTable::new();
        self.index = TagIndex::new();

        let mut loaded: Vec<AssetRecord<C::Handle>> = Vec::new();
        let mut max_id = 0u32;

        if self.fs.exists(&self.root) && self.fs.is_directory(&self.root) {
            for child in self.fs.list_children(&self.root)? {
                if !child.is_dir {
                    continue;
                }
                let tag = child.name;
                let tag_dir = self.root.join(&tag);
                for entry in self.fs.list_children(&tag_dir)? {
                    if entry.is_dir {
                        continue;
                    }
                    let Some(id) = parse_asset_file_name(&entry.name, self.codec.extension())
                    else {
                        continue;
                    };
                    let path = tag_dir.join(&entry.name);
                    match self.load_one(&path, id, &tag) {
                        Ok(record) => {
                            max_id = max_id.max(id);
                            loaded.push(record);
                        }
                        Err(err) => warn!("skipping {}: {err:#}", path.display()),
                    }
                }
            }
        }

        // Two passes: the final table size is unknown until every file has
        // been seen, and enumeration order is not assumed sorted.
        let count = loaded.len();
        if count > 0 {
            self.slots.grow_for(max_id);
        }
        for record in loaded {
            let id = record.id;
            let tag = record.tag.clone();
            if let Some(prior) = self.slots.set(id, record) {
                // Duplicate IDs on disk are an input-data error; the last
                // record installed wins.
                warn!("duplicate asset id {id}: replacing record tagged `{}`", prior.tag);
                self.index.remove(&prior.tag, id);
            }
            self.index.insert(&tag, id);
        }

        info!("loaded {count} tagged assets from {}", self.root.display());
        Ok(count)
    }

    fn load_one(&self, path: &Path, id: u32, tag: &str) -> Result<AssetRecord<C::Handle>> {
        let bytes = self.fs.read_all(path)?;
        let handle = self
            .codec
            .decode(&bytes)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        Ok(AssetRecord::new(id, tag, handle))
    }

    /// Borrow the decoded handle for `id`.
    pub fn get(&self, id: u32) -> Option<&C::Handle> {
        self.slots.get(id).map(|record| &record.handle)
    }

    /// Borrow the full record for `id`.
    pub fn record(&self, id: u32) -> Option<&AssetRecord<C::Handle>> {
        self.slots.get(id)
    }

    /// Live records in ID order.
    pub fn records(&self) -> impl Iterator<Item = &AssetRecord<C::Handle>> {
        self.slots.iter()
    }

    /// Distinct tags with their record counts, in index order.
    pub fn tags(&self) -> impl Iterator<Item = (&str, usize)> {
        self.index.tags()
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.slots.live_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of records whose tag matches `query`.
    pub fn count_matches(&self, query: &str) -> usize {
        self.index.count_matches(query)
    }

    /// Paginated tag search: skip `skip` matches, return up to `limit`
    /// records, plus how many matches remain beyond this page.
    ///
    /// Counting separately from fetching lets a caller render
    /// "showing N-M of T" without materializing all T results.
    pub fn search(&self, query: &str, skip: usize, limit: usize) -> SearchPage<'_, C::Handle> {
        let total = self.index.count_matches(query);
        let records: Vec<&AssetRecord<C::Handle>> = self
            .index
            .matches(query, skip, limit)
            .into_iter()
            .filter_map(|id| self.slots.get(id))
            .collect();
        let remaining = total.saturating_sub(skip).saturating_sub(records.len());
        SearchPage { records, remaining }
    }

    /// Persist a new asset under `tag` and mirror it into memory.
    ///
    /// The asset file is written first; the counter only advances after that
    /// write succeeds, so a crash in between leaves the counter stale-low
    /// (the next run rewrites the same ID) rather than losing data. Any disk
    /// failure surfaces as `Err` with no memory mutation and no ID consumed.
    ///
    /// Returns the assigned ID.
    pub fn add(&mut self, tag: &str, handle: C::Handle) -> Result<u32> {
        validate_tag(tag)?;

        if !self.fs.exists(&self.root) {
            self.fs.create_directory(&self.root)?;
        }

        let id = self.read_next_id();

        let tag_dir = self.root.join(tag);
        if !self.fs.is_directory(&tag_dir) {
            self.fs.create_directory(&tag_dir)?;
        }

        let bytes = self.codec.encode(&handle)?;
        let path = tag_dir.join(format!("{id}.{}", self.codec.extension()));
        self.fs.write_all(&path, &bytes)?;

        // Durable allocation point: the asset file exists, so the counter
        // may advance.
        self.persist_next_id(id + 1)
            .with_context(|| format!("{} written but counter not advanced", path.display()))?;

        info!("added asset {id} under tag `{tag}`");

        // Mirror into memory. A freshly allocated ID should never hit a live
        // record; if it does, drop the stale occupant rather than diverge
        // from disk.
        if let Some(stale) = self.slots.set(id, AssetRecord::new(id, tag, handle)) {
            warn!("freshly allocated id {id} replaced a live record tagged `{}`", stale.tag);
            self.index.remove(&stale.tag, id);
        }
        self.index.insert(tag, id);

        Ok(id)
    }

    /// Drop the record at `id` from memory: the handle is released, the
    /// index association removed, the slot cleared. The on-disk file is the
    /// operator's to manage. Returns whether a record was removed.
    pub fn remove(&mut self, id: u32) -> bool {
        match self.slots.clear(id) {
            Some(record) => {
                self.index.remove(&record.tag, id);
                true
            }
            None => false,
        }
    }

    fn read_next_id(&self) -> u32 {
        let path = self.root.join(COUNTER_FILE);
        if !self.fs.exists(&path) {
            return 1;
        }
        match self.fs.read_all(&path) {
            Ok(bytes) => match parse_counter(&bytes) {
                Some(value) => value,
                None => {
                    warn!("malformed counter {}; starting from 1", path.display());
                    1
                }
            },
            Err(err) => {
                warn!("unreadable counter {}: {err:#}; starting from 1", path.display());
                1
            }
        }
    }

    fn persist_next_id(&self, value: u32) -> Result<()> {
        self.fs
            .write_all(&self.root.join(COUNTER_FILE), value.to_string().as_bytes())
    }
}

/// Parse `<integer>.<extension>` file names; anything else is not a
/// candidate asset.
fn parse_asset_file_name(name: &str, extension: &str) -> Option<u32> {
    let stem = name.strip_suffix(extension)?.strip_suffix('.')?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

fn parse_counter(bytes: &[u8]) -> Option<u32> {
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}

fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        bail!("tag cannot be empty");
    }
    if tag == "." || tag == ".." || tag.contains(['/', '\\']) {
        bail!("tag `{tag}` is not a valid directory name");
    }
    if tag == COUNTER_FILE {
        bail!("tag `{tag}` collides with the counter file");
    }
    Ok(())
}
