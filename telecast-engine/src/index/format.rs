//! Shared on-disk layout for ISetMap/IListMap: header + directory + packed
//! per-video records (§4.B, §6).
//!
//! ```text
//! [magic: 4 bytes][version: u32][entry_count: u32]
//! [directory: entry_count * (video_id: u32, byte_offset: u64, entry_count: u32)]
//! [payload section: packed little-endian records]
//! ```
//!
//! The directory is sorted by `video_id`, giving O(log N) random access via
//! binary search.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::error::{Error, Result};

pub const MAGIC: &[u8; 4] = b"TCIX";
const HEADER_LEN: usize = 4 + 4 + 4;
const DIR_ENTRY_LEN: usize = 4 + 8 + 4;

#[derive(Debug, Clone, Copy)]
pub struct DirEntry {
    pub video_id: u32,
    pub byte_offset: u64,
    pub entry_count: u32,
}

/// A memory-mapped index file, header-and-directory parsed eagerly, the
/// payload section accessed lazily per read.
pub struct MappedIndex {
    path: PathBuf,
    mmap: Mmap,
    directory: Vec<DirEntry>,
    payload_offset: usize,
}

impl std::fmt::Debug for MappedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedIndex")
            .field("path", &self.path)
            .field("videos", &self.directory.len())
            .finish()
    }
}

impl MappedIndex {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| Error::Index {
            path: path.clone(),
            source,
        })?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| Error::Index {
            path: path.clone(),
            source,
        })?;

        if mmap.len() < HEADER_LEN || &mmap[0..4] != MAGIC {
            return Err(Error::Corrupt {
                path,
                reason: "bad magic or truncated header".into(),
            });
        }
        let version = u32::from_le_bytes(mmap[4..8].try_into().unwrap());
        if version != 1 {
            return Err(Error::Corrupt {
                path,
                reason: format!("unsupported version {version}"),
            });
        }
        let count = u32::from_le_bytes(mmap[8..12].try_into().unwrap()) as usize;

        let dir_len = count * DIR_ENTRY_LEN;
        let dir_end = HEADER_LEN + dir_len;
        if mmap.len() < dir_end {
            return Err(Error::Corrupt {
                path,
                reason: "truncated directory".into(),
            });
        }

        let mut directory = Vec::with_capacity(count);
        for i in 0..count {
            let base = HEADER_LEN + i * DIR_ENTRY_LEN;
            let video_id = u32::from_le_bytes(mmap[base..base + 4].try_into().unwrap());
            let byte_offset = u64::from_le_bytes(mmap[base + 4..base + 12].try_into().unwrap());
            let entry_count = u32::from_le_bytes(mmap[base + 12..base + 16].try_into().unwrap());
            directory.push(DirEntry {
                video_id,
                byte_offset,
                entry_count,
            });
        }

        Ok(Self {
            path,
            mmap,
            directory,
            payload_offset: dir_end,
        })
    }

    fn find(&self, video_id: u32) -> Option<&DirEntry> {
        self.directory
            .binary_search_by_key(&video_id, |e| e.video_id)
            .ok()
            .map(|idx| &self.directory[idx])
    }

    pub fn has_id(&self, video_id: u32) -> bool {
        self.find(video_id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.directory.iter().map(|e| e.video_id)
    }

    /// Raw record bytes for `video_id`, or `&[]` if absent.
    pub fn record_bytes(&self, video_id: u32, record_len: usize) -> &[u8] {
        match self.find(video_id) {
            Some(entry) => {
                let start = self.payload_offset + entry.byte_offset as usize;
                let len = entry.entry_count as usize * record_len;
                &self.mmap[start..start + len]
            }
            None => &[],
        }
    }
}
