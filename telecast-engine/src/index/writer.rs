//! Writers for the on-disk index layout in [`super::format`].
//!
//! Used by `telecast-derive` to produce the fast isets, the num-faces
//! ilist, and the per-tag ilists (§4.H), and by engine tests to build
//! small synthetic indices without going through the derivation pipeline.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::interval::{Interval, PayloadInterval};

use super::format::{MappedIndex, MAGIC};

fn write_index_file(
    path: &Path,
    mut entries: Vec<(u32, Vec<u8>, u32)>,
    append_from: Option<(&Path, usize)>,
) -> Result<()> {
    if let Some((existing_path, record_len)) = append_from {
        if existing_path.exists() {
            let existing = MappedIndex::open(existing_path)?;
            let present: std::collections::HashSet<u32> =
                entries.iter().map(|(id, _, _)| *id).collect();
            for id in existing.ids() {
                if !present.contains(&id) {
                    let bytes = existing.record_bytes(id, record_len);
                    let count = (bytes.len() / record_len) as u32;
                    entries.push((id, bytes.to_vec(), count));
                }
            }
        }
    }

    entries.sort_by_key(|(id, _, _)| *id);

    let mut payload = Vec::new();
    let mut directory = Vec::with_capacity(entries.len());
    for (video_id, bytes, count) in &entries {
        directory.push((*video_id, payload.len() as u64, *count));
        payload.extend_from_slice(bytes);
    }

    let mut file = std::fs::File::create(path).map_err(|source| Error::Index {
        path: path.to_path_buf(),
        source,
    })?;
    file.write_all(MAGIC).unwrap();
    file.write_all(&1u32.to_le_bytes()).unwrap();
    file.write_all(&(directory.len() as u32).to_le_bytes()).unwrap();
    for (video_id, offset, count) in &directory {
        file.write_all(&video_id.to_le_bytes()).unwrap();
        file.write_all(&offset.to_le_bytes()).unwrap();
        file.write_all(&count.to_le_bytes()).unwrap();
    }
    file.write_all(&payload).unwrap();
    Ok(())
}

/// Accumulates `(video_id, intervals)` pairs and writes a complete
/// `ISetMap` file on [`IntervalSetMappingWriter::finish`].
pub struct IntervalSetMappingWriter {
    path: PathBuf,
    append: bool,
    entries: Vec<(u32, Vec<u8>, u32)>,
}

impl IntervalSetMappingWriter {
    pub fn create(path: impl Into<PathBuf>, append: bool) -> Self {
        Self {
            path: path.into(),
            append,
            entries: Vec::new(),
        }
    }

    pub fn write(&mut self, video_id: u32, intervals: &[Interval]) {
        let mut bytes = Vec::with_capacity(intervals.len() * 8);
        for &(s, e) in intervals {
            bytes.extend_from_slice(&s.to_le_bytes());
            bytes.extend_from_slice(&e.to_le_bytes());
        }
        self.entries.push((video_id, bytes, intervals.len() as u32));
    }

    pub fn finish(self) -> Result<()> {
        let append_from = self.append.then_some((self.path.as_path(), 8));
        write_index_file(&self.path, self.entries, append_from)
    }
}

/// Accumulates `(video_id, payload-intervals)` pairs and writes a complete
/// `IListMap` file on [`IntervalListMappingWriter::finish`].
pub struct IntervalListMappingWriter {
    path: PathBuf,
    append: bool,
    entries: Vec<(u32, Vec<u8>, u32)>,
}

impl IntervalListMappingWriter {
    pub fn create(path: impl Into<PathBuf>, append: bool) -> Self {
        Self {
            path: path.into(),
            append,
            entries: Vec::new(),
        }
    }

    pub fn write(&mut self, video_id: u32, intervals: &[PayloadInterval]) {
        let mut bytes = Vec::with_capacity(intervals.len() * 9);
        for &(s, e, p) in intervals {
            bytes.extend_from_slice(&s.to_le_bytes());
            bytes.extend_from_slice(&e.to_le_bytes());
            bytes.push(p);
        }
        self.entries.push((video_id, bytes, intervals.len() as u32));
    }

    pub fn finish(self) -> Result<()> {
        let append_from = self.append.then_some((self.path.as_path(), 9));
        write_index_file(&self.path, self.entries, append_from)
    }
}

#[cfg(test)]
pub struct IsetFileSpec {
    pub entries: Vec<(u32, Vec<Interval>)>,
}

#[cfg(test)]
pub fn write_iset_file(path: impl AsRef<Path>, spec: IsetFileSpec) -> Result<()> {
    let mut w = IntervalSetMappingWriter::create(path.as_ref(), false);
    for (id, intervals) in &spec.entries {
        w.write(*id, intervals);
    }
    w.finish()
}

#[cfg(test)]
pub struct IlistFileSpec {
    pub entries: Vec<(u32, Vec<PayloadInterval>)>,
}

#[cfg(test)]
pub fn write_ilist_file(path: impl AsRef<Path>, spec: IlistFileSpec) -> Result<()> {
    let mut w = IntervalListMappingWriter::create(path.as_ref(), false);
    for (id, intervals) in &spec.entries {
        w.write(*id, intervals);
    }
    w.finish()
}
