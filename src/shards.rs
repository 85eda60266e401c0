// per-id output shards.
//
// There is one shard per vocabulary id, far more than the process may keep open, so the writer
// keeps a bounded set of open handles. Handles live in a pre-sized arena indexed by id and
// the open ones are threaded on an intrusive doubly linked LRU list of arena indices.
// A shard is created (truncated) the first time it is opened and appended to afterwards.

use crate::error::{ExtractError, Result};
use crate::limits::FileLimit;

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use log::{debug, trace};
use ndarray::{Array2, ArrayView1};
use ndarray_npy::write_npy;

pub const SHARD_EXTENSION: &str = "vectors";

pub fn shard_path(output_dir: &Path, id: usize) -> PathBuf {
    output_dir.join(format!("{}.{}", id, SHARD_EXTENSION))
}

#[derive(Default)]
struct ShardHandle {
    file: Option<BufWriter<File>>,
    prev: Option<usize>, // towards the most recently used end
    next: Option<usize>, // towards the least recently used end
    ever_opened: bool,
}

pub struct ShardWriter {
    output_dir: PathBuf,
    entries: Vec<ShardHandle>,
    head: Option<usize>, // most recently used
    tail: Option<usize>, // least recently used
    open: usize,
    capacity: usize,
    evictions: usize,
}

impl ShardWriter {

    /// `num_shards` fixes the id domain. `capacity` is clamped to what `limit` allows, and to at
    /// least one handle.
    pub fn new(output_dir: &Path, num_shards: usize, capacity: usize, limit: &FileLimit) -> ShardWriter {

        let capacity = capacity.min(limit.usable_handles()).max(1);
        debug!("shard cache: {} shards, at most {} open at once", num_shards, capacity);

        let mut entries = Vec::with_capacity(num_shards);
        entries.resize_with(num_shards, ShardHandle::default);

        Self {
            output_dir: output_dir.to_path_buf(),
            entries,
            head: None,
            tail: None,
            open: 0,
            capacity,
            evictions: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn open_handles(&self) -> usize {
        self.open
    }

    pub fn evictions(&self) -> usize {
        self.evictions
    }

    pub fn num_shards(&self) -> usize {
        self.entries.len()
    }

    /// Returns the open handle of shard `id`, opening it (and closing the least recently used
    /// handle if the cache is full) on a miss.
    pub fn get_handle(&mut self, id: usize) -> Result<&mut BufWriter<File>> {

        if id >= self.entries.len() {
            return Err(ExtractError::Range {
                location: "shard".to_string(),
                index: id as i128,
                vocab_size: self.entries.len(),
            });
        }

        if self.entries[id].file.is_some() {
            self.unlink(id);
            self.push_front(id);
        } else {
            if self.open >= self.capacity {
                self.close_oldest()?;
            }
            self.open_shard(id)?;
        }

        let path = &self.output_dir;
        self.entries[id].file.as_mut().ok_or_else(|| {
            ExtractError::io(shard_path(path, id), std::io::Error::other("shard handle missing after open"))
        })
    }

    /// Appends one record to shard `id`.
    pub fn write_vector(&mut self, id: usize, vector: ArrayView1<'_, f32>) -> Result<()> {

        let mut record: Vec<u8> = Vec::with_capacity(vector.len() * 4);
        for value in vector.iter() {
            record.extend_from_slice(&value.to_ne_bytes());
        }
        let path = shard_path(&self.output_dir, id);
        let handle = self.get_handle(id)?;
        handle.write_all(&record).map_err(|e| ExtractError::io(path, e))
    }

    /// Flushes and closes every open handle.
    pub fn close_all(&mut self) -> Result<()> {
        while self.close_oldest()? {}
        Ok(())
    }

    fn open_shard(&mut self, id: usize) -> Result<()> {

        let path = shard_path(&self.output_dir, id);
        let entry = &mut self.entries[id];
        let file = if entry.ever_opened {
            OpenOptions::new().append(true).open(&path)
        } else {
            File::create(&path)
        }.map_err(|e| ExtractError::io(&path, e))?;

        entry.file = Some(BufWriter::new(file));
        entry.ever_opened = true;
        self.open += 1;
        self.push_front(id);
        Ok(())
    }

    // returns false when nothing was open
    fn close_oldest(&mut self) -> Result<bool> {

        let id = match self.tail {
            Some(id) => id,
            None => return Ok(false),
        };
        self.unlink(id);
        self.open -= 1;
        self.evictions += 1;
        trace!("closing shard {}", id);

        if let Some(mut file) = self.entries[id].file.take() {
            file.flush().map_err(|e| ExtractError::io(shard_path(&self.output_dir, id), e))?;
        }
        Ok(true)
    }

    fn unlink(&mut self, id: usize) {

        let (prev, next) = (self.entries[id].prev.take(), self.entries[id].next.take());
        match prev {
            Some(p) => self.entries[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.entries[n].prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_front(&mut self, id: usize) {

        self.entries[id].prev = None;
        self.entries[id].next = self.head;
        match self.head {
            Some(h) => self.entries[h].prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }
}


/// Reads a shard back as a matrix with one row per recorded context vector.
pub fn read_shard(file_path: &Path, vecdim: usize) -> Result<Array2<f32>> {

    let mut bytes: Vec<u8> = Vec::new();
    File::open(file_path)
        .and_then(|mut f| f.read_to_end(&mut bytes))
        .map_err(|e| ExtractError::io(file_path, e))?;

    let record = vecdim * 4;
    if record == 0 || bytes.len() % record != 0 {
        return Err(ExtractError::Format(format!(
            "{} holds {} bytes, not a whole number of {}-dimensional records",
            file_path.display(), bytes.len(), vecdim
        )));
    }

    let values: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Array2::from_shape_vec((bytes.len() / record, vecdim), values)
        .map_err(|e| ExtractError::Format(e.to_string()))
}

/// Saves a shard as `<output_dir>/<id>.npy` for tools that prefer numpy input.
pub fn export_npy(shard: &Path, output_dir: &Path, vecdim: usize) -> Result<PathBuf> {

    let matrix = read_shard(shard, vecdim)?;
    let stem = shard.file_stem().unwrap_or_default();
    let out = output_dir.join(stem).with_extension("npy");
    write_npy(&out, &matrix).map_err(|e| ExtractError::io(&out, std::io::Error::other(e.to_string())))?;
    Ok(out)
}
