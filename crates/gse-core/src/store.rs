//! Append-only sample series shared between the acquisition thread and
//! any number of readers.
//!
//! Samples are kept in fixed-size chunks. Once a chunk fills up it is
//! sealed into an `Arc<[Sample]>` and never touched again, so a snapshot
//! only clones the sealed chunk pointers plus the (bounded) open tail
//! while holding the lock. Readers never hold the lock while iterating.

use crate::sample::Sample;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const DEFAULT_CHUNK_LEN: usize = 1024;

#[derive(Debug, Default)]
struct Series {
    sealed: Vec<Arc<[Sample]>>,
    tail: Vec<Sample>,
    len: usize,
}

#[derive(Debug)]
pub struct SampleStore {
    series: Mutex<Series>,
    chunk_len: usize,
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleStore {
    pub fn new() -> Self {
        Self::with_chunk_len(DEFAULT_CHUNK_LEN)
    }

    pub fn with_chunk_len(chunk_len: usize) -> Self {
        let chunk_len = chunk_len.max(1);
        Self {
            series: Mutex::new(Series {
                sealed: Vec::new(),
                tail: Vec::with_capacity(chunk_len),
                len: 0,
            }),
            chunk_len,
        }
    }

    // Samples are Copy and pushed whole, so a poisoned guard still holds a
    // consistent series.
    fn lock(&self) -> MutexGuard<'_, Series> {
        self.series.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called by the acquisition thread only.
    pub fn append(&self, sample: Sample) {
        let mut series = self.lock();
        series.tail.push(sample);
        series.len += 1;
        if series.tail.len() >= self.chunk_len {
            let full = std::mem::replace(&mut series.tail, Vec::with_capacity(self.chunk_len));
            series.sealed.push(Arc::from(full));
        }
    }

    /// Point-in-time view of every sample appended so far.
    pub fn snapshot(&self) -> Snapshot {
        let series = self.lock();
        let mut chunks = Vec::with_capacity(series.sealed.len() + 1);
        chunks.extend(series.sealed.iter().cloned());
        if !series.tail.is_empty() {
            chunks.push(Arc::from(series.tail.as_slice()));
        }
        Snapshot {
            chunks,
            len: series.len,
        }
    }

    /// Most recent sample, without copying the series.
    pub fn latest(&self) -> Option<Sample> {
        let series = self.lock();
        series
            .tail
            .last()
            .or_else(|| series.sealed.last().and_then(|chunk| chunk.last()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Immutable, ordered view of the series. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    chunks: Vec<Arc<[Sample]>>,
    len: usize,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.chunks.iter().flat_map(|chunk| chunk.iter())
    }

    pub fn last(&self) -> Option<&Sample> {
        self.chunks.last().and_then(|chunk| chunk.last())
    }

    pub fn to_vec(&self) -> Vec<Sample> {
        self.iter().copied().collect()
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl From<Vec<Sample>> for Snapshot {
    fn from(samples: Vec<Sample>) -> Self {
        let len = samples.len();
        let chunks = if samples.is_empty() {
            Vec::new()
        } else {
            vec![Arc::from(samples)]
        };
        Self { chunks, len }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Sample;
    type IntoIter = Box<dyn Iterator<Item = &'a Sample> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
