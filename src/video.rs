use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use image::RgbaImage;

use crate::error::LumenResult;

/// Produces a decoded frame for a millisecond offset into the source.
/// Implementations are expected to be slow; the cache never calls this
/// while holding its lock.
pub trait FrameDecoder: Send + Sync {
    fn decode(&self, timestamp_ms: i64) -> LumenResult<RgbaImage>;
}

/// Bounded frame cache keyed by millisecond timestamp. A decode worker
/// inserts frames while the render path reads; every map access happens
/// under the mutex, decodes happen outside it.
pub struct VideoFrameCache {
    cache: Mutex<BTreeMap<i64, RgbaImage>>,
    max_items: usize,
    frame_time_ms: i64,
    length_ms: AtomicI64,
}

impl VideoFrameCache {
    pub fn new(frame_time_ms: i64, max_items: usize) -> Self {
        Self {
            cache: Mutex::new(BTreeMap::new()),
            max_items: max_items.max(1),
            frame_time_ms: frame_time_ms.max(1),
            length_ms: AtomicI64::new(0),
        }
    }

    /// Snaps an arbitrary millisecond offset to its frame boundary,
    /// clamped into the known source length when one has been set.
    fn frame_key(&self, timestamp_ms: i64) -> i64 {
        let mut ts = timestamp_ms.max(0) / self.frame_time_ms * self.frame_time_ms;
        let length = self.length_ms.load(Ordering::Relaxed);
        if length > 0 && ts >= length {
            ts = (length - 1) / self.frame_time_ms * self.frame_time_ms;
        }
        ts
    }

    pub fn set_length_ms(&self, length_ms: i64) {
        self.length_ms.store(length_ms, Ordering::Relaxed);
    }

    pub fn length_ms(&self) -> i64 {
        self.length_ms.load(Ordering::Relaxed)
    }

    pub fn has_frame(&self, timestamp_ms: i64) -> bool {
        let key = self.frame_key(timestamp_ms);
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).contains_key(&key)
    }

    /// Inserts a pre-decoded frame, evicting the oldest entries past the
    /// size bound.
    pub fn cache_image(&self, timestamp_ms: i64, image: RgbaImage) {
        let key = self.frame_key(timestamp_ms);
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(key, image);
        Self::bound(&mut cache, self.max_items);
    }

    /// Drops every cached frame that precedes `start`.
    pub fn purge_before(&self, start: i64) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        *cache = cache.split_off(&start);
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }

    /// Returns the frame at (or snapped to) the given offset, decoding
    /// and caching it on a miss. The decode runs without the lock held;
    /// a concurrent insert of the same key is harmless.
    pub fn get_next_frame(&self, timestamp_ms: i64, decoder: &dyn FrameDecoder) -> LumenResult<RgbaImage> {
        let key = self.frame_key(timestamp_ms);

        if let Some(frame) = self.cache.lock().unwrap_or_else(|e| e.into_inner()).get(&key) {
            return Ok(frame.clone());
        }

        tracing::trace!(key, "video cache miss");
        let frame = decoder.decode(key)?;

        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(key, frame.clone());
        Self::bound(&mut cache, self.max_items);
        Ok(frame)
    }

    fn bound(cache: &mut BTreeMap<i64, RgbaImage>, max_items: usize) {
        while cache.len() > max_items {
            let oldest = *cache.keys().next().unwrap();
            cache.remove(&oldest);
        }
    }
}
