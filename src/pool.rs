//! Buffer Pool & Encoder State
//!
//! Every string written to the terminal passes through two scratch buffers:
//! the intermediate transcoding buffer and the native cell array. Both are
//! borrowed from process-wide pools and handed back when the borrowing
//! guard drops, so early returns and failed conversions release them too.

use std::mem::size_of;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::config::PoolConfig;
use crate::layout::{CCharUtf16, CCharUtf32, ChType32, ChType64};

/// Counters describing pool traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Buffers handed out from the pool (recycled or freshly allocated)
    pub acquired: usize,
    /// Pooled buffers handed back
    pub released: usize,
    /// Requests above the pooled size limit, served by a plain allocation
    pub unpooled: usize,
    /// Buffers currently waiting on the free list
    pub retained: usize,
}

impl PoolStats {
    /// Pooled buffers currently borrowed
    pub fn outstanding(&self) -> usize {
        self.acquired.saturating_sub(self.released)
    }
}

/// A free list of reusable buffers of `T`.
///
/// A buffer leaves the free list under the lock before it is handed out, so
/// two overlapping borrowers can never see the same allocation.
#[derive(Debug)]
pub struct BufferPool<T> {
    free: Mutex<Vec<Vec<T>>>,
    max_retained: usize,
    max_len: usize,
    acquired: AtomicUsize,
    released: AtomicUsize,
    unpooled: AtomicUsize,
}

impl<T: Copy + Default> BufferPool<T> {
    pub fn new(max_retained: usize, max_len: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_retained,
            max_len,
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            unpooled: AtomicUsize::new(0),
        }
    }

    /// Borrow a buffer of exactly `len` default-initialized elements
    pub fn acquire(&self, len: usize) -> PooledBuffer<'_, T> {
        if len > self.max_len {
            self.unpooled.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(len, limit = self.max_len, "unpooled buffer");
            return PooledBuffer {
                data: vec![T::default(); len],
                pool: None,
            };
        }

        let mut data = self.lock().pop().unwrap_or_default();
        data.clear();
        data.resize(len, T::default());
        self.acquired.fetch_add(1, Ordering::Relaxed);
        PooledBuffer {
            data,
            pool: Some(self),
        }
    }

    /// Hand a buffer back. Equivalent to dropping it.
    pub fn release(&self, buffer: PooledBuffer<'_, T>) {
        drop(buffer);
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            acquired: self.acquired.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            unpooled: self.unpooled.load(Ordering::Relaxed),
            retained: self.lock().len(),
        }
    }

    fn give_back(&self, mut data: Vec<T>) {
        self.released.fetch_add(1, Ordering::Relaxed);
        data.clear();
        let mut free = self.lock();
        if free.len() < self.max_retained {
            free.push(data);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Vec<T>>> {
        // The free list holds no invariant a panicking borrower could break
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusively borrowed buffer; returns itself to its pool on drop
#[derive(Debug)]
pub struct PooledBuffer<'p, T: Copy + Default> {
    data: Vec<T>,
    pool: Option<&'p BufferPool<T>>,
}

impl<T: Copy + Default> PooledBuffer<'_, T> {
    /// True when the buffer came from the pool rather than a fallback allocation
    pub fn is_pooled(&self) -> bool {
        self.pool.is_some()
    }
}

impl<T: Copy + Default> Deref for PooledBuffer<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T: Copy + Default> DerefMut for PooledBuffer<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: Copy + Default> Drop for PooledBuffer<'_, T> {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.give_back(std::mem::take(&mut self.data));
        }
    }
}

/// A pooled run of `len` elements, optionally followed by one zeroed
/// terminator slot.
#[derive(Debug)]
pub struct BufferedRegion<'p, T: Copy + Default> {
    buffer: PooledBuffer<'p, T>,
    len: usize,
    terminated: bool,
}

impl<'p, T: Copy + Default> BufferedRegion<'p, T> {
    pub fn acquire(pool: &'p BufferPool<T>, len: usize, terminated: bool) -> Self {
        Self {
            buffer: pool.acquire(len + usize::from(terminated)),
            len,
            terminated,
        }
    }

    /// Logical element count, excluding the terminator
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn as_slice(&self) -> &[T] {
        &self.buffer[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.buffer[..self.len]
    }

    /// Elements including the terminator slot, if any
    pub fn with_terminator(&self) -> &[T] {
        &self.buffer
    }

    pub fn as_ptr(&self) -> *const T {
        self.buffer.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.buffer.as_mut_ptr()
    }
}

/// Scratch state of one string conversion.
///
/// The intermediate buffer holds the first-stage transcoding of the input.
/// `intermediate_len` counts the bytes actually produced there and
/// `output_len` the logical units the second stage lays out as cells.
#[derive(Debug)]
pub struct EncoderState<'p> {
    intermediate: PooledBuffer<'p, u8>,
    intermediate_len: usize,
    output_len: usize,
}

impl<'p> EncoderState<'p> {
    pub fn new(pool: &'p BufferPool<u8>, capacity: usize) -> Self {
        Self {
            intermediate: pool.acquire(capacity),
            intermediate_len: 0,
            output_len: 0,
        }
    }

    /// Bytes produced by the first stage
    pub fn intermediate(&self) -> &[u8] {
        &self.intermediate[..self.intermediate_len]
    }

    pub fn intermediate_len(&self) -> usize {
        self.intermediate_len
    }

    pub fn output_len(&self) -> usize {
        self.output_len
    }

    /// Whole intermediate buffer, for the first stage to write into
    pub(crate) fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.intermediate
    }

    pub(crate) fn set_lengths(&mut self, intermediate_len: usize, output_len: usize) {
        debug_assert!(intermediate_len <= self.intermediate.len());
        self.intermediate_len = intermediate_len;
        self.output_len = output_len;
    }
}

/// Element types that have a pool in [`Pools`]
pub trait Poolable: Copy + Default + Send + 'static {
    fn pool(pools: &Pools) -> &BufferPool<Self>;
}

/// One pool per scratch element type used by the codecs
#[derive(Debug)]
pub struct Pools {
    bytes: BufferPool<u8>,
    cells16: BufferPool<CCharUtf16>,
    cells32: BufferPool<CCharUtf32>,
    cells16_long: BufferPool<CCharUtf16<u64>>,
    cells32_long: BufferPool<CCharUtf32<u64>>,
    narrow32: BufferPool<ChType32>,
    narrow64: BufferPool<ChType64>,
}

impl Pools {
    pub fn new(config: &PoolConfig) -> Self {
        let retained = config.max_retained;
        let bytes = config.max_buffer_len;
        Self {
            bytes: BufferPool::new(retained, bytes),
            cells16: BufferPool::new(retained, bytes / size_of::<CCharUtf16>()),
            cells32: BufferPool::new(retained, bytes / size_of::<CCharUtf32>()),
            cells16_long: BufferPool::new(retained, bytes / size_of::<CCharUtf16<u64>>()),
            cells32_long: BufferPool::new(retained, bytes / size_of::<CCharUtf32<u64>>()),
            narrow32: BufferPool::new(retained, bytes / 4),
            narrow64: BufferPool::new(retained, bytes / 8),
        }
    }

    pub fn get<T: Poolable>(&self) -> &BufferPool<T> {
        T::pool(self)
    }

    /// Traffic summed over every pool
    pub fn stats(&self) -> PoolStats {
        [
            self.bytes.stats(),
            self.cells16.stats(),
            self.cells32.stats(),
            self.cells16_long.stats(),
            self.cells32_long.stats(),
            self.narrow32.stats(),
            self.narrow64.stats(),
        ]
        .into_iter()
        .fold(PoolStats::default(), |acc, s| PoolStats {
            acquired: acc.acquired + s.acquired,
            released: acc.released + s.released,
            unpooled: acc.unpooled + s.unpooled,
            retained: acc.retained + s.retained,
        })
    }
}

impl Default for Pools {
    fn default() -> Self {
        Self::new(&PoolConfig::default())
    }
}

macro_rules! poolable {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl Poolable for $ty {
                fn pool(pools: &Pools) -> &BufferPool<Self> {
                    &pools.$field
                }
            }
        )*
    };
}

poolable! {
    u8 => bytes,
    CCharUtf16 => cells16,
    CCharUtf32 => cells32,
    CCharUtf16<u64> => cells16_long,
    CCharUtf32<u64> => cells32_long,
    ChType32 => narrow32,
    ChType64 => narrow64,
}
