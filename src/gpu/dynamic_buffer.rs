//! Growable GPU buffers for per-frame streams.
//!
//! Capacity doubles when an upload does not fit and never shrinks. A
//! reallocation invalidates bind groups that reference the old buffer, so
//! writes report whether one happened.

use std::marker::PhantomData;
use std::ops::Range;

/// Smallest buffer ever created, in bytes.
const MIN_CAPACITY: u64 = 64;

/// Byte capacity after growing a buffer of `current` bytes to hold `needed`.
fn grown_capacity(needed: u64, current: u64) -> u64 {
    (needed * 2).max(current + 1024).max(MIN_CAPACITY)
}

/// A GPU buffer that grows on demand.
pub struct DynamicBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
    len: u64,
    usage: wgpu::BufferUsages,
    label: String,
}

impl DynamicBuffer {
    /// Buffer with the given initial byte capacity.
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        initial_capacity: u64,
        usage: wgpu::BufferUsages,
    ) -> Self {
        let capacity = initial_capacity.max(MIN_CAPACITY);
        Self {
            buffer: Self::allocate(device, label, capacity, usage),
            capacity,
            len: 0,
            usage,
            label: label.to_owned(),
        }
    }

    fn allocate(
        device: &wgpu::Device,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Whether writing `bytes` would reallocate the buffer.
    pub fn needs_growth(&self, bytes: u64) -> bool {
        bytes > self.capacity
    }

    /// Write data to the buffer, growing if necessary.
    ///
    /// Returns `true` if the buffer was reallocated (bind groups need
    /// recreation).
    pub fn write<T: bytemuck::Pod>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[T],
    ) -> bool {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let needed = bytes.len() as u64;

        let reallocated = self.needs_growth(needed);
        if reallocated {
            let capacity = grown_capacity(needed, self.capacity);
            log::debug!(
                "growing '{}' from {} to {capacity} bytes",
                self.label,
                self.capacity
            );
            self.buffer =
                Self::allocate(device, &self.label, capacity, self.usage);
            self.capacity = capacity;
        }

        if needed > 0 {
            queue.write_buffer(&self.buffer, 0, bytes);
        }
        self.len = needed;
        reallocated
    }

    /// The underlying wgpu buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Bytes written by the last upload.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the last upload was empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Typed wrapper for [`DynamicBuffer`] that counts items instead of bytes.
pub struct TypedBuffer<T> {
    inner: DynamicBuffer,
    count: usize,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> TypedBuffer<T> {
    const STRIDE: u64 = size_of::<T>() as u64;

    /// Buffer with room for `capacity` items before its first growth.
    pub fn with_capacity(
        device: &wgpu::Device,
        label: &str,
        capacity: usize,
        usage: wgpu::BufferUsages,
    ) -> Self {
        Self {
            inner: DynamicBuffer::new(
                device,
                label,
                Self::STRIDE * capacity as u64,
                usage,
            ),
            count: 0,
            _marker: PhantomData,
        }
    }

    /// Whether writing `count` items would reallocate the buffer.
    pub fn needs_growth(&self, count: usize) -> bool {
        self.inner.needs_growth(Self::STRIDE * count as u64)
    }

    /// Write items to the buffer, growing if necessary.
    ///
    /// Returns `true` if the buffer was reallocated (bind groups need
    /// recreation).
    pub fn write(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[T],
    ) -> bool {
        self.count = data.len();
        self.inner.write(device, queue, data)
    }

    /// Slice covering the items in `range`, for binding as a vertex stream.
    pub fn slice(&self, range: Range<usize>) -> wgpu::BufferSlice<'_> {
        let start = range.start as u64 * Self::STRIDE;
        let end = range.end as u64 * Self::STRIDE;
        self.inner.buffer().slice(start..end)
    }

    /// The underlying wgpu buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        self.inner.buffer()
    }

    /// Items written by the last upload.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether the last upload was empty.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_at_least_doubles_the_request() {
        assert_eq!(grown_capacity(4096, 1024), 8192);
    }

    #[test]
    fn growth_adds_a_kilobyte_for_small_overflows() {
        assert_eq!(grown_capacity(100, 64), 1088);
    }
}
