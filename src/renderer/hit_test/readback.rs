//! Two-slot GPU-to-CPU pixel transfer ring.
//!
//! Each frame the *reader* slot receives a copy of this frame's pixel and
//! starts mapping, while the *mapper* slot, filled one frame earlier, is
//! read on the CPU. The roles then swap. The CPU therefore sees a pixel one
//! frame late but never waits on the frame it just submitted.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// `bytes_per_row` alignment required for texture-to-buffer copies.
const ROW_ALIGNMENT: u64 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64;

/// Lifecycle of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotState {
    /// Free to receive a copy.
    Idle,
    /// Copy recorded, not yet submitted.
    Encoded,
    /// Submitted, map requested.
    Mapping,
    /// Mapped; pixel can be read.
    Mapped,
    /// Mapping failed; slot holds no data.
    Failed,
}

impl SlotState {
    fn to_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Encoded => 1,
            Self::Mapping => 2,
            Self::Mapped => 3,
            Self::Failed => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Encoded,
            2 => Self::Mapping,
            3 => Self::Mapped,
            4 => Self::Failed,
            _ => Self::Idle,
        }
    }
}

/// Outcome of resolving a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transfer {
    /// The RGBA8 pixel that was copied.
    Pixel([u8; 4]),
    /// Nothing was requested for that frame, or mapping failed.
    Empty,
    /// The copy has not reached the CPU yet.
    Pending,
}

/// Which slot reads and which maps this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct RingCursor {
    parity: usize,
}

impl RingCursor {
    pub(crate) fn reader(self) -> usize {
        self.parity
    }

    pub(crate) fn mapper(self) -> usize {
        1 - self.parity
    }

    pub(crate) fn advance(&mut self) {
        self.parity = 1 - self.parity;
    }
}

struct PixelSlot {
    buffer: wgpu::Buffer,
    state: Arc<AtomicU8>,
    submission: Option<wgpu::SubmissionIndex>,
}

impl PixelSlot {
    fn new(device: &wgpu::Device, index: usize) -> Self {
        Self {
            buffer: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("Hit Test Readback {index}")),
                size: ROW_ALIGNMENT,
                usage: wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::MAP_READ,
                mapped_at_creation: false,
            }),
            state: Arc::new(AtomicU8::new(SlotState::Idle.to_u8())),
            submission: None,
        }
    }

    fn state(&self) -> SlotState {
        SlotState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: SlotState) {
        self.state.store(state.to_u8(), Ordering::Release);
    }

    fn encode_copy(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        texture: &wgpu::Texture,
        texel: (u32, u32),
    ) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: texel.0,
                    y: texel.1,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(ROW_ALIGNMENT as u32),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        self.set_state(SlotState::Encoded);
    }

    fn begin_map(&mut self, submission: wgpu::SubmissionIndex) {
        self.set_state(SlotState::Mapping);
        self.submission = Some(submission);
        let state = Arc::clone(&self.state);
        self.buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let next = if result.is_ok() {
                    SlotState::Mapped
                } else {
                    SlotState::Failed
                };
                state.store(next.to_u8(), Ordering::Release);
            });
    }

    /// Wait for this slot's own submission if its map is still in flight.
    fn wait(&self, device: &wgpu::Device) {
        if self.state() != SlotState::Mapping {
            return;
        }
        if let Err(e) = device.poll(wgpu::PollType::Poll) {
            log::warn!("device poll failed: {e}");
        }
        if self.state() != SlotState::Mapping {
            return;
        }
        if let Some(submission) = self.submission.clone() {
            if let Err(e) =
                device.poll(wgpu::PollType::WaitForSubmissionIndex(submission))
            {
                log::warn!("waiting on hit-test transfer failed: {e}");
            }
        }
    }

    fn take(&mut self) -> Transfer {
        match self.state() {
            SlotState::Mapped => {
                let pixel = {
                    let view = self.buffer.slice(..).get_mapped_range();
                    [view[0], view[1], view[2], view[3]]
                };
                self.buffer.unmap();
                self.submission = None;
                self.set_state(SlotState::Idle);
                Transfer::Pixel(pixel)
            }
            SlotState::Failed => {
                log::warn!("hit-test pixel map failed");
                self.submission = None;
                self.set_state(SlotState::Idle);
                Transfer::Empty
            }
            SlotState::Mapping => Transfer::Pending,
            SlotState::Idle | SlotState::Encoded => Transfer::Empty,
        }
    }
}

/// Double-buffered single-pixel readback.
pub struct PixelTransferRing {
    slots: [PixelSlot; 2],
    cursor: RingCursor,
}

impl PixelTransferRing {
    /// Two idle slots.
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            slots: [PixelSlot::new(device, 0), PixelSlot::new(device, 1)],
            cursor: RingCursor::default(),
        }
    }

    /// Record a copy of `texel` into the reader slot. Returns `false` if the
    /// reader is still busy with an older transfer and nothing was recorded.
    pub fn request(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        texture: &wgpu::Texture,
        texel: (u32, u32),
    ) -> bool {
        let reader = &self.slots[self.cursor.reader()];
        if reader.state() != SlotState::Idle {
            return false;
        }
        reader.encode_copy(encoder, texture, texel);
        true
    }

    /// Delayed path, called after the frame's submission: start mapping
    /// this frame's copy, read the previous frame's pixel, and swap roles.
    pub(crate) fn advance(
        &mut self,
        device: &wgpu::Device,
        submission: wgpu::SubmissionIndex,
    ) -> Transfer {
        let reader = &mut self.slots[self.cursor.reader()];
        if reader.state() == SlotState::Encoded {
            reader.begin_map(submission);
        }

        let mapper = &mut self.slots[self.cursor.mapper()];
        mapper.wait(device);
        let transfer = mapper.take();

        self.cursor.advance();
        transfer
    }

    /// Blocking path, called after the frame's submission: wait for this
    /// frame's copy and read it immediately.
    pub(crate) fn read_now(
        &mut self,
        device: &wgpu::Device,
        submission: wgpu::SubmissionIndex,
    ) -> Transfer {
        let reader = &mut self.slots[self.cursor.reader()];
        if reader.state() != SlotState::Encoded {
            return Transfer::Empty;
        }
        reader.begin_map(submission);
        reader.wait(device);
        reader.take()
    }

    /// Settle and discard any transfer still owned by the ring, so a switch
    /// between the delayed and blocking paths never surfaces a stale pixel.
    pub fn drain(&mut self, device: &wgpu::Device) {
        for slot in &mut self.slots {
            slot.wait(device);
            let _ = slot.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_alternates_roles() {
        let mut cursor = RingCursor::default();
        let (r0, m0) = (cursor.reader(), cursor.mapper());
        assert_ne!(r0, m0);
        cursor.advance();
        assert_eq!(cursor.reader(), m0);
        assert_eq!(cursor.mapper(), r0);
        cursor.advance();
        assert_eq!(cursor.reader(), r0);
    }

    #[test]
    fn slot_states_survive_atomic_encoding() {
        for state in [
            SlotState::Idle,
            SlotState::Encoded,
            SlotState::Mapping,
            SlotState::Mapped,
            SlotState::Failed,
        ] {
            assert_eq!(SlotState::from_u8(state.to_u8()), state);
        }
    }
}
