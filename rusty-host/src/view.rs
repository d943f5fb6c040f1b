//! Zero-copy typed views over guest linear memory.
//!
//! A view is only ever a borrow of the memory slice handed out by the store
//! for the current call. Guest calls take the module handle mutably, so a
//! view cannot survive a call that might grow or move the memory; callers
//! re-derive it every time.

use bytemuck::Pod;
use rusty_gpu_shared::Vertex;

use crate::error::ViewError;

/// Where a view lives: byte offset, element count, and element width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewDescriptor {
    pub byte_offset: u32,
    pub count: u32,
    pub element_size: usize,
}

impl ViewDescriptor {
    /// Build a descriptor from the raw `i32` pair a guest export returns.
    pub fn from_guest<T: Pod>(offset: i32, count: i32) -> Result<Self, ViewError> {
        if offset < 0 {
            return Err(ViewError::Negative {
                what: "offset",
                value: offset,
            });
        }
        if count < 0 {
            return Err(ViewError::Negative {
                what: "count",
                value: count,
            });
        }
        Ok(Self {
            byte_offset: offset as u32,
            count: count as u32,
            element_size: std::mem::size_of::<T>(),
        })
    }

    pub fn byte_len(&self) -> u64 {
        self.count as u64 * self.element_size as u64
    }

    pub fn byte_range(&self) -> std::ops::Range<u64> {
        let start = self.byte_offset as u64;
        start..start + self.byte_len()
    }
}

/// Carve `count` elements of `T` out of `memory`, starting exactly at
/// `byte_offset`. The result borrows `memory`; nothing is copied.
pub fn view_of<T: Pod>(memory: &[u8], byte_offset: u32, count: u32) -> Result<&[T], ViewError> {
    let size = std::mem::size_of::<T>() as u64;
    let start = byte_offset as u64;
    let len = count as u64 * size;
    let end = start + len;
    if end > memory.len() as u64 {
        return Err(ViewError::OutOfBounds {
            offset: start,
            len,
            memory_len: memory.len(),
        });
    }
    let bytes = &memory[start as usize..end as usize];
    bytemuck::try_cast_slice(bytes).map_err(|_| ViewError::Misaligned {
        offset: start,
        align: std::mem::align_of::<T>(),
    })
}

/// Carve a fixed-size array out of `memory`, e.g. the 16-float view matrix.
pub fn array_at<T: Pod, const N: usize>(memory: &[u8], byte_offset: u32) -> Result<&[T; N], ViewError> {
    let slice = view_of::<T>(memory, byte_offset, N as u32)?;
    // Length was checked by view_of
    Ok(slice.try_into().unwrap_or_else(|_| unreachable!()))
}

/// Per-frame state borrowed straight out of guest memory.
#[derive(Debug, Clone, Copy)]
pub struct FrameState<'a> {
    pub view_matrix: &'a [f32; 16],
    pub vertices: &'a [Vertex],
}

impl<'a> FrameState<'a> {
    /// The vertex region as raw bytes, ready to upload unmodified.
    pub fn vertex_bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.vertices)
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }
}
