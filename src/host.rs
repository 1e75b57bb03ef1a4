//! Host-memory device.
//!
//! [`HostDevice`] implements [`GpuDevice`] by keeping every upload in host
//! memory. It backs offline tooling (the `scene-inspect` binary packs assets
//! without a GPU) and tests, and it counts live allocations so callers can check
//! that nothing outlives a failed load.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use crate::{
    context::{GpuDevice, PixelFormat, check_texture_extent},
    error::{Result, SceneError},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
}

/// Counts allocations that have been created but not dropped yet.
#[derive(Debug)]
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct HostBuffer {
    pub label: String,
    pub kind: BufferKind,
    pub bytes: Vec<u8>,
    _live: LiveGuard,
}

#[derive(Debug)]
pub struct HostTexture {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
    _live: LiveGuard,
}

#[derive(Debug)]
pub struct HostDevice {
    live: Arc<AtomicUsize>,
    created: AtomicUsize,
    max_buffer_size: u64,
    max_texture_dimension: u32,
}

impl HostDevice {
    pub fn new() -> Self {
        let limits = wgpu::Limits::default();
        Self {
            live: Arc::new(AtomicUsize::new(0)),
            created: AtomicUsize::new(0),
            max_buffer_size: limits.max_buffer_size,
            max_texture_dimension: limits.max_texture_dimension_2d,
        }
    }

    /// Buffers larger than `size` bytes fail to create.
    pub fn with_max_buffer_size(mut self, size: u64) -> Self {
        self.max_buffer_size = size;
        self
    }

    pub fn with_max_texture_dimension(mut self, dimension: u32) -> Self {
        self.max_texture_dimension = dimension;
        self
    }

    /// Buffers and textures currently alive.
    pub fn live_allocations(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Buffers and textures created over the device's lifetime.
    pub fn total_allocations(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    fn create_buffer(&self, label: &str, contents: &[u8], kind: BufferKind) -> Result<HostBuffer> {
        if contents.len() as u64 > self.max_buffer_size {
            return Err(SceneError::GpuResourceCreationFailed {
                label: label.to_string(),
                reason: format!(
                    "{} bytes exceed the device buffer limit of {} bytes",
                    contents.len(),
                    self.max_buffer_size
                ),
            });
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(HostBuffer {
            label: label.to_string(),
            kind,
            bytes: contents.to_vec(),
            _live: LiveGuard::new(&self.live),
        })
    }
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuDevice for HostDevice {
    type Buffer = HostBuffer;
    type Texture = HostTexture;

    fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> Result<HostBuffer> {
        self.create_buffer(label, contents, BufferKind::Vertex)
    }

    fn create_index_buffer(&self, label: &str, contents: &[u8]) -> Result<HostBuffer> {
        self.create_buffer(label, contents, BufferKind::Index)
    }

    fn create_texture(
        &self,
        label: &str,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: &[u8],
    ) -> Result<HostTexture> {
        check_texture_extent(label, width, height, self.max_texture_dimension, pixels)?;
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(HostTexture {
            label: label.to_string(),
            width,
            height,
            format,
            pixels: pixels.to_vec(),
            _live: LiveGuard::new(&self.live),
        })
    }
}
