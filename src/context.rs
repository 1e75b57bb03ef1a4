//! GPU device seam.
//!
//! The loader only ever talks to the graphics API through [`GpuDevice`]: one
//! call per vertex stream, one for the index buffer and one per texture. The
//! wgpu-backed [`Context`] is what applications render with; the
//! [`HostDevice`](crate::host::HostDevice) keeps everything in host memory.
//!
//! Handles are plain owned values. Dropping one releases the resource, which is
//! what makes a failed load leave nothing behind.

use crate::{
    data_structures::texture::Texture,
    error::{Result, SceneError},
};

/// Texel format of an uploaded RGBA8 texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Color data, sampled with sRGB decoding.
    Rgba8UnormSrgb,
    /// Non-color data such as normal maps, sampled linearly.
    Rgba8Unorm,
}

impl PixelFormat {
    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            PixelFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
            PixelFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        }
    }
}

/// Resource creation calls made by a scene load.
///
/// Implementations are synchronous; a call either returns a live handle or fails.
pub trait GpuDevice {
    type Buffer;
    type Texture;

    fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> Result<Self::Buffer>;

    fn create_index_buffer(&self, label: &str, contents: &[u8]) -> Result<Self::Buffer>;

    /// `pixels` holds `width * height` tightly packed RGBA8 texels.
    fn create_texture(
        &self,
        label: &str,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: &[u8],
    ) -> Result<Self::Texture>;
}

/// wgpu device and queue used to create scene resources.
#[derive(Debug)]
pub struct Context {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl Context {
    pub fn from_parts(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    /// Creates a device without a surface, for tools and tests.
    pub async fn new_headless() -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("Using adapter {:?}", adapter.get_info().name);
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("scene-pack headless device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            })
            .await?;
        Ok(Self { device, queue })
    }

    fn create_buffer(
        &self,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> Result<wgpu::Buffer> {
        use wgpu::util::DeviceExt;

        let max = self.device.limits().max_buffer_size;
        if contents.len() as u64 > max {
            return Err(SceneError::GpuResourceCreationFailed {
                label: label.to_string(),
                reason: format!(
                    "{} bytes exceed the device buffer limit of {max} bytes",
                    contents.len()
                ),
            });
        }
        Ok(self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            }))
    }
}

impl GpuDevice for Context {
    type Buffer = wgpu::Buffer;
    type Texture = Texture;

    fn create_vertex_buffer(&self, label: &str, contents: &[u8]) -> Result<wgpu::Buffer> {
        self.create_buffer(label, contents, wgpu::BufferUsages::VERTEX)
    }

    fn create_index_buffer(&self, label: &str, contents: &[u8]) -> Result<wgpu::Buffer> {
        self.create_buffer(label, contents, wgpu::BufferUsages::INDEX)
    }

    fn create_texture(
        &self,
        label: &str,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: &[u8],
    ) -> Result<Texture> {
        let max = self.device.limits().max_texture_dimension_2d;
        check_texture_extent(label, width, height, max, pixels)?;
        Ok(Texture::from_rgba(
            &self.device,
            &self.queue,
            label,
            width,
            height,
            format,
            pixels,
        ))
    }
}

/// Rejects empty, oversized or short texture uploads before they reach the driver.
pub(crate) fn check_texture_extent(
    label: &str,
    width: u32,
    height: u32,
    max_dimension: u32,
    pixels: &[u8],
) -> Result<()> {
    let fail = |reason: String| SceneError::GpuResourceCreationFailed {
        label: label.to_string(),
        reason,
    };
    if width == 0 || height == 0 {
        return Err(fail(format!("empty extent {width}x{height}")));
    }
    if width > max_dimension || height > max_dimension {
        return Err(fail(format!(
            "extent {width}x{height} exceeds the limit of {max_dimension}"
        )));
    }
    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected {
        return Err(fail(format!(
            "expected {expected} bytes of RGBA8 data, got {}",
            pixels.len()
        )));
    }
    Ok(())
}
