//! Material resolution.
//!
//! Decodes each material's base color and normal map images with the `image`
//! crate and uploads them as RGBA8 textures: base color with sRGB sampling,
//! normal maps linear. A bound normal map sets
//! [`features::NORMAL_MAP`](crate::data_structures::scene::features::NORMAL_MAP).

use std::{collections::HashMap, sync::Arc};

use image::{ImageFormat, load_from_memory_with_format};

use crate::{
    context::{GpuDevice, PixelFormat},
    data_structures::{
        document::{DocImage, Document},
        scene::{SurfaceMaterial, features},
    },
    error::{Result, SceneError},
};

/// Decoded RGBA8 pixels.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Decodes an encoded image, using the mime type as a format hint when it is known.
pub fn decode_image(image: &DocImage) -> Result<DecodedImage> {
    let format = image
        .mime_type
        .as_deref()
        .and_then(ImageFormat::from_mime_type);
    let decoded = match format {
        Some(format) => load_from_memory_with_format(&image.data, format),
        None => image::load_from_memory(&image.data),
    }
    .map_err(|source| SceneError::TextureDecodeFailed {
        label: image.label.clone(),
        source,
    })?;
    let rgba = decoded.to_rgba8();
    Ok(DecodedImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

struct Resolver<'a, D: GpuDevice> {
    doc: &'a Document,
    device: &'a D,
    dedup: bool,
    uploaded: HashMap<(usize, PixelFormat), Arc<D::Texture>>,
}

impl<D: GpuDevice> Resolver<'_, D> {
    fn texture(&mut self, texture: usize, format: PixelFormat) -> Result<Arc<D::Texture>> {
        let image_index = self
            .doc
            .textures
            .get(texture)
            .ok_or_else(|| SceneError::malformed(format!("texture {texture} does not exist")))?
            .source;
        let image = self.doc.images.get(image_index).ok_or_else(|| {
            SceneError::malformed(format!(
                "texture {texture} references missing image {image_index}"
            ))
        })?;

        if self.dedup {
            if let Some(uploaded) = self.uploaded.get(&(image_index, format)) {
                log::debug!("Reusing texture '{}'", image.label);
                return Ok(uploaded.clone());
            }
        }

        let decoded = decode_image(image)?;
        let handle = Arc::new(self.device.create_texture(
            &image.label,
            decoded.width,
            decoded.height,
            format,
            &decoded.rgba,
        )?);
        log::debug!(
            "Uploaded texture '{}' ({}x{}, {:?})",
            image.label,
            decoded.width,
            decoded.height,
            format
        );
        if self.dedup {
            self.uploaded.insert((image_index, format), handle.clone());
        }
        Ok(handle)
    }
}

/// Resolves every material of `doc`, in document order.
///
/// On failure the textures uploaded so far are dropped with the partial result.
pub fn resolve_materials<D: GpuDevice>(
    doc: &Document,
    device: &D,
    dedup_textures: bool,
) -> Result<Vec<SurfaceMaterial<D::Texture>>> {
    let mut resolver = Resolver {
        doc,
        device,
        dedup: dedup_textures,
        uploaded: HashMap::new(),
    };

    doc.materials
        .iter()
        .map(|material| {
            let albedo = material
                .base_color_texture
                .map(|texture| resolver.texture(texture, PixelFormat::Rgba8UnormSrgb))
                .transpose()?;
            let normal = material
                .normal_texture
                .map(|texture| resolver.texture(texture, PixelFormat::Rgba8Unorm))
                .transpose()?;
            let feature_mask = if normal.is_some() {
                features::NORMAL_MAP
            } else {
                0
            };
            Ok(SurfaceMaterial {
                albedo,
                normal,
                feature_mask,
            })
        })
        .collect()
}
