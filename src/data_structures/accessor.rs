//! Bounds-checked reads through accessors.
//!
//! An [`AccessorView`] resolves accessor -> buffer view -> buffer once and checks
//! that the last element it can address still lies inside the buffer view (and the
//! view inside its buffer). After that, element reads cannot go out of bounds.

use crate::{
    data_structures::document::{Accessor, ComponentType, Document},
    error::{Result, SceneError},
};

/// Validated window over the bytes of one accessor.
#[derive(Clone, Copy, Debug)]
pub struct AccessorView<'a> {
    data: &'a [u8],
    stride: usize,
    element_size: usize,
    count: usize,
    strided: bool,
    component_type: ComponentType,
}

impl<'a> AccessorView<'a> {
    pub fn new(doc: &'a Document, index: usize) -> Result<Self> {
        let accessor = doc
            .accessors
            .get(index)
            .ok_or_else(|| SceneError::malformed(format!("accessor {index} does not exist")))?;
        Self::from_accessor(doc, index, accessor)
    }

    fn from_accessor(doc: &'a Document, index: usize, accessor: &Accessor) -> Result<Self> {
        if accessor.sparse {
            return Err(SceneError::UnsupportedFeature(format!(
                "sparse accessor {index}"
            )));
        }
        let view_index = accessor.buffer_view.ok_or_else(|| {
            SceneError::malformed(format!("accessor {index} has no buffer view"))
        })?;
        let view = doc.buffer_views.get(view_index).ok_or_else(|| {
            SceneError::malformed(format!(
                "accessor {index} references missing buffer view {view_index}"
            ))
        })?;
        let buffer = doc.buffers.get(view.buffer).ok_or_else(|| {
            SceneError::malformed(format!(
                "buffer view {view_index} references missing buffer {}",
                view.buffer
            ))
        })?;
        let view_end = view
            .byte_offset
            .checked_add(view.byte_length)
            .filter(|end| *end <= buffer.len())
            .ok_or_else(|| {
                SceneError::malformed(format!(
                    "buffer view {view_index} ({} + {} bytes) exceeds buffer {} of {} bytes",
                    view.byte_offset,
                    view.byte_length,
                    view.buffer,
                    buffer.len()
                ))
            })?;
        let view_bytes = &buffer[view.byte_offset..view_end];

        let element_size = accessor.element_size();
        let stride = view.byte_stride.unwrap_or(element_size);
        if stride < element_size {
            return Err(SceneError::malformed(format!(
                "accessor {index}: stride {stride} is smaller than its element size {element_size}"
            )));
        }

        let span = match accessor.count {
            0 => 0,
            count => (count - 1)
                .checked_mul(stride)
                .and_then(|s| s.checked_add(element_size))
                .ok_or_else(|| {
                    SceneError::malformed(format!("accessor {index}: byte span overflows"))
                })?,
        };
        let end = accessor
            .byte_offset
            .checked_add(span)
            .filter(|end| *end <= view_bytes.len())
            .ok_or_else(|| {
                SceneError::malformed(format!(
                    "accessor {index} ({} elements at offset {}, stride {stride}) exceeds buffer view {view_index} of {} bytes",
                    accessor.count,
                    accessor.byte_offset,
                    view_bytes.len()
                ))
            })?;

        Ok(Self {
            data: &view_bytes[accessor.byte_offset..end],
            stride,
            element_size,
            count: accessor.count,
            strided: view.byte_stride.is_some(),
            component_type: accessor.component_type,
        })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    pub fn component_type(&self) -> ComponentType {
        self.component_type
    }

    /// Raw bytes of element `i`.
    pub fn element(&self, i: usize) -> &'a [u8] {
        let start = i * self.stride;
        &self.data[start..start + self.element_size]
    }

    /// Copies every element back to back into `dst`.
    ///
    /// Tightly packed sources are copied in one go, strided sources element by element.
    pub fn copy_into(&self, dst: &mut [u8]) {
        let total = self.count * self.element_size;
        if !self.strided {
            dst[..total].copy_from_slice(&self.data[..total]);
            return;
        }
        for (i, chunk) in dst[..total].chunks_exact_mut(self.element_size).enumerate() {
            chunk.copy_from_slice(self.element(i));
        }
    }

    /// Zero-extends 8-bit scalars into little-endian 16-bit elements of `dst`.
    pub fn widen_u8_into(&self, dst: &mut [u8]) {
        for (i, chunk) in dst[..self.count * 2].chunks_exact_mut(2).enumerate() {
            let value = u16::from(self.element(i)[0]);
            chunk.copy_from_slice(&value.to_le_bytes());
        }
    }

    /// Reads the first `N` components of element `i` as floats.
    ///
    /// Normalized unsigned integer components map to `[0, 1]`.
    pub fn read_f32<const N: usize>(&self, i: usize) -> [f32; N] {
        let bytes = self.element(i);
        let mut out = [0.0; N];
        for (c, value) in out.iter_mut().enumerate() {
            *value = match self.component_type {
                ComponentType::F32 => {
                    let at = c * 4;
                    f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
                }
                ComponentType::U8 => f32::from(bytes[c]) / 255.0,
                ComponentType::U16 => {
                    let at = c * 2;
                    f32::from(u16::from_le_bytes([bytes[at], bytes[at + 1]])) / 65535.0
                }
                // Callers validate component types before reading.
                _ => 0.0,
            };
        }
        out
    }

    /// Reads scalar element `i` as an unsigned index.
    pub fn read_index(&self, i: usize) -> u32 {
        let bytes = self.element(i);
        match self.component_type {
            ComponentType::I8 | ComponentType::U8 => u32::from(bytes[0]),
            ComponentType::I16 | ComponentType::U16 => {
                u32::from(u16::from_le_bytes([bytes[0], bytes[1]]))
            }
            _ => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::document::{BufferView, Dimensions};

    fn doc_with(buffer: Vec<u8>, view: BufferView, accessor: Accessor) -> Document {
        Document {
            buffers: vec![buffer],
            buffer_views: vec![view],
            accessors: vec![accessor],
            ..Default::default()
        }
    }

    fn scalar(component_type: ComponentType, count: usize, byte_offset: usize) -> Accessor {
        Accessor {
            buffer_view: Some(0),
            byte_offset,
            count,
            component_type,
            dimensions: Dimensions::Scalar,
            normalized: false,
            sparse: false,
        }
    }

    #[test]
    fn strided_copy_skips_padding() {
        let buffer = vec![1, 0, 0xAA, 0xAA, 2, 0, 0xAA, 0xAA, 3, 0];
        let doc = doc_with(
            buffer.clone(),
            BufferView {
                buffer: 0,
                byte_offset: 0,
                byte_length: buffer.len(),
                byte_stride: Some(4),
            },
            scalar(ComponentType::U16, 3, 0),
        );
        let view = AccessorView::new(&doc, 0).unwrap();
        let mut dst = vec![0u8; 6];
        view.copy_into(&mut dst);
        assert_eq!(dst, vec![1, 0, 2, 0, 3, 0]);
    }

    #[test]
    fn widening_zero_extends_high_bytes() {
        let buffer = vec![0, 1, 2, 0xFF];
        let doc = doc_with(
            buffer,
            BufferView {
                buffer: 0,
                byte_offset: 0,
                byte_length: 4,
                byte_stride: None,
            },
            scalar(ComponentType::I8, 4, 0),
        );
        let view = AccessorView::new(&doc, 0).unwrap();
        let mut dst = vec![0u8; 8];
        view.widen_u8_into(&mut dst);
        let widened: Vec<u16> = dst
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        assert_eq!(widened, vec![0, 1, 2, 255]);
    }

    #[test]
    fn rejects_accessor_past_view_end() {
        let doc = doc_with(
            vec![0; 8],
            BufferView {
                buffer: 0,
                byte_offset: 0,
                byte_length: 8,
                byte_stride: None,
            },
            scalar(ComponentType::U32, 2, 4),
        );
        let err = AccessorView::new(&doc, 0).unwrap_err();
        assert!(matches!(err, SceneError::DocumentMalformed(_)));
    }

    #[test]
    fn rejects_view_past_buffer_end() {
        let doc = doc_with(
            vec![0; 4],
            BufferView {
                buffer: 0,
                byte_offset: 2,
                byte_length: 4,
                byte_stride: None,
            },
            scalar(ComponentType::U8, 1, 0),
        );
        assert!(matches!(
            AccessorView::new(&doc, 0),
            Err(SceneError::DocumentMalformed(_))
        ));
    }

    #[test]
    fn rejects_stride_smaller_than_element() {
        let doc = doc_with(
            vec![0; 16],
            BufferView {
                buffer: 0,
                byte_offset: 0,
                byte_length: 16,
                byte_stride: Some(2),
            },
            scalar(ComponentType::U32, 2, 0),
        );
        assert!(matches!(
            AccessorView::new(&doc, 0),
            Err(SceneError::DocumentMalformed(_))
        ));
    }

    #[test]
    fn sparse_accessors_are_unsupported() {
        let mut accessor = scalar(ComponentType::U8, 1, 0);
        accessor.sparse = true;
        let doc = doc_with(
            vec![0; 1],
            BufferView {
                buffer: 0,
                byte_offset: 0,
                byte_length: 1,
                byte_stride: None,
            },
            accessor,
        );
        assert!(matches!(
            AccessorView::new(&doc, 0),
            Err(SceneError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn normalized_u8_reads_as_unit_float() {
        let doc = doc_with(
            vec![255, 0],
            BufferView {
                buffer: 0,
                byte_offset: 0,
                byte_length: 2,
                byte_stride: None,
            },
            Accessor {
                dimensions: Dimensions::Vec2,
                normalized: true,
                ..scalar(ComponentType::U8, 1, 0)
            },
        );
        let view = AccessorView::new(&doc, 0).unwrap();
        assert_eq!(view.read_f32::<2>(0), [1.0, 0.0]);
    }
}
