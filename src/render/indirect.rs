//! Indirect draw arguments and the instanced draw issuer.
//!
//! On the GPU path the culling kernel owns `instance_count`; the draw reads it
//! straight from the argument buffer, so the CPU never has to supply it.

use bytemuck::{Pod, Zeroable};

/// wgpu DrawIndexedIndirect command structure (matches GPU layout)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirect {
    /// Number of indices per instance
    pub index_count: u32,
    /// Number of instances to draw (written by the culling kernel)
    pub instance_count: u32,
    /// First index in the index buffer
    pub first_index: u32,
    /// Value added to vertex indices before indexing into vertex buffer
    pub base_vertex: i32,
    /// First instance to draw (always 0)
    pub first_instance: u32,
}

impl DrawIndexedIndirect {
    /// Per-frame reset value: everything constant, instance count zero.
    pub fn reset(index_count: u32) -> Self {
        Self {
            index_count,
            instance_count: 0,
            first_index: 0,
            base_vertex: 0,
            first_instance: 0,
        }
    }

    pub fn from_words(words: &[u32; 5]) -> Self {
        bytemuck::cast(*words)
    }
}

pub const DRAW_ARGS_SIZE: wgpu::BufferAddress = std::mem::size_of::<DrawIndexedIndirect>() as u64;

/// Where the instanced draw gets its instance count from.
#[derive(Debug, Clone, Copy)]
pub enum DrawSource<'a> {
    /// Argument buffer written by the culling kernel.
    Indirect(&'a wgpu::Buffer),
    /// Count produced on the host.
    Direct(u32),
}

impl DrawSource<'_> {
    pub fn is_indirect(&self) -> bool {
        matches!(self, DrawSource::Indirect(_))
    }
}

/// Issues the single instanced cube draw.
///
/// Pipeline, bind groups, vertex and index buffers must already be bound on
/// the pass; the issuer only records the draw itself.
#[derive(Debug, Clone, Copy)]
pub struct IndirectDrawIssuer {
    index_count: u32,
}

impl IndirectDrawIssuer {
    pub fn new(index_count: u32) -> Self {
        Self { index_count }
    }

    /// Returns the number of draw calls recorded (0 or 1).
    pub fn issue(&self, pass: &mut wgpu::RenderPass<'_>, source: DrawSource<'_>) -> u32 {
        match source {
            DrawSource::Indirect(args) => {
                pass.draw_indexed_indirect(args, 0);
                1
            }
            DrawSource::Direct(0) => 0,
            DrawSource::Direct(instance_count) => {
                pass.draw_indexed(0..self.index_count, 0, 0..instance_count);
                1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_args_layout_is_five_words() {
        assert_eq!(DRAW_ARGS_SIZE, 20);
        let args = DrawIndexedIndirect {
            index_count: 36,
            instance_count: 7,
            first_index: 1,
            base_vertex: 2,
            first_instance: 3,
        };
        let words: &[u32] = bytemuck::cast_slice(std::slice::from_ref(&args));
        assert_eq!(words, &[36, 7, 1, 2, 3]);
        assert_eq!(DrawIndexedIndirect::from_words(&[36, 7, 1, 2, 3]), args);
    }

    #[test]
    fn reset_clears_instance_count_only() {
        let args = DrawIndexedIndirect::reset(36);
        assert_eq!(args.index_count, 36);
        assert_eq!(args.instance_count, 0);
        assert_eq!(args.first_index, 0);
        assert_eq!(args.base_vertex, 0);
        assert_eq!(args.first_instance, 0);
    }
}
