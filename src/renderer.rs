//! Blit of the read-back display pixels onto the window surface.

use wgpu::util::DeviceExt;

use crate::{compute::Extent, texture::Texture};

pub struct VertexBuffer(wgpu::Buffer);

impl VertexBuffer {
    pub fn init_immediate<'label>(
        device: &wgpu::Device,
        content: &[u8],
        label: Option<&'label str>,
    ) -> Self {
        let init_descriptor = wgpu::util::BufferInitDescriptor {
            label,
            contents: content,
            usage: wgpu::BufferUsages::VERTEX,
        };
        let buffer = device.create_buffer_init(&init_descriptor);
        Self(buffer)
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.0
    }
}

pub struct IndexBuffer {
    buffer: wgpu::Buffer,
    format: wgpu::IndexFormat,
}

impl IndexBuffer {
    pub fn init_immediate_u16<'label>(
        device: &wgpu::Device,
        content: &[u16],
        label: Option<&'label str>,
    ) -> Self {
        let init_descriptor = wgpu::util::BufferInitDescriptor {
            label,
            contents: bytemuck::cast_slice(content),
            usage: wgpu::BufferUsages::INDEX,
        };
        let buffer = device.create_buffer_init(&init_descriptor);
        Self {
            buffer,
            format: wgpu::IndexFormat::Uint16,
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn format(&self) -> wgpu::IndexFormat {
        self.format
    }

    pub fn count(&self) -> u32 {
        (self.buffer.size() / Self::format_size(self.format) as u64) as u32
    }

    /// Return the index byte size from the index format
    #[inline(always)]
    pub fn format_size(format: wgpu::IndexFormat) -> u8 {
        match format {
            wgpu::IndexFormat::Uint16 => 2,
            wgpu::IndexFormat::Uint32 => 4,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Full-screen quad; texture row 0 at the top of the window.
#[rustfmt::skip]
pub const QUAD_VERTICES: &[Vertex] = &[
    Vertex { position: [-1.0,  1.0, 0.0], tex_coords: [0.0, 0.0] },
    Vertex { position: [-1.0, -1.0, 0.0], tex_coords: [0.0, 1.0] },
    Vertex { position: [ 1.0, -1.0, 0.0], tex_coords: [1.0, 1.0] },
    Vertex { position: [ 1.0,  1.0, 0.0], tex_coords: [1.0, 0.0] },
];

pub const QUAD_INDICES: &[u16] = &[0, 1, 2, 0, 2, 3];

/// Draws the latest frame texture over the whole surface.
pub struct Blitter {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: VertexBuffer,
    index_buffer: IndexBuffer,
    texture: Texture,
    bind_group: wgpu::BindGroup,
}

impl Blitter {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat, extent: Extent) -> Self {
        let shader = device.create_shader_module(wgpu::include_wgsl!("asset/shader/blit.wgsl"));

        let vertex_buffer = VertexBuffer::init_immediate(
            device,
            bytemuck::cast_slice(QUAD_VERTICES),
            Some("Quad Vertex Buffer"),
        );
        let index_buffer =
            IndexBuffer::init_immediate_u16(device, QUAD_INDICES, Some("Quad Index Buffer"));

        let texture = Texture::new(device, extent, Some("Frame Texture"));

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("frame_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
            label: Some("frame_bind_group"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blit Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[Vertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        Self {
            pipeline,
            vertex_buffer,
            index_buffer,
            texture,
            bind_group,
        }
    }

    /// Copies packed RGBA8 pixels into the frame texture.
    pub fn upload(&self, queue: &wgpu::Queue, pixels: &[u32]) {
        self.texture.update_data(queue, bytemuck::cast_slice(pixels));
    }

    pub fn draw(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Blit Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: true,
                },
            })],
            depth_stencil_attachment: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.buffer().slice(..));
        render_pass.set_index_buffer(
            self.index_buffer.buffer().slice(..),
            self.index_buffer.format(),
        );
        render_pass.draw_indexed(0..self.index_buffer.count(), 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_covers_clip_space_with_ccw_triangles() {
        for triangle in QUAD_INDICES.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|corner| {
                let vertex = &QUAD_VERTICES[triangle[corner] as usize];
                glam::Vec2::from_slice(&vertex.position)
            });
            assert!((b - a).perp_dot(c - a) > 0.0);
        }
    }

    #[test]
    fn vertex_stride_matches_attributes() {
        assert_eq!(Vertex::layout().array_stride, 20);
        assert_eq!(IndexBuffer::format_size(wgpu::IndexFormat::Uint16), 2);
    }
}
