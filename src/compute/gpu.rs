use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::{
    camera::{Camera, GpuCamera},
    error::{DispatchError, SetupError},
    scene::Scene,
};

use super::{ComputeDevice, Extent};

/// Entry point of the shading stage in the kernel source.
pub const RENDERER_ENTRY: &str = "renderer";
/// Entry point of the presentation stage in the kernel source.
pub const PRESENT_ENTRY: &str = "present";

/// Per-frame uniform block (`FrameParams` in the kernel).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FrameParams {
    pub camera: GpuCamera,
    pub clear_color: [f32; 4],
    pub sphere_count: u32,
    pub light_count: u32,
    pub image_width: u32,
    pub image_height: u32,
}

/// wgpu compute device running the WGSL kernels.
///
/// Owns every device resource for the lifetime of the application; dropping
/// it releases them.
pub struct GpuDevice {
    extent: Extent,
    sphere_count: u32,
    light_count: u32,
    renderer_pipeline: wgpu::ComputePipeline,
    present_pipeline: wgpu::ComputePipeline,
    renderer_bind_group: wgpu::BindGroup,
    present_bind_group: wgpu::BindGroup,
    buffers: DeviceBuffers,
    queue: wgpu::Queue,
    device: wgpu::Device,
}

struct DeviceBuffers {
    framebuffer: wgpu::Buffer,
    // Written once at startup.
    spheres: wgpu::Buffer,
    lights: wgpu::Buffer,
    params: wgpu::Buffer,
    display: wgpu::Buffer,
    readback: wgpu::Buffer,
}

impl GpuDevice {
    /// Acquires a device, compiles the kernel file at `kernel_path` and
    /// uploads the scene. Blocks until the device is ready.
    pub fn new(scene: &Scene, extent: Extent, kernel_path: &Path) -> Result<Self, SetupError> {
        pollster::block_on(Self::init(scene, extent, kernel_path))
    }

    async fn init(scene: &Scene, extent: Extent, kernel_path: &Path) -> Result<Self, SetupError> {
        let source =
            std::fs::read_to_string(kernel_path).map_err(|source| SetupError::KernelSource {
                path: kernel_path.to_owned(),
                source,
            })?;

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(SetupError::NoAdapter("compute"))?;
        let info = adapter.get_info();
        tracing::info!(adapter = %info.name, backend = ?info.backend, "acquired compute adapter");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Compute Device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let (renderer_pipeline, present_pipeline) =
            build_kernels(&device, &source, kernel_path).await?;
        tracing::info!(path = %kernel_path.display(), "kernel built");

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let buffers = DeviceBuffers::new(&device, scene, extent);
        let renderer_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Renderer Bind Group"),
            layout: &renderer_pipeline.get_bind_group_layout(0),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.framebuffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.spheres.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.lights.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: buffers.params.as_entire_binding(),
                },
            ],
        });
        let present_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Present Bind Group"),
            layout: &present_pipeline.get_bind_group_layout(0),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.framebuffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: buffers.params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: buffers.display.as_entire_binding(),
                },
            ],
        });

        let invalid = device.pop_error_scope().await;
        let out_of_memory = device.pop_error_scope().await;
        if let Some(error) = out_of_memory.or(invalid) {
            return Err(SetupError::Allocation(error.to_string()));
        }

        Ok(Self {
            extent,
            sphere_count: scene.spheres().len() as u32,
            light_count: scene.lights().len() as u32,
            renderer_pipeline,
            present_pipeline,
            renderer_bind_group,
            present_bind_group,
            buffers,
            queue,
            device,
        })
    }

    /// Records one stage over the whole grid, submits it and waits for the
    /// device to go idle.
    fn run_stage(
        &self,
        stage: &'static str,
        pipeline: &wgpu::ComputePipeline,
        bind_group: &wgpu::BindGroup,
    ) -> Result<(), DispatchError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(stage) });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(stage),
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            let (x, y) = self.extent.workgroups();
            pass.dispatch_workgroups(x, y, 1);
        }
        self.queue.submit(Some(encoder.finish()));
        self.device.poll(wgpu::Maintain::Wait);

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(DispatchError::Stage {
                stage,
                message: error.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl ComputeDevice for GpuDevice {
    fn extent(&self) -> Extent {
        self.extent
    }

    fn shade(&mut self, camera: &Camera, clear_color: glam::Vec3) -> Result<(), DispatchError> {
        let params = FrameParams {
            camera: camera.to_gpu(),
            clear_color: clear_color.extend(1.0).to_array(),
            sphere_count: self.sphere_count,
            light_count: self.light_count,
            image_width: self.extent.width,
            image_height: self.extent.height,
        };
        self.queue
            .write_buffer(&self.buffers.params, 0, bytemuck::bytes_of(&params));

        self.run_stage(
            RENDERER_ENTRY,
            &self.renderer_pipeline,
            &self.renderer_bind_group,
        )
    }

    fn present(&mut self) -> Result<(), DispatchError> {
        self.run_stage(PRESENT_ENTRY, &self.present_pipeline, &self.present_bind_group)
    }

    fn read_display(&mut self, pixels: &mut [u32]) -> Result<(), DispatchError> {
        if pixels.len() != self.extent.pixel_count() {
            return Err(DispatchError::SizeMismatch {
                expected: self.extent.pixel_count(),
                actual: pixels.len(),
            });
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(
            &self.buffers.display,
            0,
            &self.buffers.readback,
            0,
            self.buffers.display.size(),
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = self.buffers.readback.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        let mapped = receiver
            .recv()
            .map_err(|_| DispatchError::ReadbackAbandoned)?;
        mapped?;

        {
            let view = slice.get_mapped_range();
            pixels.copy_from_slice(bytemuck::cast_slice(&view[..]));
        }
        self.buffers.readback.unmap();
        Ok(())
    }
}

impl DeviceBuffers {
    fn new(device: &wgpu::Device, scene: &Scene, extent: Extent) -> Self {
        let pixels = extent.pixel_count() as u64;

        let framebuffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Framebuffer"),
            size: pixels * std::mem::size_of::<[f32; 4]>() as u64,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        let spheres = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sphere Buffer"),
            contents: bytemuck::cast_slice(&non_empty(scene.gpu_spheres())),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let lights = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Buffer"),
            contents: bytemuck::cast_slice(&non_empty(scene.gpu_lights())),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Params Buffer"),
            size: std::mem::size_of::<FrameParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let display = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Display Buffer"),
            size: pixels * std::mem::size_of::<u32>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: display.size(),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            framebuffer,
            spheres,
            lights,
            params,
            display,
            readback,
        }
    }
}

/// Compiles the kernel source and resolves both entry points. Validation
/// errors come back as the build log.
async fn build_kernels(
    device: &wgpu::Device,
    source: &str,
    path: &Path,
) -> Result<(wgpu::ComputePipeline, wgpu::ComputePipeline), SetupError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Raytracer Kernel"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let renderer = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("Renderer Pipeline"),
        layout: None,
        module: &module,
        entry_point: RENDERER_ENTRY,
    });
    let present = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("Present Pipeline"),
        layout: None,
        module: &module,
        entry_point: PRESENT_ENTRY,
    });

    match device.pop_error_scope().await {
        Some(error) => Err(SetupError::KernelBuild {
            path: PathBuf::from(path),
            log: error.to_string(),
        }),
        None => Ok((renderer, present)),
    }
}

/// Zero-sized bindings are invalid, so an empty list still uploads one
/// zeroed element; the kernel only reads up to the real count.
fn non_empty<T: Pod>(mut items: Vec<T>) -> Vec<T> {
    if items.is_empty() {
        items.push(T::zeroed());
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::GpuSphere;

    #[test]
    fn frame_params_match_uniform_layout() {
        assert_eq!(std::mem::size_of::<FrameParams>(), 112);
        assert_eq!(std::mem::size_of::<FrameParams>() % 16, 0);
    }

    #[test]
    fn empty_lists_upload_one_zeroed_element() {
        let spheres = non_empty(Vec::<GpuSphere>::new());
        assert_eq!(spheres.len(), 1);
        assert_eq!(spheres[0].radius, 0.0);

        let lights = non_empty(Scene::default().gpu_lights());
        assert_eq!(lights.len(), 1);
        assert_eq!(lights[0].intensity, 0.6);
    }

    #[test]
    fn missing_kernel_file_is_a_setup_error() {
        let path = Path::new("does/not/exist.wgsl");
        let result = GpuDevice::new(&Scene::empty(), Extent::new(16, 16), path);
        assert!(matches!(result, Err(SetupError::KernelSource { .. })));
    }
}
