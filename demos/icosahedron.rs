use glam::{Mat4, Quat, Vec3};
use stereogram_engine::{
    app::{run_app, FrameContext, WindowConfig},
    Camera, DepthCapture, DisplayMode, Scene, StereogramConfig, StereogramEngine,
};
use wgpu::util::DeviceExt;
use winit::keyboard::{Key, NamedKey};

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug)]
struct MeshVertex {
    position: [f32; 3],
    normal: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug)]
struct SceneUniform {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    light_dir: [f32; 4],
}

/// Flat-shaded icosahedron lit by one directional light plus ambient.
struct IcosahedronScene {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    position: Vec3,
    rotation_y: f32,
}

impl IcosahedronScene {
    fn new(device: &wgpu::Device, radius: f32, position: Vec3) -> Self {
        let vertices = icosahedron_vertices(radius);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Icosahedron Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniform Buffer"),
            size: std::mem::size_of::<SceneUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<SceneUniform>() as _),
                },
                count: None,
            }],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("scene_bind_group"),
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Scene Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: DepthCapture::COLOR_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthCapture::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            vertex_buffer,
            vertex_count: vertices.len() as u32,
            uniform_buffer,
            bind_group,
            position,
            rotation_y: 0.0,
        }
    }
}

impl Scene for IcosahedronScene {
    fn prepare(&mut self, queue: &wgpu::Queue, camera: &Camera) {
        let model = Mat4::from_rotation_translation(Quat::from_rotation_y(self.rotation_y), self.position);
        let uniform = SceneUniform {
            view_proj: camera.view_proj().to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            light_dir: [0.0, 1.0, 0.0, 0.0],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    fn draw(&self, rpass: &mut wgpu::RenderPass<'_>) {
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        rpass.draw(0..self.vertex_count, 0..1);
    }
}

/// Non-indexed triangles with one normal per face.
fn icosahedron_vertices(radius: f32) -> Vec<MeshVertex> {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let corners = [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ]
    .map(|c| c.normalize() * radius);

    const FACES: [[usize; 3]; 20] = [
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    FACES
        .iter()
        .flat_map(|&[a, b, c]| {
            let normal = (corners[b] - corners[a])
                .cross(corners[c] - corners[a])
                .normalize()
                .to_array();
            [a, b, c].map(|i| MeshVertex {
                position: corners[i].to_array(),
                normal,
            })
        })
        .collect()
}

struct Demo {
    scene: Option<IcosahedronScene>,
    camera: Camera,
    auto_rotate: bool,
}

impl Demo {
    fn frame(&mut self, engine: &mut StereogramEngine<'static>, ctx: &FrameContext) {
        let mut screenshot = false;
        for key in &ctx.pressed_keys {
            let controller = engine.controller_mut();
            match key.as_ref() {
                Key::Character("1") => controller.set_display_mode(DisplayMode::Stereo),
                Key::Character("2") => controller.set_display_mode(DisplayMode::Depth),
                Key::Character("3") => controller.set_display_mode(DisplayMode::Original),
                // the controller takes any value, limits live here
                Key::Named(NamedKey::ArrowLeft) => {
                    let px = (controller.repeat_size() - 10.0).clamp(10.0, 500.0);
                    controller.set_repeat_size(px);
                }
                Key::Named(NamedKey::ArrowRight) => {
                    let px = (controller.repeat_size() + 10.0).clamp(10.0, 500.0);
                    controller.set_repeat_size(px);
                }
                Key::Named(NamedKey::ArrowDown) => {
                    let f = (controller.max_step_fraction() - 0.05).clamp(0.01, 0.9);
                    controller.set_max_step_fraction(f);
                }
                Key::Named(NamedKey::ArrowUp) => {
                    let f = (controller.max_step_fraction() + 0.05).clamp(0.01, 0.9);
                    controller.set_max_step_fraction(f);
                }
                Key::Named(NamedKey::Space) => self.auto_rotate = !self.auto_rotate,
                Key::Character("p") => screenshot = true,
                _ => continue,
            }
            let controller = engine.controller();
            log::info!(
                "mode={} repeat_size={} max_step={:.2} auto_rotate={}",
                controller.display_mode(),
                controller.repeat_size(),
                controller.max_step_fraction(),
                self.auto_rotate
            );
        }

        self.camera
            .set_viewport(ctx.viewport.width, ctx.viewport.height);
        let scene = self.scene.get_or_insert_with(|| {
            IcosahedronScene::new(engine.device(), 2.5, Vec3::new(0.0, 0.0, -4.0))
        });
        if self.auto_rotate {
            scene.rotation_y += ctx.delta_time;
        }

        if screenshot {
            match engine.capture_frame(scene, &self.camera) {
                Ok(image) => match image.save("stereogram.png") {
                    Ok(()) => log::info!("saved stereogram.png"),
                    Err(err) => log::error!("could not save screenshot: {err}"),
                },
                Err(err) => log::error!("screenshot failed: {err}"),
            }
        }

        if let Err(err) = engine.render(scene, &self.camera) {
            log::error!("frame failed: {err}");
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let engine_config = match std::env::var("STEREOGRAM_CONFIG") {
        Ok(path) => StereogramConfig::load(path)?,
        Err(_) => StereogramConfig::default(),
    };

    let mut demo = Demo {
        scene: None,
        camera: Camera::perspective(75.0, 16.0 / 9.0, 0.1, 4.0),
        auto_rotate: true,
    };

    run_app(WindowConfig::default(), engine_config, move |engine, ctx| {
        demo.frame(engine, ctx)
    })
}
