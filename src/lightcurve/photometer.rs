//! Off-screen brightness measurement.

use std::iter;

use cgmath::Point3;
use rayon::prelude::*;
use wgpu::util::DeviceExt;

use crate::{
    camera::{self, CameraUniform, Projection},
    context::Context,
    data_structures::{model::SceneBindings, texture::Texture},
    lightcurve::LightcurveConfig,
    pipelines::basic::mk_lit_pipeline,
    render::{Render, draw_lits},
};

const ZNEAR: f32 = 0.01;
const ZFAR: f32 = 5000.0;

/// Bytes per row of a texture copy, rounded up to what wgpu requires.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    (width * 4).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

/// Sum of the R, G and B channels of an RGBA8 image whose rows are
/// `padded_row` bytes apart. Rows are reduced in parallel.
pub fn sum_intensity(bytes: &[u8], width: u32, height: u32, padded_row: u32) -> anyhow::Result<u64> {
    let (width, height, padded_row) = (width as usize, height as usize, padded_row as usize);
    if width == 0 || height == 0 {
        return Ok(0);
    }
    if padded_row < width * 4 {
        anyhow::bail!("row pitch {padded_row} is smaller than {width} RGBA pixels");
    }
    if bytes.len() < padded_row * (height - 1) + width * 4 {
        anyhow::bail!(
            "{} bytes cannot hold {height} rows of {padded_row} bytes",
            bytes.len()
        );
    }
    let sum = bytes
        .par_chunks(padded_row)
        .take(height)
        .map(|row| {
            row[..width * 4]
                .chunks_exact(4)
                .map(|px| px[0] as u64 + px[1] as u64 + px[2] as u64)
                .sum::<u64>()
        })
        .sum();
    Ok(sum)
}

/// Maps `buffer_slice` for reading and waits until the GPU is done with it.
pub async fn map_read(
    device: &wgpu::Device,
    buffer_slice: wgpu::BufferSlice<'_>,
) -> anyhow::Result<wgpu::BufferView> {
    // map first, then poll, then await; the other order never resolves
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::PollType::Wait {
        submission_index: None,
        timeout: None,
    })?;
    rx.receive()
        .await
        .ok_or_else(|| anyhow::anyhow!("buffer mapping was cancelled"))??;
    Ok(buffer_slice.get_mapped_range())
}

/// Renders lit geometry from an observer into an RGBA8 target and reads back
/// the mean pixel intensity.
#[derive(Debug)]
pub struct Photometer {
    size: [u32; 2],
    target: Texture,
    depth: Texture,
    readback: wgpu::Buffer,
    projection: Projection,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
}

impl Photometer {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    pub fn new(ctx: &Context, config: &LightcurveConfig) -> Self {
        let size = [config.size[0].max(1), config.size[1].max(1)];
        let device = &ctx.device;
        let target = Texture::create_render_target(device, size, Self::FORMAT, "photometer_target");
        let depth = Texture::create_depth_texture(device, size, "photometer_depth");
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Photometer Readback"),
            size: (padded_bytes_per_row(size[0]) * size[1]) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let projection = Projection::new(size[0], size[1], cgmath::Deg(20.0), ZNEAR, ZFAR);
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Photometer Camera Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform::new()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_layout = camera::mk_bind_group_layout(device);
        let camera_bind_group = camera::mk_bind_group(device, &camera_layout, &camera_buffer);
        let pipeline = mk_lit_pipeline(
            device,
            Self::FORMAT,
            &ctx.material_layout,
            &camera_layout,
            &ctx.light.bind_group_layout,
            &ctx.shadow.bind_group_layout,
        );

        Self {
            size,
            target,
            depth,
            readback,
            projection,
            camera_buffer,
            camera_bind_group,
            pipeline,
        }
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// Narrows or widens the observer's field of view.
    pub fn set_fovy(&mut self, fovy: impl Into<cgmath::Rad<f32>>) {
        self.projection = Projection::new(self.size[0], self.size[1], fovy, ZNEAR, ZFAR);
    }

    /// Renders the lit part of `render` as seen from `eye` looking at `target`
    /// and returns the mean RGB intensity in `[0, 1]`. Flat geometry and custom
    /// closures are not part of the measurement.
    ///
    /// With shadows enabled the shadow map is redrawn from `render` first, so
    /// the measurement sees the geometry as it is now.
    pub fn measure(
        &self,
        ctx: &Context,
        eye: Point3<f32>,
        target: Point3<f32>,
        render: Render<'_, '_>,
    ) -> anyhow::Result<f64> {
        let uniform = CameraUniform::look_at(eye, target, &self.projection);
        ctx.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[uniform]));
        ctx.light.write_to_buffer(&ctx.queue);

        let batches = render.into_batches();
        if !batches.flats.is_empty() || !batches.customs.is_empty() {
            log::debug!(
                "photometer skips {} flat and {} custom renders",
                batches.flats.len(),
                batches.customs.len()
            );
        }

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Photometer Encoder"),
            });
        let shadow = ctx.shadow.uniform_for(&ctx.light.uniform);
        ctx.queue
            .write_buffer(&ctx.shadow.buffer, 0, bytemuck::cast_slice(&[shadow]));
        // the frame's shadow map predates any instance updates made since
        if ctx.shadow.enabled() {
            ctx.shadow.encode_pass(&mut encoder, &batches.lits);
        }
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Photometer Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let scene = SceneBindings {
                camera: &self.camera_bind_group,
                light: &ctx.light.bind_group,
                shadow: &ctx.shadow.bind_group,
            };
            draw_lits(&mut render_pass, &self.pipeline, &batches.lits, scene);
        }

        let padded_row = padded_bytes_per_row(self.size[0]);
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &self.target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(self.size[1]),
                },
            },
            wgpu::Extent3d {
                width: self.size[0],
                height: self.size[1],
                depth_or_array_layers: 1,
            },
        );
        ctx.queue.submit(iter::once(encoder.finish()));

        let sum = {
            let data = futures::executor::block_on(map_read(&ctx.device, self.readback.slice(..)))?;
            sum_intensity(&data, self.size[0], self.size[1], padded_row)?
        };
        self.readback.unmap();

        let max = 3.0 * 255.0 * (self.size[0] as f64) * (self.size[1] as f64);
        let brightness = sum as f64 / max;
        log::debug!("photometer sum {sum}, brightness {brightness:.6}");
        Ok(brightness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_the_copy_alignment() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
    }

    #[test]
    fn sums_rgb_and_ignores_alpha_and_padding() {
        let (width, height, padded) = (2u32, 3u32, 16u32);
        let mut bytes = vec![0xAAu8; (padded * height) as usize];
        for row in 0..height as usize {
            for px in 0..width as usize {
                let at = row * padded as usize + px * 4;
                bytes[at..at + 4].copy_from_slice(&[10, 20, 30, 255]);
            }
        }
        let sum = sum_intensity(&bytes, width, height, padded).unwrap();
        assert_eq!(sum, 60 * 6);
    }

    #[test]
    fn last_row_may_be_unpadded() {
        // 2 rows, pitch 12, width 1: the final row only needs 4 bytes
        let bytes = [1, 1, 1, 0, 9, 9, 9, 9, 9, 9, 9, 9, 2, 2, 2, 0];
        assert_eq!(sum_intensity(&bytes, 1, 2, 12).unwrap(), 9);
    }

    #[test]
    fn short_buffers_are_rejected() {
        assert!(sum_intensity(&[0; 8], 2, 2, 8).is_err());
        assert!(sum_intensity(&[0; 64], 4, 1, 8).is_err());
        assert_eq!(sum_intensity(&[], 4, 0, 16).unwrap(), 0);
    }
}
