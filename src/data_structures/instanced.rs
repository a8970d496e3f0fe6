use wgpu::util::DeviceExt;

use crate::data_structures::{
    instance::{Instance, InstanceRaw},
    model,
};

/**
 * A model drawn once per entry in `instances`.
 *
 * The instance buffer is sized on creation; `update` rewrites it in place and
 * only reallocates when the number of instances grows.
 */
#[derive(Debug)]
pub struct InstancedModel {
    pub model: model::Model,
    pub instances: Vec<Instance>,
    pub instance_buffer: wgpu::Buffer,
    capacity: usize,
}

impl InstancedModel {
    pub fn new(device: &wgpu::Device, model: model::Model, instances: Vec<Instance>) -> Self {
        let instance_buffer = mk_instance_buffer(device, &instances);
        let capacity = instances.len();
        Self {
            model,
            instances,
            instance_buffer,
            capacity,
        }
    }

    pub fn single(device: &wgpu::Device, model: model::Model) -> Self {
        Self::new(device, model, vec![Instance::new()])
    }

    /// Uploads the current `instances`.
    pub fn update(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if self.instances.len() > self.capacity {
            self.instance_buffer = mk_instance_buffer(device, &self.instances);
            self.capacity = self.instances.len();
            return;
        }
        let data = self.instances.iter().map(Instance::to_raw).collect::<Vec<_>>();
        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&data));
    }

    pub fn set_instances(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        instances: impl IntoIterator<Item = Instance>,
    ) {
        self.instances = instances.into_iter().collect();
        self.update(device, queue);
    }
}

fn mk_instance_buffer(device: &wgpu::Device, instances: &[Instance]) -> wgpu::Buffer {
    let mut instance_data = instances.iter().map(Instance::to_raw).collect::<Vec<_>>();
    // zero-sized vertex buffers cannot be bound
    if instance_data.is_empty() {
        instance_data.push(Instance::new().to_raw());
    }
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Instance Buffer"),
        contents: bytemuck::cast_slice::<InstanceRaw, u8>(&instance_data),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    })
}
