//! Device-free stand-ins for the command stream and the frame device, used by tests and
//! benchmarks

use anyhow::Result;
use ash::vk;
use ash::vk::Handle;

use crate::context::Deferred;
use crate::error::SyncError;
use crate::sync::BarrierBatch;
use crate::traits::{CommandStream, FrameDevice};

/// Install a `tracing` subscriber writing into the test harness output
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// A command forwarded to a [`TestStream`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Barrier(BarrierBatch),
    CopyBuffer {
        src: vk::Buffer,
        dst: vk::Buffer,
        regions: usize,
    },
    FillBuffer {
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
        data: u32,
    },
    UpdateBuffer {
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        data: Vec<u8>,
    },
    CopyImage {
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
    },
    CopyBufferToImage {
        src: vk::Buffer,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
    },
    CopyImageToBuffer {
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Buffer,
    },
    BlitImage {
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        filter: vk::Filter,
    },
    ClearColorImage {
        image: vk::Image,
        layout: vk::ImageLayout,
    },
    BindPipeline {
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
    },
    BindDescriptorSets {
        bind_point: vk::PipelineBindPoint,
        first_set: u32,
        sets: Vec<vk::DescriptorSet>,
    },
    PushConstants {
        offset: u32,
        data: Vec<u8>,
    },
    BindVertexBuffers {
        first_binding: u32,
        buffers: Vec<vk::Buffer>,
    },
    BindIndexBuffer {
        buffer: vk::Buffer,
        index_type: vk::IndexType,
    },
    Dispatch([u32; 3]),
    DispatchIndirect {
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
    },
    DrawIndirect {
        buffer: vk::Buffer,
        draw_count: u32,
    },
    DrawIndexedIndirect {
        buffer: vk::Buffer,
        draw_count: u32,
    },
    BeginRenderPass {
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
    },
    EndRenderPass,
}

impl Command {
    /// Raw handles of every buffer and image the command references
    pub fn resources(&self) -> Vec<u64> {
        match self {
            Command::Barrier(batch) => batch
                .buffer_barriers()
                .iter()
                .map(|barrier| barrier.buffer.as_raw())
                .chain(
                    batch
                        .image_barriers()
                        .iter()
                        .map(|barrier| barrier.image.as_raw()),
                )
                .collect(),
            Command::CopyBuffer { src, dst, .. } => vec![src.as_raw(), dst.as_raw()],
            Command::FillBuffer { buffer, .. }
            | Command::UpdateBuffer { buffer, .. }
            | Command::BindIndexBuffer { buffer, .. }
            | Command::DispatchIndirect { buffer, .. }
            | Command::DrawIndirect { buffer, .. }
            | Command::DrawIndexedIndirect { buffer, .. } => vec![buffer.as_raw()],
            Command::CopyImage { src, dst, .. } | Command::BlitImage { src, dst, .. } => {
                vec![src.as_raw(), dst.as_raw()]
            }
            Command::CopyBufferToImage { src, dst, .. } => vec![src.as_raw(), dst.as_raw()],
            Command::CopyImageToBuffer { src, dst, .. } => vec![src.as_raw(), dst.as_raw()],
            Command::ClearColorImage { image, .. } => vec![image.as_raw()],
            Command::BindVertexBuffers { buffers, .. } => {
                buffers.iter().map(|buffer| buffer.as_raw()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// A [`CommandStream`] that records what it is handed
#[derive(Debug, Default, Clone)]
pub struct TestStream {
    commands: Vec<Command>,
}

impl TestStream {
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Every barrier batch in recording order
    pub fn batches(&self) -> Vec<&BarrierBatch> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                Command::Barrier(batch) => Some(batch),
                _ => None,
            })
            .collect()
    }

    /// Total number of individual barriers across every batch
    pub fn barrier_count(&self) -> usize {
        self.batches().iter().map(|batch| batch.len()).sum()
    }

    /// Everything but the barriers
    pub fn forwarded(&self) -> Vec<&Command> {
        self.commands
            .iter()
            .filter(|command| !matches!(command, Command::Barrier(_)))
            .collect()
    }

    /// Raw handles of every resource referenced by the recording, for [`TestDevice::submit`]
    pub fn resources(&self) -> Vec<u64> {
        let mut resources: Vec<u64> = self
            .commands
            .iter()
            .flat_map(Command::resources)
            .collect();
        resources.sort_unstable();
        resources.dedup();
        resources
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl CommandStream for TestStream {
    fn pipeline_barrier(&mut self, batch: &BarrierBatch) {
        self.commands.push(Command::Barrier(batch.clone()));
    }

    fn copy_buffer(&mut self, src: vk::Buffer, dst: vk::Buffer, regions: &[vk::BufferCopy]) {
        self.commands.push(Command::CopyBuffer {
            src,
            dst,
            regions: regions.len(),
        });
    }

    fn fill_buffer(
        &mut self,
        buffer: vk::Buffer,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
        data: u32,
    ) {
        self.commands.push(Command::FillBuffer {
            buffer,
            offset,
            size,
            data,
        });
    }

    fn update_buffer(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize, data: &[u8]) {
        self.commands.push(Command::UpdateBuffer {
            buffer,
            offset,
            data: data.to_vec(),
        });
    }

    fn copy_image(
        &mut self,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        _regions: &[vk::ImageCopy],
    ) {
        self.commands.push(Command::CopyImage {
            src,
            src_layout,
            dst,
            dst_layout,
        });
    }

    fn copy_buffer_to_image(
        &mut self,
        src: vk::Buffer,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        _regions: &[vk::BufferImageCopy],
    ) {
        self.commands.push(Command::CopyBufferToImage {
            src,
            dst,
            dst_layout,
        });
    }

    fn copy_image_to_buffer(
        &mut self,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Buffer,
        _regions: &[vk::BufferImageCopy],
    ) {
        self.commands.push(Command::CopyImageToBuffer {
            src,
            src_layout,
            dst,
        });
    }

    fn blit_image(
        &mut self,
        src: vk::Image,
        src_layout: vk::ImageLayout,
        dst: vk::Image,
        dst_layout: vk::ImageLayout,
        _regions: &[vk::ImageBlit],
        filter: vk::Filter,
    ) {
        self.commands.push(Command::BlitImage {
            src,
            src_layout,
            dst,
            dst_layout,
            filter,
        });
    }

    fn clear_color_image(
        &mut self,
        image: vk::Image,
        layout: vk::ImageLayout,
        _color: &vk::ClearColorValue,
        _ranges: &[vk::ImageSubresourceRange],
    ) {
        self.commands
            .push(Command::ClearColorImage { image, layout });
    }

    fn bind_pipeline(&mut self, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        self.commands.push(Command::BindPipeline {
            bind_point,
            pipeline,
        });
    }

    fn bind_descriptor_sets(
        &mut self,
        bind_point: vk::PipelineBindPoint,
        _layout: vk::PipelineLayout,
        first_set: u32,
        sets: &[vk::DescriptorSet],
        _dynamic_offsets: &[u32],
    ) {
        self.commands.push(Command::BindDescriptorSets {
            bind_point,
            first_set,
            sets: sets.to_vec(),
        });
    }

    fn push_constants(
        &mut self,
        _layout: vk::PipelineLayout,
        _stages: vk::ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) {
        self.commands.push(Command::PushConstants {
            offset,
            data: data.to_vec(),
        });
    }

    fn bind_vertex_buffers(
        &mut self,
        first_binding: u32,
        buffers: &[vk::Buffer],
        _offsets: &[vk::DeviceSize],
    ) {
        self.commands.push(Command::BindVertexBuffers {
            first_binding,
            buffers: buffers.to_vec(),
        });
    }

    fn bind_index_buffer(
        &mut self,
        buffer: vk::Buffer,
        _offset: vk::DeviceSize,
        index_type: vk::IndexType,
    ) {
        self.commands.push(Command::BindIndexBuffer { buffer, index_type });
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.commands.push(Command::Dispatch([x, y, z]));
    }

    fn dispatch_indirect(&mut self, buffer: vk::Buffer, offset: vk::DeviceSize) {
        self.commands
            .push(Command::DispatchIndirect { buffer, offset });
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, _first_vertex: u32, _first_instance: u32) {
        self.commands.push(Command::Draw {
            vertex_count,
            instance_count,
        });
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        _first_index: u32,
        _vertex_offset: i32,
        _first_instance: u32,
    ) {
        self.commands.push(Command::DrawIndexed {
            index_count,
            instance_count,
        });
    }

    fn draw_indirect(
        &mut self,
        buffer: vk::Buffer,
        _offset: vk::DeviceSize,
        draw_count: u32,
        _stride: u32,
    ) {
        self.commands
            .push(Command::DrawIndirect { buffer, draw_count });
    }

    fn draw_indexed_indirect(
        &mut self,
        buffer: vk::Buffer,
        _offset: vk::DeviceSize,
        draw_count: u32,
        _stride: u32,
    ) {
        self.commands
            .push(Command::DrawIndexedIndirect { buffer, draw_count });
    }

    fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        _render_area: vk::Rect2D,
        _clear_values: &[vk::ClearValue],
    ) {
        self.commands.push(Command::BeginRenderPass {
            render_pass,
            framebuffer,
        });
    }

    fn end_render_pass(&mut self) {
        self.commands.push(Command::EndRenderPass);
    }
}

/// A [`FrameDevice`] modelling which resources submitted work may still be reading.
///
/// Work is marked in flight per slot with [`TestDevice::submit`] and retires when that slot is
/// waited on (or [`TestDevice::complete`] is called). Destroying an object that in-flight work
/// references is recorded as a violation instead of crashing.
#[derive(Debug, Default, Clone)]
pub struct TestDevice {
    in_flight: Vec<Vec<u64>>,
    waits: Vec<usize>,
    destroyed: Vec<Deferred>,
    violations: Vec<Deferred>,
}

impl TestDevice {
    pub fn new(slot_count: usize) -> Self {
        Self {
            in_flight: vec![Vec::new(); slot_count],
            ..Default::default()
        }
    }

    /// Marks `resources` as read by the work submitted for `slot`
    pub fn submit(&mut self, slot: usize, resources: impl IntoIterator<Item = u64>) {
        if let Some(in_flight) = self.in_flight.get_mut(slot) {
            in_flight.extend(resources);
        }
    }

    /// Retires the work of `slot` without a wait
    pub fn complete(&mut self, slot: usize) {
        if let Some(in_flight) = self.in_flight.get_mut(slot) {
            in_flight.clear();
        }
    }

    pub fn is_in_flight(&self, raw: u64) -> bool {
        self.in_flight.iter().any(|slot| slot.contains(&raw))
    }

    /// Slots waited on, in order
    pub fn waits(&self) -> &[usize] {
        &self.waits
    }

    pub fn destroyed(&self) -> &[Deferred] {
        &self.destroyed
    }

    /// Objects destroyed while submitted work still referenced them
    pub fn violations(&self) -> &[Deferred] {
        &self.violations
    }

    fn destroy(&mut self, object: Deferred, raw: u64) {
        if self.is_in_flight(raw) {
            self.violations.push(object);
        }
        self.destroyed.push(object);
    }
}

impl FrameDevice for TestDevice {
    fn wait_for_slot(&mut self, slot: usize, _timeout_ns: u64) -> Result<()> {
        let in_flight = self
            .in_flight
            .get_mut(slot)
            .ok_or(SyncError::InvalidConfig("slot has no fence"))?;
        in_flight.clear();
        self.waits.push(slot);
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: vk::Buffer) {
        self.destroy(Deferred::Buffer(buffer), buffer.as_raw());
    }

    fn destroy_image(&mut self, image: vk::Image) {
        self.destroy(Deferred::Image(image), image.as_raw());
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        self.destroy(Deferred::ImageView(view), view.as_raw());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroying_in_flight_work_is_flagged() {
        let mut device = TestDevice::new(2);
        device.submit(0, [1, 2]);
        device.destroy_buffer(vk::Buffer::from_raw(2));
        assert_eq!(device.violations(), &[Deferred::Buffer(vk::Buffer::from_raw(2))]);

        device.wait_for_slot(0, u64::MAX).unwrap();
        device.destroy_buffer(vk::Buffer::from_raw(1));
        assert_eq!(device.violations().len(), 1);
        assert_eq!(device.destroyed().len(), 2);
        assert_eq!(device.waits(), &[0]);
    }

    #[test]
    fn waiting_on_a_missing_slot_fails() {
        let mut device = TestDevice::new(1);
        assert!(device.wait_for_slot(3, 0).is_err());
    }
}
