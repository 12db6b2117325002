use std::collections::BTreeMap;

use anyhow::Result;
use ash::vk;
use tracing::trace;

use super::render_pass::RenderPassBegin;
use crate::config::SyncConfig;
use crate::descriptor::{self, DescriptorSet};
use crate::error::SyncError;
use crate::resource::{BufferHandle, ImageHandle, ImageRecord, ResourceTable};
use crate::scope::{BufferScope, ImageScope};
use crate::sync::{BarrierStats, BufferState, ImageState, Plan, ResourceUses};
use crate::traits::CommandStream;
use crate::util::format::{self, TexelBlock};

/// Largest payload `vkCmdUpdateBuffer` accepts
const MAX_UPDATE_SIZE: usize = 65536;
/// `VkDispatchIndirectCommand`
const DISPATCH_INDIRECT_SIZE: vk::DeviceSize = 12;
/// `VkDrawIndirectCommand`
const DRAW_INDIRECT_SIZE: vk::DeviceSize = 16;
/// `VkDrawIndexedIndirectCommand`
const DRAW_INDEXED_INDIRECT_SIZE: vk::DeviceSize = 20;

/// Resources bound at one bind point
#[derive(Debug, Default)]
struct Bindings {
    descriptor_sets: BTreeMap<u32, ResourceUses>,
    vertex_buffers: BTreeMap<u32, BufferHandle>,
    index_buffer: Option<BufferHandle>,
    /// States left by the last bind; a resource still in that state needs nothing more at the
    /// next draw or dispatch
    primed_buffers: Vec<(BufferHandle, BufferState)>,
    primed_images: Vec<(ImageHandle, ImageState)>,
}

impl Bindings {
    fn uses(&self) -> ResourceUses {
        let mut uses = ResourceUses::default();
        for set in self.descriptor_sets.values() {
            uses.extend(set);
        }
        for buffer in self.vertex_buffers.values() {
            uses.add_buffer(*buffer, BufferScope::VERTEX_BUFFER);
        }
        if let Some(buffer) = self.index_buffer {
            uses.add_buffer(buffer, BufferScope::INDEX_BUFFER);
        }
        uses
    }

    fn prime(&mut self, plan: &Plan) {
        for (handle, state) in plan.buffer_states() {
            self.primed_buffers.retain(|(primed, _)| primed != handle);
            self.primed_buffers.push((*handle, *state));
        }
        for (handle, state) in plan.image_states() {
            self.primed_images.retain(|(primed, _)| primed != handle);
            self.primed_images.push((*handle, *state));
        }
    }

    fn clear_primed(&mut self) {
        self.primed_buffers.clear();
        self.primed_images.clear();
    }
}

/// Records commands into a [`CommandStream`], inserting the barriers each one needs.
///
/// Every command follows the same steps: validate its arguments, derive the scope of every
/// resource it touches, plan the barriers against the tracked state, then insert them as one
/// batch, commit the new state and forward the command. Any `Err` is returned before the stream
/// or the tracked state is touched.
pub struct CommandRecorder<'a, S: CommandStream> {
    stream: S,
    table: &'a mut ResourceTable,
    config: &'a SyncConfig,
    in_render_pass: bool,
    graphics: Bindings,
    compute: Bindings,
    stats: BarrierStats,
}

impl<'a, S: CommandStream> CommandRecorder<'a, S> {
    pub fn new(stream: S, table: &'a mut ResourceTable, config: &'a SyncConfig) -> Self {
        Self {
            stream,
            table,
            config,
            in_render_pass: false,
            graphics: Bindings::default(),
            compute: Bindings::default(),
            stats: BarrierStats::default(),
        }
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn table(&self) -> &ResourceTable {
        &*self.table
    }

    pub fn stats(&self) -> BarrierStats {
        self.stats
    }

    pub fn in_render_pass(&self) -> bool {
        self.in_render_pass
    }

    /// Stops recording and hands the stream back
    pub fn finish(self) -> S {
        if self.in_render_pass {
            tracing::warn!("Finished recording inside an active render pass");
        }
        self.stream
    }

    fn outside_render_pass(&self) -> Result<(), SyncError> {
        if self.in_render_pass {
            return Err(SyncError::RenderPassActive);
        }
        Ok(())
    }

    fn inside_render_pass(&self) -> Result<(), SyncError> {
        if !self.in_render_pass {
            return Err(SyncError::NoRenderPass);
        }
        Ok(())
    }

    fn bindings(&self, bind_point: vk::PipelineBindPoint) -> &Bindings {
        if bind_point == vk::PipelineBindPoint::COMPUTE {
            &self.compute
        } else {
            &self.graphics
        }
    }

    fn bindings_mut(&mut self, bind_point: vk::PipelineBindPoint) -> &mut Bindings {
        if bind_point == vk::PipelineBindPoint::COMPUTE {
            &mut self.compute
        } else {
            &mut self.graphics
        }
    }

    /// Plans barriers for `uses` without touching anything
    fn plan(&self, uses: &ResourceUses) -> Result<Plan> {
        let plan = Plan::build(&*self.table, uses)?;
        if self.in_render_pass && !plan.batch().is_empty() {
            return Err(SyncError::BarrierInsideRenderPass.into());
        }
        Ok(plan)
    }

    /// Inserts the planned barriers and commits the planned states
    fn apply(&mut self, plan: &Plan) -> Result<()> {
        let batch = plan.batch();
        if !batch.is_empty() {
            self.stream.pipeline_barrier(batch);
            self.stats.record(batch);
            trace!(
                "Inserted {} buffer and {} image barriers",
                batch.buffer_barriers().len(),
                batch.image_barriers().len()
            );
            for barrier in batch.image_barriers() {
                trace!(
                    "VkImage {:?}: {:?} -> {:?}",
                    barrier.image,
                    barrier.old_layout,
                    barrier.new_layout
                );
            }
        }
        plan.commit(&mut *self.table)?;
        Ok(())
    }

    fn synchronize(&mut self, uses: &ResourceUses) -> Result<Plan> {
        let plan = self.plan(uses)?;
        self.apply(&plan)?;
        Ok(plan)
    }

    /// Plans everything bound at `bind_point` plus `extra`, skipping bound resources nothing has
    /// touched since their bind synchronized them
    fn plan_bound(&self, bind_point: vk::PipelineBindPoint, extra: &ResourceUses) -> Result<Plan> {
        let bindings = self.bindings(bind_point);
        let table = &*self.table;
        let mut uses = bindings.uses();
        uses.retain_buffers(|(handle, _)| {
            !bindings.primed_buffers.iter().any(|(primed, state)| {
                primed == handle
                    && table
                        .buffer(handle)
                        .is_ok_and(|record| record.state() == state)
            })
        });
        uses.retain_images(|(handle, _)| {
            !bindings.primed_images.iter().any(|(primed, state)| {
                primed == handle
                    && table
                        .image(handle)
                        .is_ok_and(|record| record.state() == state)
            })
        });
        uses.extend(extra);
        self.plan(&uses)
    }

    fn consume_bound(&mut self, bind_point: vk::PipelineBindPoint, extra: &ResourceUses) -> Result<()> {
        let plan = self.plan_bound(bind_point, extra)?;
        self.apply(&plan)?;
        self.bindings_mut(bind_point).clear_primed();
        Ok(())
    }

    fn image_layout(&self, plan: &Plan, image: &ImageHandle) -> Result<vk::ImageLayout> {
        match plan.image_layout(image) {
            Some(layout) => Ok(layout),
            None => Ok(self.table.image(image)?.state().layout()),
        }
    }

    /// Moves a buffer into `scope`, e.g. ahead of a render pass that reads it
    pub fn acquire_buffer(&mut self, buffer: BufferHandle, scope: BufferScope) -> Result<()> {
        let mut uses = ResourceUses::default();
        uses.add_buffer(buffer, scope);
        self.synchronize(&uses)?;
        trace!("Acquired buffer into {:?}", scope);
        Ok(())
    }

    pub fn acquire_image(&mut self, image: ImageHandle, scope: ImageScope) -> Result<()> {
        let mut uses = ResourceUses::default();
        uses.add_image(image, scope);
        self.synchronize(&uses)?;
        trace!("Acquired image into {:?}", scope);
        Ok(())
    }

    /// Returns a buffer to its baseline read-only scope
    pub fn release_buffer(&mut self, buffer: BufferHandle) -> Result<()> {
        let baseline = self
            .table
            .buffer(&buffer)?
            .baseline()
            .ok_or(SyncError::NoBaseline)?;
        self.acquire_buffer(buffer, baseline)
    }

    /// Returns an image to its baseline read-only scope
    pub fn release_image(&mut self, image: ImageHandle) -> Result<()> {
        let baseline = self
            .table
            .image(&image)?
            .baseline()
            .ok_or(SyncError::NoBaseline)?;
        self.acquire_image(image, baseline)
    }

    pub fn fill_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
        data: u32,
    ) -> Result<()> {
        self.outside_render_pass()?;
        let record = self.table.buffer(&buffer)?;
        let in_bounds = if size == vk::WHOLE_SIZE {
            offset < record.size()
        } else {
            size % 4 == 0 && record.check_range(offset, size).is_ok()
        };
        if offset % 4 != 0 || !in_bounds {
            return Err(SyncError::RegionOutOfBounds.into());
        }
        let raw = record.handle();

        let mut uses = ResourceUses::default();
        uses.add_buffer(buffer, BufferScope::TRANSFER_DST);
        self.synchronize(&uses)?;
        self.stream.fill_buffer(raw, offset, size, data);
        trace!("fill_buffer {:?} [{}, +{}) = {:#x}", raw, offset, size, data);
        Ok(())
    }

    pub fn update_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: vk::DeviceSize,
        data: &[u8],
    ) -> Result<()> {
        self.outside_render_pass()?;
        let record = self.table.buffer(&buffer)?;
        if data.is_empty()
            || data.len() > MAX_UPDATE_SIZE
            || data.len() % 4 != 0
            || offset % 4 != 0
        {
            return Err(SyncError::RegionOutOfBounds.into());
        }
        record.check_range(offset, data.len() as vk::DeviceSize)?;
        let raw = record.handle();

        let mut uses = ResourceUses::default();
        uses.add_buffer(buffer, BufferScope::TRANSFER_DST);
        self.synchronize(&uses)?;
        self.stream.update_buffer(raw, offset, data);
        trace!("update_buffer {:?} [{}, +{})", raw, offset, data.len());
        Ok(())
    }

    /// Copying within one buffer is allowed and acquires it for both reading and writing
    pub fn copy_buffer(
        &mut self,
        src: BufferHandle,
        dst: BufferHandle,
        regions: &[vk::BufferCopy],
    ) -> Result<()> {
        self.outside_render_pass()?;
        let src_record = self.table.buffer(&src)?;
        let dst_record = self.table.buffer(&dst)?;
        if regions.is_empty() {
            return Err(SyncError::RegionOutOfBounds.into());
        }
        for region in regions {
            src_record.check_range(region.src_offset, region.size)?;
            dst_record.check_range(region.dst_offset, region.size)?;
        }
        let (src_raw, dst_raw) = (src_record.handle(), dst_record.handle());

        let mut uses = ResourceUses::default();
        uses.add_buffer(src, BufferScope::TRANSFER_SRC)
            .add_buffer(dst, BufferScope::TRANSFER_DST);
        self.synchronize(&uses)?;
        self.stream.copy_buffer(src_raw, dst_raw, regions);
        trace!("copy_buffer {:?} -> {:?}", src_raw, dst_raw);
        Ok(())
    }

    /// Copying within one image puts it in `GENERAL` for both sides
    pub fn copy_image(
        &mut self,
        src: ImageHandle,
        dst: ImageHandle,
        regions: &[vk::ImageCopy],
    ) -> Result<()> {
        self.outside_render_pass()?;
        let src_record = self.table.image(&src)?;
        let dst_record = self.table.image(&dst)?;
        if regions.is_empty() {
            return Err(SyncError::RegionOutOfBounds.into());
        }
        for region in regions {
            src_record.check_region(&region.src_subresource, region.src_offset, region.extent)?;
            dst_record.check_region(&region.dst_subresource, region.dst_offset, region.extent)?;
        }
        let (src_raw, dst_raw) = (src_record.handle(), dst_record.handle());

        let mut uses = ResourceUses::default();
        uses.add_image(src, ImageScope::TRANSFER_SRC)
            .add_image(dst, ImageScope::TRANSFER_DST);
        let plan = self.synchronize(&uses)?;
        let src_layout = self.image_layout(&plan, &src)?;
        let dst_layout = self.image_layout(&plan, &dst)?;
        self.stream
            .copy_image(src_raw, src_layout, dst_raw, dst_layout, regions);
        trace!("copy_image {:?} -> {:?}", src_raw, dst_raw);
        Ok(())
    }

    pub fn copy_buffer_to_image(
        &mut self,
        src: BufferHandle,
        dst: ImageHandle,
        regions: &[vk::BufferImageCopy],
    ) -> Result<()> {
        self.outside_render_pass()?;
        let buffer = self.table.buffer(&src)?;
        let image = self.table.image(&dst)?;
        check_buffer_image_regions(buffer.size(), image, regions)?;
        let (src_raw, dst_raw) = (buffer.handle(), image.handle());

        let mut uses = ResourceUses::default();
        uses.add_buffer(src, BufferScope::TRANSFER_SRC)
            .add_image(dst, ImageScope::TRANSFER_DST);
        let plan = self.synchronize(&uses)?;
        let dst_layout = self.image_layout(&plan, &dst)?;
        self.stream
            .copy_buffer_to_image(src_raw, dst_raw, dst_layout, regions);
        trace!("copy_buffer_to_image {:?} -> {:?}", src_raw, dst_raw);
        Ok(())
    }

    pub fn copy_image_to_buffer(
        &mut self,
        src: ImageHandle,
        dst: BufferHandle,
        regions: &[vk::BufferImageCopy],
    ) -> Result<()> {
        self.outside_render_pass()?;
        let image = self.table.image(&src)?;
        let buffer = self.table.buffer(&dst)?;
        check_buffer_image_regions(buffer.size(), image, regions)?;
        let (src_raw, dst_raw) = (image.handle(), buffer.handle());

        let mut uses = ResourceUses::default();
        uses.add_image(src, ImageScope::TRANSFER_SRC)
            .add_buffer(dst, BufferScope::TRANSFER_DST);
        let plan = self.synchronize(&uses)?;
        let src_layout = self.image_layout(&plan, &src)?;
        self.stream
            .copy_image_to_buffer(src_raw, src_layout, dst_raw, regions);
        trace!("copy_image_to_buffer {:?} -> {:?}", src_raw, dst_raw);
        Ok(())
    }

    pub fn blit_image(
        &mut self,
        src: ImageHandle,
        dst: ImageHandle,
        regions: &[vk::ImageBlit],
        filter: vk::Filter,
    ) -> Result<()> {
        self.outside_render_pass()?;
        let src_record = self.table.image(&src)?;
        let dst_record = self.table.image(&dst)?;
        if regions.is_empty() {
            return Err(SyncError::RegionOutOfBounds.into());
        }
        for region in regions {
            src_record.check_corners(&region.src_subresource, &region.src_offsets)?;
            dst_record.check_corners(&region.dst_subresource, &region.dst_offsets)?;
        }
        let (src_raw, dst_raw) = (src_record.handle(), dst_record.handle());

        let mut uses = ResourceUses::default();
        uses.add_image(src, ImageScope::TRANSFER_SRC)
            .add_image(dst, ImageScope::TRANSFER_DST);
        let plan = self.synchronize(&uses)?;
        let src_layout = self.image_layout(&plan, &src)?;
        let dst_layout = self.image_layout(&plan, &dst)?;
        self.stream
            .blit_image(src_raw, src_layout, dst_raw, dst_layout, regions, filter);
        trace!("blit_image {:?} -> {:?}", src_raw, dst_raw);
        Ok(())
    }

    pub fn clear_color_image(
        &mut self,
        image: ImageHandle,
        color: &vk::ClearColorValue,
        ranges: &[vk::ImageSubresourceRange],
    ) -> Result<()> {
        self.outside_render_pass()?;
        let record = self.table.image(&image)?;
        if ranges.is_empty() {
            return Err(SyncError::RegionOutOfBounds.into());
        }
        for range in ranges {
            record.check_subresource_range(range)?;
        }
        let raw = record.handle();

        let mut uses = ResourceUses::default();
        uses.add_image(image, ImageScope::TRANSFER_DST);
        let plan = self.synchronize(&uses)?;
        let layout = self.image_layout(&plan, &image)?;
        self.stream.clear_color_image(raw, layout, color, ranges);
        trace!("clear_color_image {:?}", raw);
        Ok(())
    }

    pub fn bind_pipeline(&mut self, bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        self.stream.bind_pipeline(bind_point, pipeline);
    }

    /// Binds `sets` starting at `first_set`, synchronizing every resource they reference with a
    /// single batch ahead of the bind
    pub fn bind_descriptor_sets(
        &mut self,
        bind_point: vk::PipelineBindPoint,
        layout: vk::PipelineLayout,
        first_set: u32,
        sets: &[&DescriptorSet],
        dynamic_offsets: &[u32],
    ) -> Result<()> {
        let uses = descriptor::gather_uses(sets.iter().copied());
        let plan = self.synchronize(&uses)?;

        let bindings = self.bindings_mut(bind_point);
        for (index, set) in sets.iter().enumerate() {
            bindings
                .descriptor_sets
                .insert(first_set + index as u32, set.uses());
        }
        bindings.prime(&plan);

        let raw: Vec<vk::DescriptorSet> = sets.iter().map(|set| set.handle()).collect();
        self.stream
            .bind_descriptor_sets(bind_point, layout, first_set, &raw, dynamic_offsets);
        trace!("Bound {} descriptor sets at {:?}", sets.len(), bind_point);
        Ok(())
    }

    pub fn push_constants(
        &mut self,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        let limit = self.config.max_push_constant_size;
        let size = u32::try_from(data.len()).unwrap_or(u32::MAX);
        let fits = offset
            .checked_add(size)
            .is_some_and(|end| end <= limit);
        if size == 0 || size % 4 != 0 || offset % 4 != 0 || !fits {
            return Err(SyncError::PushConstantOverflow {
                offset,
                size,
                limit,
            }
            .into());
        }
        self.stream.push_constants(layout, stages, offset, data);
        Ok(())
    }

    pub fn bind_vertex_buffers(
        &mut self,
        first_binding: u32,
        buffers: &[BufferHandle],
        offsets: &[vk::DeviceSize],
    ) -> Result<()> {
        if buffers.len() != offsets.len() || buffers.is_empty() {
            return Err(SyncError::RegionOutOfBounds.into());
        }
        let mut raw = Vec::with_capacity(buffers.len());
        let mut uses = ResourceUses::default();
        for (buffer, offset) in buffers.iter().zip(offsets) {
            let record = self.table.buffer(buffer)?;
            if *offset >= record.size() {
                return Err(SyncError::RegionOutOfBounds.into());
            }
            raw.push(record.handle());
            uses.add_buffer(*buffer, BufferScope::VERTEX_BUFFER);
        }
        let plan = self.synchronize(&uses)?;

        let bindings = &mut self.graphics;
        for (index, buffer) in buffers.iter().enumerate() {
            bindings
                .vertex_buffers
                .insert(first_binding + index as u32, *buffer);
        }
        bindings.prime(&plan);
        self.stream.bind_vertex_buffers(first_binding, &raw, offsets);
        Ok(())
    }

    pub fn bind_index_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: vk::DeviceSize,
        index_type: vk::IndexType,
    ) -> Result<()> {
        let record = self.table.buffer(&buffer)?;
        if offset >= record.size() {
            return Err(SyncError::RegionOutOfBounds.into());
        }
        let raw = record.handle();

        let mut uses = ResourceUses::default();
        uses.add_buffer(buffer, BufferScope::INDEX_BUFFER);
        let plan = self.synchronize(&uses)?;
        self.graphics.index_buffer = Some(buffer);
        self.graphics.prime(&plan);
        self.stream.bind_index_buffer(raw, offset, index_type);
        Ok(())
    }

    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.outside_render_pass()?;
        self.consume_bound(vk::PipelineBindPoint::COMPUTE, &ResourceUses::default())?;
        self.stream.dispatch(x, y, z);
        trace!("dispatch ({}, {}, {})", x, y, z);
        Ok(())
    }

    pub fn dispatch_indirect(&mut self, buffer: BufferHandle, offset: vk::DeviceSize) -> Result<()> {
        self.outside_render_pass()?;
        let raw = self.indirect_buffer(&buffer, offset, 1, 0, DISPATCH_INDIRECT_SIZE)?;
        let mut extra = ResourceUses::default();
        extra.add_buffer(buffer, BufferScope::INDIRECT_COMMAND);
        self.consume_bound(vk::PipelineBindPoint::COMPUTE, &extra)?;
        self.stream.dispatch_indirect(raw, offset);
        trace!("dispatch_indirect {:?} +{}", raw, offset);
        Ok(())
    }

    pub fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<()> {
        self.inside_render_pass()?;
        self.consume_bound(vk::PipelineBindPoint::GRAPHICS, &ResourceUses::default())?;
        self.stream
            .draw(vertex_count, instance_count, first_vertex, first_instance);
        Ok(())
    }

    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()> {
        self.inside_render_pass()?;
        self.consume_bound(vk::PipelineBindPoint::GRAPHICS, &ResourceUses::default())?;
        self.stream.draw_indexed(
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        );
        Ok(())
    }

    pub fn draw_indirect(
        &mut self,
        buffer: BufferHandle,
        offset: vk::DeviceSize,
        draw_count: u32,
        stride: u32,
    ) -> Result<()> {
        self.inside_render_pass()?;
        let raw = self.indirect_buffer(&buffer, offset, draw_count, stride, DRAW_INDIRECT_SIZE)?;
        let mut extra = ResourceUses::default();
        extra.add_buffer(buffer, BufferScope::INDIRECT_COMMAND);
        self.consume_bound(vk::PipelineBindPoint::GRAPHICS, &extra)?;
        self.stream.draw_indirect(raw, offset, draw_count, stride);
        Ok(())
    }

    pub fn draw_indexed_indirect(
        &mut self,
        buffer: BufferHandle,
        offset: vk::DeviceSize,
        draw_count: u32,
        stride: u32,
    ) -> Result<()> {
        self.inside_render_pass()?;
        let raw = self.indirect_buffer(
            &buffer,
            offset,
            draw_count,
            stride,
            DRAW_INDEXED_INDIRECT_SIZE,
        )?;
        let mut extra = ResourceUses::default();
        extra.add_buffer(buffer, BufferScope::INDIRECT_COMMAND);
        self.consume_bound(vk::PipelineBindPoint::GRAPHICS, &extra)?;
        self.stream
            .draw_indexed_indirect(raw, offset, draw_count, stride);
        Ok(())
    }

    /// Validates the argument range of an indirect command and returns the raw buffer
    fn indirect_buffer(
        &self,
        buffer: &BufferHandle,
        offset: vk::DeviceSize,
        count: u32,
        stride: u32,
        command_size: vk::DeviceSize,
    ) -> Result<vk::Buffer, SyncError> {
        let record = self.table.buffer(buffer)?;
        if offset % 4 != 0 {
            return Err(SyncError::RegionOutOfBounds);
        }
        if count > 1 && (stride % 4 != 0 || (stride as vk::DeviceSize) < command_size) {
            return Err(SyncError::RegionOutOfBounds);
        }
        if count > 0 {
            let span = (count as vk::DeviceSize - 1) * stride as vk::DeviceSize + command_size;
            record.check_range(offset, span)?;
        }
        Ok(record.handle())
    }

    /// Acquires every attachment of the framebuffer per its load/store ops, along with any
    /// graphics binding touched since it was bound, then begins the render pass. No barrier can
    /// be inserted until [`Self::end_render_pass`].
    pub fn begin_render_pass(&mut self, begin: &RenderPassBegin) -> Result<()> {
        self.outside_render_pass()?;
        let mut uses = ResourceUses::default();
        for attachment in begin.framebuffer.attachments.iter() {
            let record = self.table.image(&attachment.image)?;
            uses.add_image(attachment.image, attachment.ops.scope(record.aspect()));
        }
        let plan = self.plan_bound(vk::PipelineBindPoint::GRAPHICS, &uses)?;
        self.apply(&plan)?;
        self.graphics.prime(&plan);
        self.stream.begin_render_pass(
            begin.render_pass,
            begin.framebuffer.handle,
            begin.render_area,
            &begin.clear_values,
        );
        self.in_render_pass = true;
        trace!(
            "Began render pass {:?} with {} attachments",
            begin.render_pass,
            begin.framebuffer.attachments.len()
        );
        Ok(())
    }

    pub fn end_render_pass(&mut self) -> Result<()> {
        self.inside_render_pass()?;
        self.stream.end_render_pass();
        self.in_render_pass = false;
        Ok(())
    }

    /// Transitions a swapchain image for presentation
    pub fn prepare_present(&mut self, image: ImageHandle) -> Result<()> {
        self.outside_render_pass()?;
        let mut uses = ResourceUses::default();
        uses.add_image(image, ImageScope::PRESENT);
        self.synchronize(&uses)?;
        Ok(())
    }
}

/// Bounds of buffer/image copy regions in both directions
fn check_buffer_image_regions(
    buffer_size: vk::DeviceSize,
    image: &ImageRecord,
    regions: &[vk::BufferImageCopy],
) -> Result<(), SyncError> {
    if regions.is_empty() {
        return Err(SyncError::RegionOutOfBounds);
    }
    for region in regions {
        image.check_region(
            &region.image_subresource,
            region.image_offset,
            region.image_extent,
        )?;
        let aspect = region.image_subresource.aspect_mask;
        let block = format::texel_block(image.format(), aspect).ok_or(SyncError::UnsizedFormat {
            format: image.format(),
            aspect,
        })?;
        // compressed regions start on a block boundary
        if region.image_offset.x as u32 % block.width != 0
            || region.image_offset.y as u32 % block.height != 0
        {
            return Err(SyncError::RegionOutOfBounds);
        }
        let footprint = buffer_footprint(region, block).ok_or(SyncError::RegionOutOfBounds)?;
        match region.buffer_offset.checked_add(footprint) {
            Some(end) if end <= buffer_size => {}
            _ => return Err(SyncError::RegionOutOfBounds),
        }
    }
    Ok(())
}

/// Bytes a buffer/image copy region spans in the buffer, `None` on overflow
fn buffer_footprint(region: &vk::BufferImageCopy, block: TexelBlock) -> Option<vk::DeviceSize> {
    let extent = region.image_extent;
    let blocks = |texels: u32, per_block: u32| (texels as u64).div_ceil(per_block as u64);
    let row_pitch = blocks(region.buffer_row_length.max(extent.width), block.width);
    let slice_rows = blocks(region.buffer_image_height.max(extent.height), block.height);
    let slices = (extent.depth as u64).checked_mul(region.image_subresource.layer_count as u64)?;
    let last_slice = slices
        .checked_sub(1)?
        .checked_mul(slice_rows)?
        .checked_mul(row_pitch)?;
    let last_row = blocks(extent.height, block.height)
        .checked_sub(1)?
        .checked_mul(row_pitch)?;
    last_slice
        .checked_add(last_row)?
        .checked_add(blocks(extent.width, block.width))?
        .checked_mul(block.size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footprint_respects_row_pitch() {
        let region = vk::BufferImageCopy {
            buffer_offset: 0,
            buffer_row_length: 8,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            },
            image_offset: vk::Offset3D::default(),
            image_extent: vk::Extent3D {
                width: 4,
                height: 2,
                depth: 1,
            },
        };
        // one full padded row plus the last row
        let rgba8 = format::texel_block(vk::Format::R8G8B8A8_UNORM, vk::ImageAspectFlags::COLOR);
        assert_eq!(rgba8.and_then(|block| buffer_footprint(&region, block)), Some((8 + 4) * 4));
    }

    #[test]
    fn footprint_counts_compressed_blocks() {
        let region = vk::BufferImageCopy {
            buffer_offset: 0,
            buffer_row_length: 0,
            buffer_image_height: 0,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 2,
            },
            image_offset: vk::Offset3D::default(),
            image_extent: vk::Extent3D {
                width: 10,
                height: 6,
                depth: 1,
            },
        };
        // 3x2 blocks per layer, partial blocks rounded up
        let bc1 = format::texel_block(vk::Format::BC1_RGB_UNORM_BLOCK, vk::ImageAspectFlags::COLOR);
        assert_eq!(bc1.and_then(|block| buffer_footprint(&region, block)), Some(2 * 3 * 2 * 8));
    }

    #[test]
    fn footprint_overflow_is_none() {
        let region = vk::BufferImageCopy {
            buffer_offset: 0,
            buffer_row_length: u32::MAX,
            buffer_image_height: u32::MAX,
            image_subresource: vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: u32::MAX,
            },
            image_offset: vk::Offset3D::default(),
            image_extent: vk::Extent3D {
                width: 4,
                height: 4,
                depth: 2,
            },
        };
        assert_eq!(buffer_footprint(&region, TexelBlock { width: 1, height: 1, size: 16 }), None);
    }
}
