use ash::vk;

use crate::scope::Access;

/// Execution and memory dependency between two accesses
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct MemoryBarrier {
    pub src_stage_mask: vk::PipelineStageFlags2,
    pub src_access_mask: vk::AccessFlags2,
    pub dst_stage_mask: vk::PipelineStageFlags2,
    pub dst_access_mask: vk::AccessFlags2,
}

impl MemoryBarrier {
    /// A source without stages waits on nothing, which is expressed as `TOP_OF_PIPE`
    pub fn new(src: Access, dst: Access) -> Self {
        let src_stage_mask = if src.stage_mask.is_empty() {
            vk::PipelineStageFlags2::TOP_OF_PIPE
        } else {
            src.stage_mask
        };
        Self {
            src_stage_mask,
            src_access_mask: src.access_mask,
            dst_stage_mask: dst.stage_mask,
            dst_access_mask: dst.access_mask,
        }
    }

    fn merge(&mut self, other: &Self) {
        self.src_stage_mask |= other.src_stage_mask;
        self.src_access_mask |= other.src_access_mask;
        self.dst_stage_mask |= other.dst_stage_mask;
        self.dst_access_mask |= other.dst_access_mask;
    }
}

/// Aspect and mip/array range an image barrier applies to
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct SubresourceRange {
    pub aspect_mask: vk::ImageAspectFlags,
    pub base_mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

impl SubresourceRange {
    /// Every mip level and array layer of an image
    pub fn whole(aspect_mask: vk::ImageAspectFlags) -> Self {
        Self {
            aspect_mask,
            base_mip_level: 0,
            level_count: vk::REMAINING_MIP_LEVELS,
            base_array_layer: 0,
            layer_count: vk::REMAINING_ARRAY_LAYERS,
        }
    }

    pub fn to_vk(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect_mask,
            base_mip_level: self.base_mip_level,
            level_count: self.level_count,
            base_array_layer: self.base_array_layer,
            layer_count: self.layer_count,
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct BufferBarrier {
    pub barrier: MemoryBarrier,
    pub buffer: vk::Buffer,
    pub offset: vk::DeviceSize,
    pub size: vk::DeviceSize,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct ImageBarrier {
    pub barrier: MemoryBarrier,
    pub image: vk::Image,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub range: SubresourceRange,
}

/// Every barrier required ahead of a single command, inserted with one call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BarrierBatch {
    buffer_barriers: Vec<BufferBarrier>,
    image_barriers: Vec<ImageBarrier>,
}

impl BarrierBatch {
    /// Adds a buffer barrier, folding it into an existing barrier on the same buffer
    pub fn push_buffer(&mut self, barrier: BufferBarrier) {
        match self
            .buffer_barriers
            .iter_mut()
            .find(|existing| existing.buffer == barrier.buffer)
        {
            Some(existing) => {
                existing.barrier.merge(&barrier.barrier);
                existing.offset = 0;
                existing.size = vk::WHOLE_SIZE;
            }
            None => self.buffer_barriers.push(barrier),
        }
    }

    /// Adds an image barrier. A second barrier on the same image keeps the first old layout and
    /// takes the latest new layout.
    pub fn push_image(&mut self, barrier: ImageBarrier) {
        match self
            .image_barriers
            .iter_mut()
            .find(|existing| existing.image == barrier.image)
        {
            Some(existing) => {
                existing.barrier.merge(&barrier.barrier);
                existing.new_layout = barrier.new_layout;
            }
            None => self.image_barriers.push(barrier),
        }
    }

    pub fn buffer_barriers(&self) -> &[BufferBarrier] {
        &self.buffer_barriers
    }

    pub fn image_barriers(&self) -> &[ImageBarrier] {
        &self.image_barriers
    }

    pub fn is_empty(&self) -> bool {
        self.buffer_barriers.is_empty() && self.image_barriers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buffer_barriers.len() + self.image_barriers.len()
    }

    pub fn vk_buffer_barriers(&self) -> Vec<vk::BufferMemoryBarrier2<'static>> {
        self.buffer_barriers
            .iter()
            .map(|barrier| {
                vk::BufferMemoryBarrier2::default()
                    .src_stage_mask(barrier.barrier.src_stage_mask)
                    .src_access_mask(barrier.barrier.src_access_mask)
                    .dst_stage_mask(barrier.barrier.dst_stage_mask)
                    .dst_access_mask(barrier.barrier.dst_access_mask)
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .buffer(barrier.buffer)
                    .offset(barrier.offset)
                    .size(barrier.size)
            })
            .collect()
    }

    pub fn vk_image_barriers(&self) -> Vec<vk::ImageMemoryBarrier2<'static>> {
        self.image_barriers
            .iter()
            .map(|barrier| {
                vk::ImageMemoryBarrier2::default()
                    .src_stage_mask(barrier.barrier.src_stage_mask)
                    .src_access_mask(barrier.barrier.src_access_mask)
                    .dst_stage_mask(barrier.barrier.dst_stage_mask)
                    .dst_access_mask(barrier.barrier.dst_access_mask)
                    .old_layout(barrier.old_layout)
                    .new_layout(barrier.new_layout)
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(barrier.image)
                    .subresource_range(barrier.range.to_vk())
            })
            .collect()
    }
}

/// Running totals of what a recorder inserted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BarrierStats {
    /// Number of `pipeline_barrier` calls
    pub batches: u64,
    pub buffer_barriers: u64,
    pub image_barriers: u64,
}

impl BarrierStats {
    pub(crate) fn record(&mut self, batch: &BarrierBatch) {
        self.batches += 1;
        self.buffer_barriers += batch.buffer_barriers.len() as u64;
        self.image_barriers += batch.image_barriers.len() as u64;
    }

    pub fn barriers(&self) -> u64 {
        self.buffer_barriers + self.image_barriers
    }
}
