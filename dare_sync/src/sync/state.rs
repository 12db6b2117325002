use ash::vk;

use super::memory_barrier::MemoryBarrier;
use crate::scope::Access;

/// Hazard tracking shared by buffers and images.
///
/// `last` holds every access since the last write or barrier, `write` the most recent write and
/// `visible` the accesses that write has already been made visible to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
struct Tracker {
    last: Access,
    write: Access,
    visible: Access,
}

impl Tracker {
    /// Moves the tracker to `need`, returning the barrier that has to precede it
    fn transition(&mut self, need: Access, layout_change: bool) -> Option<MemoryBarrier> {
        let write_hazard = need.is_write() && !self.last.is_empty();
        let read_after_write =
            !need.is_write() && !self.write.is_empty() && !self.visible.covers(&need);

        let barrier = if layout_change || write_hazard {
            Some(MemoryBarrier::new(self.last, need))
        } else if read_after_write {
            Some(MemoryBarrier::new(self.write, need))
        } else {
            None
        };

        if need.is_write() {
            self.last = need;
            self.write = need;
            self.visible = Access::NONE;
        } else if layout_change {
            // later reads at other stages still have to wait on the transition itself
            self.last = need;
            self.write = Access::new(need.stage_mask, vk::AccessFlags2::NONE);
            self.visible = need;
        } else if barrier.is_some() {
            self.last = if self.last.is_write() {
                need
            } else {
                self.last.union(need)
            };
            self.visible = self.visible.union(need);
        } else {
            self.last = self.last.union(need);
        }
        barrier
    }
}

/// Last known synchronization state of a buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BufferState {
    tracker: Tracker,
}

impl BufferState {
    pub fn stage_mask(&self) -> vk::PipelineStageFlags2 {
        self.tracker.last.stage_mask
    }

    pub fn access_mask(&self) -> vk::AccessFlags2 {
        self.tracker.last.access_mask
    }

    /// Returns the barrier required before accessing the buffer with `need`, if any
    pub fn transition(&mut self, need: Access) -> Option<MemoryBarrier> {
        self.tracker.transition(need, false)
    }
}

/// An image's layout change alongside the memory dependency guarding it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutTransition {
    pub barrier: MemoryBarrier,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
}

/// Last known synchronization state of an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageState {
    tracker: Tracker,
    layout: vk::ImageLayout,
}

impl Default for ImageState {
    fn default() -> Self {
        Self {
            tracker: Tracker::default(),
            layout: vk::ImageLayout::UNDEFINED,
        }
    }
}

impl ImageState {
    pub fn stage_mask(&self) -> vk::PipelineStageFlags2 {
        self.tracker.last.stage_mask
    }

    pub fn access_mask(&self) -> vk::AccessFlags2 {
        self.tracker.last.access_mask
    }

    pub fn layout(&self) -> vk::ImageLayout {
        self.layout
    }

    /// Returns the barrier required before accessing the image with `need` in `layout`.
    ///
    /// An untouched image is in `UNDEFINED`, so its first use always yields a transition.
    pub fn transition(
        &mut self,
        need: Access,
        layout: vk::ImageLayout,
    ) -> Option<LayoutTransition> {
        let old_layout = self.layout;
        let barrier = self.tracker.transition(need, old_layout != layout)?;
        self.layout = layout;
        Some(LayoutTransition {
            barrier,
            old_layout,
            new_layout: layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn access(stage: vk::PipelineStageFlags2, access: vk::AccessFlags2) -> Access {
        Access::new(stage, access)
    }

    fn transfer_write() -> Access {
        access(
            vk::PipelineStageFlags2::TRANSFER,
            vk::AccessFlags2::TRANSFER_WRITE,
        )
    }

    fn fragment_read() -> Access {
        access(
            vk::PipelineStageFlags2::FRAGMENT_SHADER,
            vk::AccessFlags2::SHADER_READ,
        )
    }

    fn vertex_read() -> Access {
        access(
            vk::PipelineStageFlags2::VERTEX_SHADER,
            vk::AccessFlags2::SHADER_READ,
        )
    }

    #[test]
    fn first_buffer_use_needs_nothing() {
        let mut state = BufferState::default();
        assert_eq!(state.transition(transfer_write()), None);
        assert_eq!(state.access_mask(), vk::AccessFlags2::TRANSFER_WRITE);
    }

    #[test]
    fn read_after_write() {
        let mut state = BufferState::default();
        state.transition(transfer_write());
        let barrier = state.transition(fragment_read()).unwrap();
        assert_eq!(barrier.src_stage_mask, vk::PipelineStageFlags2::TRANSFER);
        assert_eq!(barrier.src_access_mask, vk::AccessFlags2::TRANSFER_WRITE);
        assert_eq!(barrier.dst_access_mask, vk::AccessFlags2::SHADER_READ);
        // already visible
        assert_eq!(state.transition(fragment_read()), None);
        // a new stage has not seen the write yet
        let barrier = state.transition(vertex_read()).unwrap();
        assert_eq!(barrier.src_stage_mask, vk::PipelineStageFlags2::TRANSFER);
        assert_eq!(barrier.dst_stage_mask, vk::PipelineStageFlags2::VERTEX_SHADER);
    }

    #[test]
    fn write_after_reads_waits_for_every_reader() {
        let mut state = BufferState::default();
        assert_eq!(state.transition(fragment_read()), None);
        assert_eq!(state.transition(vertex_read()), None);
        let barrier = state.transition(transfer_write()).unwrap();
        assert_eq!(
            barrier.src_stage_mask,
            vk::PipelineStageFlags2::FRAGMENT_SHADER | vk::PipelineStageFlags2::VERTEX_SHADER
        );
        assert_eq!(barrier.dst_access_mask, vk::AccessFlags2::TRANSFER_WRITE);
    }

    #[test]
    fn write_after_write_repeats() {
        let mut state = BufferState::default();
        state.transition(transfer_write());
        assert!(state.transition(transfer_write()).is_some());
        assert!(state.transition(transfer_write()).is_some());
    }

    #[test]
    fn image_init_then_sample() {
        let mut state = ImageState::default();
        let init = state
            .transition(transfer_write(), vk::ImageLayout::TRANSFER_DST_OPTIMAL)
            .unwrap();
        assert_eq!(init.old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(init.barrier.src_stage_mask, vk::PipelineStageFlags2::TOP_OF_PIPE);
        assert_eq!(init.barrier.src_access_mask, vk::AccessFlags2::NONE);

        let sample = state
            .transition(fragment_read(), vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .unwrap();
        assert_eq!(sample.old_layout, vk::ImageLayout::TRANSFER_DST_OPTIMAL);
        assert_eq!(sample.barrier.src_access_mask, vk::AccessFlags2::TRANSFER_WRITE);
        assert_eq!(state.layout(), vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);

        assert_eq!(
            state.transition(fragment_read(), vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
            None
        );
        // another stage only waits on the layout transition
        let vertex = state
            .transition(vertex_read(), vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .unwrap();
        assert_eq!(vertex.barrier.src_stage_mask, vk::PipelineStageFlags2::FRAGMENT_SHADER);
        assert_eq!(vertex.barrier.src_access_mask, vk::AccessFlags2::NONE);
        assert_eq!(vertex.old_layout, vertex.new_layout);
    }

    #[test]
    fn first_read_only_image_use_still_transitions() {
        let mut state = ImageState::default();
        let init = state
            .transition(fragment_read(), vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
            .unwrap();
        assert_eq!(init.old_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(init.new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    }
}
