use ash::vk;

use super::memory_barrier::{BarrierBatch, BufferBarrier, ImageBarrier};
use super::state::{BufferState, ImageState};
use super::uses::ResourceUses;
use crate::error::SyncError;
use crate::resource::{BufferHandle, ImageHandle, ResourceTable};

/// Barriers and post-command states for one command, computed without touching the table.
///
/// Building a plan validates every use; nothing is mutated until [`Plan::commit`], so a
/// rejected command leaves both the stream and the tracked state untouched.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    batch: BarrierBatch,
    buffers: Vec<(BufferHandle, BufferState)>,
    images: Vec<(ImageHandle, ImageState)>,
}

impl Plan {
    pub fn build(table: &ResourceTable, uses: &ResourceUses) -> Result<Self, SyncError> {
        let mut plan = Plan::default();
        for (handle, scope) in uses.buffers() {
            let record = table.buffer(handle)?;
            scope.validate_usage(record.usage())?;
            let need = scope.access()?;

            let mut state = *record.state();
            if let Some(barrier) = state.transition(need) {
                plan.batch.push_buffer(BufferBarrier {
                    barrier,
                    buffer: record.handle(),
                    offset: 0,
                    size: vk::WHOLE_SIZE,
                });
            }
            plan.buffers.push((*handle, state));
        }
        for (handle, scope) in uses.images() {
            let record = table.image(handle)?;
            scope.validate_usage(record.usage())?;
            let need = scope.access()?;

            let mut state = *record.state();
            if let Some(transition) = state.transition(need.access, need.layout) {
                plan.batch.push_image(ImageBarrier {
                    barrier: transition.barrier,
                    image: record.handle(),
                    old_layout: transition.old_layout,
                    new_layout: transition.new_layout,
                    range: record.whole_range(),
                });
            }
            plan.images.push((*handle, state));
        }
        Ok(plan)
    }

    pub fn batch(&self) -> &BarrierBatch {
        &self.batch
    }

    pub fn buffer_states(&self) -> &[(BufferHandle, BufferState)] {
        &self.buffers
    }

    pub fn image_states(&self) -> &[(ImageHandle, ImageState)] {
        &self.images
    }

    /// Layout `image` will be in once the plan is committed
    pub fn image_layout(&self, image: &ImageHandle) -> Option<vk::ImageLayout> {
        self.images
            .iter()
            .find(|(handle, _)| handle == image)
            .map(|(_, state)| state.layout())
    }

    /// Writes the planned states back into the table
    pub(crate) fn commit(&self, table: &mut ResourceTable) -> Result<(), SyncError> {
        for (handle, state) in self.buffers.iter() {
            table.buffer_mut(handle)?.state = *state;
        }
        for (handle, state) in self.images.iter() {
            table.image_mut(handle)?.state = *state;
        }
        Ok(())
    }
}
