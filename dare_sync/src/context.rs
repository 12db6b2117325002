use anyhow::Result;
use ash::vk;
use dare_containers::ring::SlotRing;
use tracing::debug;
#[cfg(feature = "log-lifetimes")]
use tracing::trace;

use crate::command::CommandRecorder;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::resource::{BufferDesc, BufferHandle, ImageDesc, ImageHandle, ResourceTable};
use crate::sync::{BufferState, ImageState};
use crate::traits::{CommandStream, FrameDevice};

/// A GPU object whose destruction waits for its slot to come around again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Deferred {
    Buffer(vk::Buffer),
    Image(vk::Image),
    ImageView(vk::ImageView),
}

impl Deferred {
    fn destroy<D: FrameDevice>(self, device: &mut D) {
        #[cfg(feature = "log-lifetimes")]
        trace!("Destroying deferred {:?}", self);
        match self {
            Deferred::Buffer(buffer) => device.destroy_buffer(buffer),
            Deferred::Image(image) => device.destroy_image(image),
            Deferred::ImageView(view) => device.destroy_image_view(view),
        }
    }
}

/// Owns the tracked state of every resource along with the ring of frame slots.
///
/// One recorder at a time borrows the table mutably, which rules out two recorders
/// racing on the same resource state.
pub struct SyncContext<D: FrameDevice> {
    device: D,
    config: SyncConfig,
    table: ResourceTable,
    frames: SlotRing<Deferred>,
}

impl<D: FrameDevice> SyncContext<D> {
    pub fn new(device: D, config: SyncConfig) -> Result<Self> {
        config.validate()?;
        let frames = SlotRing::new(config.frames_in_flight, config.deferred_queue_capacity);
        Ok(Self {
            device,
            config,
            table: ResourceTable::default(),
            frames,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn table(&self) -> &ResourceTable {
        &self.table
    }

    /// Slot commands are currently being recorded for
    pub fn current_slot(&self) -> usize {
        self.frames.current()
    }

    /// Destructions queued by `slot` that have not been carried out yet
    pub fn pending_destructions(&self, slot: usize) -> usize {
        self.frames.pending(slot)
    }

    pub fn register_buffer(&mut self, desc: BufferDesc) -> Result<BufferHandle> {
        Ok(self.table.register_buffer(desc)?)
    }

    pub fn register_image(&mut self, desc: ImageDesc) -> Result<ImageHandle> {
        Ok(self.table.register_image(desc)?)
    }

    pub fn buffer_state(&self, buffer: &BufferHandle) -> Result<BufferState> {
        Ok(*self.table.buffer(buffer)?.state())
    }

    pub fn image_state(&self, image: &ImageHandle) -> Result<ImageState> {
        Ok(*self.table.image(image)?.state())
    }

    /// Invalidates `buffer` now and destroys the underlying `VkBuffer` once the current slot
    /// has completed on the GPU
    pub fn destroy_buffer(&mut self, buffer: BufferHandle) -> Result<()> {
        let raw = self.table.buffer(&buffer)?.handle();
        self.frames
            .push(Deferred::Buffer(raw))
            .map_err(SyncError::from)?;
        self.table.remove_buffer(buffer)?;
        Ok(())
    }

    /// Invalidates `image` now and destroys the underlying `VkImage` once the current slot
    /// has completed on the GPU
    pub fn destroy_image(&mut self, image: ImageHandle) -> Result<()> {
        let raw = self.table.image(&image)?.handle();
        self.frames
            .push(Deferred::Image(raw))
            .map_err(SyncError::from)?;
        self.table.remove_image(image)?;
        Ok(())
    }

    /// Views are not tracked, only their destruction is deferred
    pub fn destroy_image_view(&mut self, view: vk::ImageView) -> Result<()> {
        self.frames
            .push(Deferred::ImageView(view))
            .map_err(SyncError::from)?;
        Ok(())
    }

    /// Moves on to the next slot.
    ///
    /// Blocks until the device reports that slot's previous frame complete, then destroys
    /// everything that frame queued. Returns the slot now being recorded.
    pub fn begin_frame(&mut self) -> Result<usize> {
        let next = self.frames.next_index();
        self.device
            .wait_for_slot(next, self.config.fence_timeout_ns)?;
        let deferred = self.frames.advance();
        if !deferred.is_empty() {
            debug!(
                "Slot {} reacquired, destroying {} deferred objects",
                next,
                deferred.len()
            );
        }
        for object in deferred {
            object.destroy(&mut self.device);
        }
        Ok(next)
    }

    /// Starts recording into `stream` against this context's tracked state
    pub fn recorder<S: CommandStream>(&mut self, stream: S) -> CommandRecorder<'_, S> {
        CommandRecorder::new(stream, &mut self.table, &self.config)
    }

    /// Waits for every slot and destroys everything still queued
    pub fn shutdown(&mut self) -> Result<()> {
        for slot in 0..self.frames.slot_count() {
            self.device
                .wait_for_slot(slot, self.config.fence_timeout_ns)?;
        }
        let deferred = self.frames.drain_all();
        debug!("Shutting down, destroying {} deferred objects", deferred.len());
        for object in deferred {
            object.destroy(&mut self.device);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::tests::TestDevice;
    use ash::vk::Handle;

    fn context(frames: usize, capacity: usize) -> SyncContext<TestDevice> {
        let config = SyncConfig::default()
            .frames_in_flight(frames)
            .deferred_queue_capacity(capacity);
        SyncContext::new(TestDevice::new(frames), config).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SyncConfig::default().frames_in_flight(0);
        let err = SyncContext::new(TestDevice::new(1), config).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::InvalidConfig(_))
        ));
    }

    #[test]
    fn destroyed_handle_is_stale_immediately() {
        let mut context = context(2, 4);
        let buffer = context
            .register_buffer(BufferDesc::new(
                vk::Buffer::from_raw(1),
                64,
                vk::BufferUsageFlags::TRANSFER_DST,
            ))
            .unwrap();
        context.destroy_buffer(buffer).unwrap();
        assert_eq!(context.pending_destructions(0), 1);

        let err = context.buffer_state(&buffer).err().unwrap();
        assert_eq!(err.downcast_ref::<SyncError>(), Some(&SyncError::StaleHandle));
        let err = context.destroy_buffer(buffer).err().unwrap();
        assert_eq!(err.downcast_ref::<SyncError>(), Some(&SyncError::StaleHandle));
        assert_eq!(context.pending_destructions(0), 1);
    }

    #[test]
    fn full_queue_keeps_handle_alive() {
        let mut context = context(2, 1);
        context
            .destroy_image_view(vk::ImageView::from_raw(7))
            .unwrap();
        let buffer = context
            .register_buffer(BufferDesc::new(
                vk::Buffer::from_raw(1),
                64,
                vk::BufferUsageFlags::TRANSFER_DST,
            ))
            .unwrap();
        let err = context.destroy_buffer(buffer).err().unwrap();
        assert_eq!(
            err.downcast_ref::<SyncError>(),
            Some(&SyncError::Container(
                dare_containers::error::ContainerErrors::QueueFull(1)
            ))
        );
        assert!(context.buffer_state(&buffer).is_ok());
    }

    #[test]
    fn shutdown_destroys_everything() {
        let mut context = context(3, 8);
        context
            .destroy_image_view(vk::ImageView::from_raw(1))
            .unwrap();
        context.begin_frame().unwrap();
        context
            .destroy_image_view(vk::ImageView::from_raw(2))
            .unwrap();
        context.shutdown().unwrap();
        assert_eq!(context.device().destroyed().len(), 2);
        assert_eq!(context.pending_destructions(0), 0);
        assert_eq!(context.pending_destructions(1), 0);
    }
}
