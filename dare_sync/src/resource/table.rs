use dare_containers::slot_map::SlotMap;
#[cfg(feature = "log-lifetimes")]
use tracing::trace;

use super::buffer::{BufferDesc, BufferHandle, BufferRecord};
use super::image::{ImageDesc, ImageHandle, ImageRecord};
use crate::error::SyncError;

/// Arena of every live tracked resource, addressed by generation checked handles
#[derive(Debug, Default)]
pub struct ResourceTable {
    buffers: SlotMap<BufferRecord>,
    images: SlotMap<ImageRecord>,
}

impl ResourceTable {
    pub fn register_buffer(&mut self, desc: BufferDesc) -> Result<BufferHandle, SyncError> {
        let record = BufferRecord::new(desc)?;
        #[cfg(feature = "log-lifetimes")]
        trace!(
            "Tracking VkBuffer {:?} ({})",
            record.handle(),
            record.name().unwrap_or("unnamed")
        );
        Ok(self.buffers.insert(record))
    }

    pub fn register_image(&mut self, desc: ImageDesc) -> Result<ImageHandle, SyncError> {
        let record = ImageRecord::new(desc)?;
        #[cfg(feature = "log-lifetimes")]
        trace!(
            "Tracking VkImage {:?} ({})",
            record.handle(),
            record.name().unwrap_or("unnamed")
        );
        Ok(self.images.insert(record))
    }

    pub fn buffer(&self, handle: &BufferHandle) -> Result<&BufferRecord, SyncError> {
        self.buffers.get(handle).map_err(|_| SyncError::StaleHandle)
    }

    pub fn buffer_mut(&mut self, handle: &BufferHandle) -> Result<&mut BufferRecord, SyncError> {
        self.buffers
            .get_mut(handle)
            .map_err(|_| SyncError::StaleHandle)
    }

    pub fn image(&self, handle: &ImageHandle) -> Result<&ImageRecord, SyncError> {
        self.images.get(handle).map_err(|_| SyncError::StaleHandle)
    }

    pub fn image_mut(&mut self, handle: &ImageHandle) -> Result<&mut ImageRecord, SyncError> {
        self.images.get_mut(handle).map_err(|_| SyncError::StaleHandle)
    }

    pub(crate) fn remove_buffer(&mut self, handle: BufferHandle) -> Result<BufferRecord, SyncError> {
        let record = self
            .buffers
            .remove(handle)
            .map_err(|_| SyncError::StaleHandle)?;
        #[cfg(feature = "log-lifetimes")]
        trace!("Untracking VkBuffer {:?}", record.handle());
        Ok(record)
    }

    pub(crate) fn remove_image(&mut self, handle: ImageHandle) -> Result<ImageRecord, SyncError> {
        let record = self
            .images
            .remove(handle)
            .map_err(|_| SyncError::StaleHandle)?;
        #[cfg(feature = "log-lifetimes")]
        trace!("Untracking VkImage {:?}", record.handle());
        Ok(record)
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn buffers(&self) -> impl Iterator<Item = (BufferHandle, &BufferRecord)> {
        self.buffers.iter()
    }

    pub fn images(&self) -> impl Iterator<Item = (ImageHandle, &ImageRecord)> {
        self.images.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk;
    use ash::vk::Handle;

    #[test]
    fn stale_handles_fail_fast() {
        let mut table = ResourceTable::default();
        let handle = table
            .register_buffer(BufferDesc::new(
                vk::Buffer::from_raw(1),
                64,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
            ))
            .unwrap();
        assert_eq!(table.buffer(&handle).unwrap().size(), 64);
        table.remove_buffer(handle).unwrap();
        assert_eq!(table.buffer(&handle).err(), Some(SyncError::StaleHandle));
        assert_eq!(table.remove_buffer(handle).err(), Some(SyncError::StaleHandle));

        // reused slot does not revive the old handle
        let reused = table
            .register_buffer(BufferDesc::new(
                vk::Buffer::from_raw(2),
                32,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
            ))
            .unwrap();
        assert_eq!(reused.id(), handle.id());
        assert!(table.buffer(&handle).is_err());
        assert_eq!(table.buffer_count(), 1);
    }

    #[test]
    fn images_and_buffers_are_separate() {
        let mut table = ResourceTable::default();
        let image = table
            .register_image(ImageDesc::new_2d(
                vk::Image::from_raw(1),
                vk::Format::D32_SFLOAT,
                8,
                8,
                vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            ))
            .unwrap();
        assert_eq!(table.image_count(), 1);
        assert_eq!(table.buffer_count(), 0);
        assert_eq!(
            table.image(&image).unwrap().aspect(),
            vk::ImageAspectFlags::DEPTH
        );
        assert_eq!(table.images().count(), 1);
        assert_eq!(table.buffers().count(), 0);
    }
}
