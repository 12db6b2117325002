use anyhow::Result;
use ash::vk;
#[cfg(feature = "log-lifetimes")]
use tracing::trace;

use crate::traits::FrameDevice;

/// [`FrameDevice`] over an `ash` device with one fence per ring slot.
///
/// Whoever submits the work for a slot signals [`AshFrameDevice::fence`] for it; fences start
/// signalled so the first turn of every slot does not block.
pub struct AshFrameDevice {
    device: ash::Device,
    fences: Vec<vk::Fence>,
}

impl AshFrameDevice {
    pub fn new(device: ash::Device, slot_count: usize) -> Result<Self> {
        let mut fences = Vec::with_capacity(slot_count);
        for _ in 0..slot_count {
            let fence = unsafe {
                device.create_fence(
                    &vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED),
                    None,
                )
            };
            match fence {
                Ok(fence) => {
                    #[cfg(feature = "log-lifetimes")]
                    trace!("Creating VkFence {:?}", fence);
                    fences.push(fence);
                }
                Err(err) => {
                    for fence in fences.drain(..) {
                        unsafe { device.destroy_fence(fence, None) };
                    }
                    return Err(err.into());
                }
            }
        }
        Ok(Self { device, fences })
    }

    /// Fence the submission of `slot` must signal, reset by [`FrameDevice::wait_for_slot`]
    pub fn fence(&self, slot: usize) -> Option<vk::Fence> {
        self.fences.get(slot).copied()
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }
}

impl FrameDevice for AshFrameDevice {
    fn wait_for_slot(&mut self, slot: usize, timeout_ns: u64) -> Result<()> {
        let fence = self
            .fences
            .get(slot)
            .copied()
            .ok_or(crate::SyncError::InvalidConfig("slot has no fence"))?;
        unsafe {
            self.device.wait_for_fences(&[fence], true, timeout_ns)?;
            self.device.reset_fences(&[fence])?;
        }
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: vk::Buffer) {
        unsafe { self.device.destroy_buffer(buffer, None) };
    }

    fn destroy_image(&mut self, image: vk::Image) {
        unsafe { self.device.destroy_image(image, None) };
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        unsafe { self.device.destroy_image_view(view, None) };
    }
}

impl Drop for AshFrameDevice {
    fn drop(&mut self) {
        for fence in self.fences.drain(..) {
            #[cfg(feature = "log-lifetimes")]
            trace!("Destroying VkFence {:?}", fence);
            unsafe { self.device.destroy_fence(fence, None) };
        }
    }
}
