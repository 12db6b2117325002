use ash::vk;
#[cfg(feature = "log-lifetimes")]
use tracing::trace;

use super::descriptor_set_layout_builder::DescriptorSetLayoutBinding;
use crate::scope::DescriptorScope;

/// A binding together with the scope its resources are acquired into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutEntry {
    pub binding: DescriptorSetLayoutBinding,
    pub scope: DescriptorScope,
}

#[derive(Debug, Clone)]
pub struct DescriptorSetLayout {
    handle: vk::DescriptorSetLayout,
    entries: Vec<LayoutEntry>,
    name: Option<String>,
}

impl DescriptorSetLayout {
    pub(crate) fn new(
        handle: vk::DescriptorSetLayout,
        entries: Vec<LayoutEntry>,
        name: Option<String>,
    ) -> Self {
        Self {
            handle,
            entries,
            name,
        }
    }

    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.handle
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn binding(&self, binding: u32) -> Option<&LayoutEntry> {
        self.entries
            .iter()
            .find(|entry| entry.binding.binding == binding)
    }

    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    /// Destroys the underlying layout. Sets already allocated from it stay valid to bind.
    pub fn destroy(&self, device: &ash::Device) {
        #[cfg(feature = "log-lifetimes")]
        trace!("Destroying VkDescriptorSetLayout {:?}", self.handle);
        unsafe {
            device.destroy_descriptor_set_layout(self.handle, None);
        }
    }
}
