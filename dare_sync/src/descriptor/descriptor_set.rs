use std::collections::BTreeMap;
use std::sync::Arc;

use ash::vk;

use super::descriptor_set_layout::{DescriptorSetLayout, LayoutEntry};
use crate::error::SyncError;
use crate::resource::{BufferHandle, ImageHandle};
use crate::scope::DescriptorScope;
use crate::sync::ResourceUses;

/// What one descriptor element refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorResource {
    Buffer(BufferHandle),
    Image(ImageHandle),
}

/// A descriptor set and the tracked resource behind each of its elements.
///
/// Writing the descriptors on the device stays with the caller; this only records what a bind
/// of the set touches.
#[derive(Debug, Clone)]
pub struct DescriptorSet {
    handle: vk::DescriptorSet,
    layout: Arc<DescriptorSetLayout>,
    /// Keyed by (binding, array element)
    resources: BTreeMap<(u32, u32), DescriptorResource>,
}

impl DescriptorSet {
    pub fn new(handle: vk::DescriptorSet, layout: Arc<DescriptorSetLayout>) -> Self {
        Self {
            handle,
            layout,
            resources: BTreeMap::new(),
        }
    }

    pub fn handle(&self) -> vk::DescriptorSet {
        self.handle
    }

    pub fn layout(&self) -> &Arc<DescriptorSetLayout> {
        &self.layout
    }

    fn entry(&self, binding: u32, element: u32) -> Result<&LayoutEntry, SyncError> {
        let entry = self
            .layout
            .binding(binding)
            .ok_or(SyncError::MissingBinding(binding))?;
        if element >= entry.binding.count {
            return Err(SyncError::DescriptorElementOutOfRange { binding, element });
        }
        Ok(entry)
    }

    pub fn write_buffer(
        &mut self,
        binding: u32,
        element: u32,
        buffer: BufferHandle,
    ) -> Result<(), SyncError> {
        let entry = self.entry(binding, element)?;
        if !matches!(entry.scope, DescriptorScope::Buffer(_)) {
            return Err(SyncError::DescriptorTypeMismatch {
                binding,
                ty: entry.binding.ty,
            });
        }
        self.resources
            .insert((binding, element), DescriptorResource::Buffer(buffer));
        Ok(())
    }

    pub fn write_image(
        &mut self,
        binding: u32,
        element: u32,
        image: ImageHandle,
    ) -> Result<(), SyncError> {
        let entry = self.entry(binding, element)?;
        if !matches!(entry.scope, DescriptorScope::Image(_)) {
            return Err(SyncError::DescriptorTypeMismatch {
                binding,
                ty: entry.binding.ty,
            });
        }
        self.resources
            .insert((binding, element), DescriptorResource::Image(image));
        Ok(())
    }

    /// Forgets the resource behind an element
    pub fn clear(&mut self, binding: u32, element: u32) -> Option<DescriptorResource> {
        self.resources.remove(&(binding, element))
    }

    pub fn resource(&self, binding: u32, element: u32) -> Option<DescriptorResource> {
        self.resources.get(&(binding, element)).copied()
    }

    /// Every resource the set references with its scope, one entry per resource
    pub fn uses(&self) -> ResourceUses {
        let mut uses = ResourceUses::default();
        for ((binding, _), resource) in self.resources.iter() {
            let Some(entry) = self.layout.binding(*binding) else {
                continue;
            };
            match (entry.scope, resource) {
                (DescriptorScope::Buffer(scope), DescriptorResource::Buffer(handle)) => {
                    uses.add_buffer(*handle, scope);
                }
                (DescriptorScope::Image(scope), DescriptorResource::Image(handle)) => {
                    uses.add_image(*handle, scope);
                }
                _ => {}
            }
        }
        uses
    }
}
