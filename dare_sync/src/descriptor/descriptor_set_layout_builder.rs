use std::sync::Arc;

use anyhow::Result;
use ash::vk;

use super::descriptor_set_layout::{DescriptorSetLayout, LayoutEntry};
use crate::error::SyncError;
use crate::scope::{self, SUPPORTED_SHADER_STAGES};

#[derive(Clone, Debug, Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<DescriptorSetLayoutBinding>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DescriptorSetLayoutBinding {
    pub binding: u32,
    pub ty: vk::DescriptorType,
    pub count: u32,
    pub stages: vk::ShaderStageFlags,
    pub flags: vk::DescriptorBindingFlags,
}

impl DescriptorSetLayoutBinding {
    pub fn new(binding: u32, ty: vk::DescriptorType) -> Self {
        Self {
            binding,
            ty,
            count: 1,
            stages: SUPPORTED_SHADER_STAGES,
            flags: vk::DescriptorBindingFlags::empty(),
        }
    }

    pub fn flag(mut self, flag: vk::DescriptorBindingFlags) -> Self {
        self.flags = flag;
        self
    }

    pub fn descriptor_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn stage_flags(mut self, stages: vk::ShaderStageFlags) -> Self {
        self.stages = stages;
        self
    }
}

impl DescriptorSetLayoutBuilder {
    /// Adds a binding visible to the vertex, fragment and compute stages
    pub fn add_binding(mut self, binding: u32, ty: vk::DescriptorType) -> Self {
        self.bindings
            .push(DescriptorSetLayoutBinding::new(binding, ty));
        self
    }

    pub fn add_binding_with_stages(
        mut self,
        binding: u32,
        ty: vk::DescriptorType,
        stages: vk::ShaderStageFlags,
    ) -> Self {
        self.bindings
            .push(DescriptorSetLayoutBinding::new(binding, ty).stage_flags(stages));
        self
    }

    pub fn add_raw_binding(mut self, bindings: &[DescriptorSetLayoutBinding]) -> Self {
        self.bindings.extend_from_slice(bindings);
        self
    }

    /// Clear of all bindings
    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn raw_bindings(&self) -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
        self.bindings
            .iter()
            .map(|binding| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(binding.binding)
                    .descriptor_type(binding.ty)
                    .descriptor_count(binding.count)
                    .stage_flags(binding.stages)
            })
            .collect()
    }

    fn entries(&self) -> Result<Vec<LayoutEntry>, SyncError> {
        self.bindings
            .iter()
            .map(|binding| {
                Ok(LayoutEntry {
                    binding: *binding,
                    scope: scope::descriptor_scope(binding.ty, binding.stages)?,
                })
            })
            .collect()
    }

    /// Wraps an already created layout. Fails if any binding has no synchronization mapping.
    pub fn build_from_handle(
        self,
        handle: vk::DescriptorSetLayout,
        name: Option<String>,
    ) -> Result<Arc<DescriptorSetLayout>, SyncError> {
        Ok(Arc::new(DescriptorSetLayout::new(
            handle,
            self.entries()?,
            name,
        )))
    }

    /// Creates the descriptor set layout on `device`
    pub fn build(
        self,
        device: &ash::Device,
        create_flags: vk::DescriptorSetLayoutCreateFlags,
        name: Option<String>,
    ) -> Result<Arc<DescriptorSetLayout>> {
        // validate before creating anything that would need cleaning up
        let entries = self.entries()?;
        let raw_bindings = self.raw_bindings();
        let flags: Vec<vk::DescriptorBindingFlags> =
            self.bindings.iter().map(|binding| binding.flags).collect();
        let flags_enabled = flags
            .iter()
            .any(|flag| *flag != vk::DescriptorBindingFlags::default());

        let mut binding_flags =
            vk::DescriptorSetLayoutBindingFlagsCreateInfo::default().binding_flags(&flags);
        let mut create_info = vk::DescriptorSetLayoutCreateInfo::default()
            .flags(create_flags)
            .bindings(&raw_bindings);
        if flags_enabled {
            create_info = create_info.push_next(&mut binding_flags);
        }
        let handle = unsafe { device.create_descriptor_set_layout(&create_info, None)? };
        Ok(Arc::new(DescriptorSetLayout::new(handle, entries, name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{BufferScope, DescriptorScope, ImageScope};
    use ash::vk::Handle;

    #[test]
    fn default_stages_cover_every_supported_stage() {
        let builder = DescriptorSetLayoutBuilder::default()
            .add_binding(0, vk::DescriptorType::UNIFORM_BUFFER)
            .add_binding_with_stages(
                1,
                vk::DescriptorType::STORAGE_IMAGE,
                vk::ShaderStageFlags::COMPUTE,
            );
        let raw = builder.raw_bindings();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].stage_flags, SUPPORTED_SHADER_STAGES);

        let layout = builder
            .build_from_handle(vk::DescriptorSetLayout::from_raw(1), None)
            .unwrap();
        assert_eq!(
            layout.binding(0).map(|entry| entry.scope),
            Some(DescriptorScope::Buffer(
                BufferScope::VERTEX_SHADER_UNIFORM
                    | BufferScope::FRAGMENT_SHADER_UNIFORM
                    | BufferScope::COMPUTE_SHADER_UNIFORM
            ))
        );
        assert_eq!(
            layout.binding(1).map(|entry| entry.scope),
            Some(DescriptorScope::Image(ImageScope::COMPUTE_SHADER_STORAGE))
        );
    }

    #[test]
    fn unsupported_stage_fails_to_build() {
        let result = DescriptorSetLayoutBuilder::default()
            .add_binding_with_stages(
                0,
                vk::DescriptorType::SAMPLED_IMAGE,
                vk::ShaderStageFlags::TESSELLATION_CONTROL,
            )
            .build_from_handle(vk::DescriptorSetLayout::null(), None);
        assert_eq!(
            result.err(),
            Some(SyncError::UnsupportedShaderStage(
                vk::ShaderStageFlags::TESSELLATION_CONTROL
            ))
        );
    }
}
