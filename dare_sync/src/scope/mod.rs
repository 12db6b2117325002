//! Usage scopes and the pure mapping from a scope to the pipeline stages, accesses and (for
//! images) layout it implies.
//!
//! Every mapping is table driven: each flag owns one row describing what it contributes, and
//! image layouts are picked by an ordered list of rules evaluated most specific first.
pub mod attachment;
pub mod buffer;
pub mod image;

use ash::vk;

pub use attachment::AttachmentOps;
pub use buffer::BufferScope;
pub use image::{ImageAccess, ImageScope};

use crate::error::SyncError;

/// Every access bit that counts as a write for hazard detection
pub const WRITE_ACCESS: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
    vk::AccessFlags2::SHADER_WRITE.as_raw()
        | vk::AccessFlags2::SHADER_STORAGE_WRITE.as_raw()
        | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE.as_raw()
        | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw()
        | vk::AccessFlags2::TRANSFER_WRITE.as_raw()
        | vk::AccessFlags2::HOST_WRITE.as_raw()
        | vk::AccessFlags2::MEMORY_WRITE.as_raw(),
);

/// Shader stages descriptors may be declared for
pub const SUPPORTED_SHADER_STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::from_raw(
    vk::ShaderStageFlags::VERTEX.as_raw()
        | vk::ShaderStageFlags::FRAGMENT.as_raw()
        | vk::ShaderStageFlags::COMPUTE.as_raw(),
);

/// Pipeline stages and memory accesses of one use of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Access {
    pub stage_mask: vk::PipelineStageFlags2,
    pub access_mask: vk::AccessFlags2,
}

impl Default for Access {
    fn default() -> Self {
        Self::NONE
    }
}

impl Access {
    pub const NONE: Self = Self {
        stage_mask: vk::PipelineStageFlags2::NONE,
        access_mask: vk::AccessFlags2::NONE,
    };

    pub const fn new(stage_mask: vk::PipelineStageFlags2, access_mask: vk::AccessFlags2) -> Self {
        Self {
            stage_mask,
            access_mask,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stage_mask.is_empty() && self.access_mask.is_empty()
    }

    pub fn is_write(&self) -> bool {
        self.access_mask.intersects(WRITE_ACCESS)
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            stage_mask: self.stage_mask | other.stage_mask,
            access_mask: self.access_mask | other.access_mask,
        }
    }

    /// Whether every stage and access of `other` is already part of `self`
    pub fn covers(&self, other: &Self) -> bool {
        self.stage_mask.contains(other.stage_mask) && self.access_mask.contains(other.access_mask)
    }
}

/// What a descriptor binding in one shader stage turns into
struct StageScopes {
    shader_stage: vk::ShaderStageFlags,
    uniform_buffer: BufferScope,
    storage_buffer: BufferScope,
    uniform_texel_buffer: BufferScope,
    sampled_image: ImageScope,
    storage_image: ImageScope,
}

const STAGE_SCOPES: [StageScopes; 3] = [
    StageScopes {
        shader_stage: vk::ShaderStageFlags::VERTEX,
        uniform_buffer: BufferScope::VERTEX_SHADER_UNIFORM,
        storage_buffer: BufferScope::VERTEX_SHADER_STORAGE,
        uniform_texel_buffer: BufferScope::VERTEX_SHADER_SAMPLED,
        sampled_image: ImageScope::VERTEX_SHADER_SAMPLED,
        storage_image: ImageScope::VERTEX_SHADER_STORAGE,
    },
    StageScopes {
        shader_stage: vk::ShaderStageFlags::FRAGMENT,
        uniform_buffer: BufferScope::FRAGMENT_SHADER_UNIFORM,
        storage_buffer: BufferScope::FRAGMENT_SHADER_STORAGE,
        uniform_texel_buffer: BufferScope::FRAGMENT_SHADER_SAMPLED,
        sampled_image: ImageScope::FRAGMENT_SHADER_SAMPLED,
        storage_image: ImageScope::FRAGMENT_SHADER_STORAGE,
    },
    StageScopes {
        shader_stage: vk::ShaderStageFlags::COMPUTE,
        uniform_buffer: BufferScope::COMPUTE_SHADER_UNIFORM,
        storage_buffer: BufferScope::COMPUTE_SHADER_STORAGE,
        uniform_texel_buffer: BufferScope::COMPUTE_SHADER_SAMPLED,
        sampled_image: ImageScope::COMPUTE_SHADER_SAMPLED,
        storage_image: ImageScope::COMPUTE_SHADER_STORAGE,
    },
];

/// Scope a descriptor of type `ty`, visible to `stages`, places its resource in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorScope {
    Buffer(BufferScope),
    Image(ImageScope),
    /// Descriptor does not reference a tracked resource (samplers)
    Untracked,
}

pub fn descriptor_scope(
    ty: vk::DescriptorType,
    stages: vk::ShaderStageFlags,
) -> Result<DescriptorScope, SyncError> {
    if stages.is_empty() || !SUPPORTED_SHADER_STAGES.contains(stages) {
        return Err(SyncError::UnsupportedShaderStage(stages));
    }
    let active = STAGE_SCOPES
        .iter()
        .filter(|row| stages.contains(row.shader_stage));
    let scope = match ty {
        vk::DescriptorType::SAMPLER => DescriptorScope::Untracked,
        vk::DescriptorType::COMBINED_IMAGE_SAMPLER | vk::DescriptorType::SAMPLED_IMAGE => {
            DescriptorScope::Image(active.fold(ImageScope::empty(), |acc, row| {
                acc | row.sampled_image
            }))
        }
        vk::DescriptorType::STORAGE_IMAGE => DescriptorScope::Image(
            active.fold(ImageScope::empty(), |acc, row| acc | row.storage_image),
        ),
        vk::DescriptorType::INPUT_ATTACHMENT => DescriptorScope::Image(ImageScope::INPUT_ATTACHMENT),
        vk::DescriptorType::UNIFORM_BUFFER | vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC => {
            DescriptorScope::Buffer(
                active.fold(BufferScope::empty(), |acc, row| acc | row.uniform_buffer),
            )
        }
        vk::DescriptorType::STORAGE_BUFFER
        | vk::DescriptorType::STORAGE_BUFFER_DYNAMIC
        | vk::DescriptorType::STORAGE_TEXEL_BUFFER => DescriptorScope::Buffer(
            active.fold(BufferScope::empty(), |acc, row| acc | row.storage_buffer),
        ),
        vk::DescriptorType::UNIFORM_TEXEL_BUFFER => DescriptorScope::Buffer(
            active.fold(BufferScope::empty(), |acc, row| acc | row.uniform_texel_buffer),
        ),
        ty => return Err(SyncError::UnsupportedDescriptorType(ty)),
    };
    Ok(scope)
}
