use ash::vk;
use thiserror::Error;

use crate::scope::{BufferScope, ImageScope};

/// Validation failures raised while recording.
///
/// None of these are recoverable synchronization outcomes: an `Err` means the offending call
/// forwarded nothing to the command stream and the stream must not be submitted.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SyncError {
    #[error("Resource handle is invalid or has already been destroyed")]
    StaleHandle,

    #[error("Usage scope has no flags set")]
    EmptyScope,

    #[error("No single image layout satisfies every flag of {0:?}")]
    IrreconcilableScope(ImageScope),

    #[error("Buffer scope {scope:?} requires usage {required:?}, buffer was created with {declared:?}")]
    MissingBufferUsage {
        scope: BufferScope,
        required: vk::BufferUsageFlags,
        declared: vk::BufferUsageFlags,
    },

    #[error("Image scope {scope:?} requires usage {required:?}, image was created with {declared:?}")]
    MissingImageUsage {
        scope: ImageScope,
        required: vk::ImageUsageFlags,
        declared: vk::ImageUsageFlags,
    },

    #[error("Resource was registered without any usage flags")]
    NoUsage,

    #[error("Resource has no baseline scope to release to")]
    NoBaseline,

    #[error("Push constant range [{offset}, {offset} + {size}) exceeds the {limit} byte limit or is misaligned")]
    PushConstantOverflow { offset: u32, size: u32, limit: u32 },

    #[error("Region is out of the resource bounds")]
    RegionOutOfBounds,

    #[error("Cannot size copies of aspect {aspect:?} of format {format:?}")]
    UnsizedFormat {
        format: vk::Format,
        aspect: vk::ImageAspectFlags,
    },

    #[error("A barrier is required but the recorder is inside a render pass")]
    BarrierInsideRenderPass,

    #[error("Render pass is already active")]
    RenderPassActive,

    #[error("No render pass is active")]
    NoRenderPass,

    #[error("Descriptor type {0:?} is not supported")]
    UnsupportedDescriptorType(vk::DescriptorType),

    #[error("Shader stages {0:?} are not supported, only vertex, fragment and compute are")]
    UnsupportedShaderStage(vk::ShaderStageFlags),

    #[error("Descriptor set layout has no binding {0}")]
    MissingBinding(u32),

    #[error("Descriptor array element {element} is out of range for binding {binding}")]
    DescriptorElementOutOfRange { binding: u32, element: u32 },

    #[error("Descriptor binding {binding} of type {ty:?} cannot reference this kind of resource")]
    DescriptorTypeMismatch { binding: u32, ty: vk::DescriptorType },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error(transparent)]
    VkError(#[from] vk::Result),

    #[error(transparent)]
    Container(#[from] dare_containers::error::ContainerErrors),
}
