pub use crate::command::{
    AshCommandBuffer, CommandRecorder, Framebuffer, FramebufferAttachment, RenderPassBegin,
};
pub use crate::config::SyncConfig;
pub use crate::context::{Deferred, SyncContext};
pub use crate::descriptor::{
    DescriptorResource, DescriptorSet, DescriptorSetLayout, DescriptorSetLayoutBinding,
    DescriptorSetLayoutBuilder,
};
pub use crate::error::SyncError;
pub use crate::resource::{
    BufferDesc, BufferHandle, BufferRecord, ImageDesc, ImageHandle, ImageRecord, ResourceTable,
};
pub use crate::scope::{Access, AttachmentOps, BufferScope, ImageAccess, ImageScope};
pub use crate::sync::{
    AshFrameDevice, BarrierBatch, BarrierStats, BufferBarrier, BufferState, ImageBarrier,
    ImageState, MemoryBarrier, Plan, ResourceUses, SubresourceRange,
};
pub use crate::traits::{CommandStream, FrameDevice};
