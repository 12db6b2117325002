use ash::vk;
use derivative::Derivative;

use crate::resource::ImageHandle;
use crate::scope::AttachmentOps;

/// One attachment of a framebuffer and the ops its render pass performs on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferAttachment {
    pub image: ImageHandle,
    pub ops: AttachmentOps,
}

/// A framebuffer whose attachments are tracked images
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Framebuffer {
    pub handle: vk::Framebuffer,
    pub attachments: Vec<FramebufferAttachment>,
}

impl Framebuffer {
    pub fn new(handle: vk::Framebuffer) -> Self {
        Self {
            handle,
            attachments: Vec::new(),
        }
    }

    pub fn attachment(mut self, image: ImageHandle, ops: AttachmentOps) -> Self {
        self.attachments.push(FramebufferAttachment { image, ops });
        self
    }
}

/// Arguments of [`CommandRecorder::begin_render_pass`](crate::CommandRecorder::begin_render_pass).
///
/// The render pass is expected to keep every attachment in the layout its ops resolve to
/// (initial and final layout equal), with a single subpass.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct RenderPassBegin<'a> {
    pub render_pass: vk::RenderPass,
    pub framebuffer: &'a Framebuffer,
    pub render_area: vk::Rect2D,
    #[derivative(Debug = "ignore")]
    pub clear_values: Vec<vk::ClearValue>,
}

impl<'a> RenderPassBegin<'a> {
    pub fn new(
        render_pass: vk::RenderPass,
        framebuffer: &'a Framebuffer,
        render_area: vk::Rect2D,
    ) -> Self {
        Self {
            render_pass,
            framebuffer,
            render_area,
            clear_values: Vec::new(),
        }
    }

    pub fn clear_values(mut self, clear_values: &[vk::ClearValue]) -> Self {
        self.clear_values = clear_values.to_vec();
        self
    }
}
