//! Recording commands with automatic barrier insertion
pub use command_buffer::AshCommandBuffer;
pub use recorder::CommandRecorder;
pub use render_pass::{Framebuffer, FramebufferAttachment, RenderPassBegin};

pub mod command_buffer;
pub mod recorder;
pub mod render_pass;
