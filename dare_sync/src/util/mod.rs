/// Utility functions commonly used
pub mod format;
pub mod tests;

pub use format::{aspect_from_format, mip_extent, texel_block, texel_size, TexelBlock};
