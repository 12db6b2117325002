//! Tracked buffers and images and the table that owns their state
pub mod buffer;
pub mod image;
pub mod table;

pub use buffer::{BufferDesc, BufferHandle, BufferRecord};
pub use image::{ImageDesc, ImageHandle, ImageRecord};
pub use table::ResourceTable;
