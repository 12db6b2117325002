//! Per-resource state tracking and barrier synthesis
pub mod fence;
pub mod memory_barrier;
pub mod state;
pub mod synthesizer;
pub mod uses;

pub use fence::AshFrameDevice;
pub use memory_barrier::{
    BarrierBatch, BarrierStats, BufferBarrier, ImageBarrier, MemoryBarrier, SubresourceRange,
};
pub use state::{BufferState, ImageState, LayoutTransition};
pub use synthesizer::Plan;
pub use uses::ResourceUses;
