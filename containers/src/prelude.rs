pub use super::error;
pub use super::error::ContainerErrors;
pub use super::ring::SlotRing;
pub use super::slot::Slot;
pub use super::slot_map::SlotMap;
