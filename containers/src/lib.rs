pub mod error;
pub mod prelude;
pub mod ring;
pub mod slot;
pub mod slot_map;
