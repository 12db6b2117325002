//! Descriptor set layouts, the resources bound through them and how binding them synchronizes
pub use descriptor_set::{DescriptorResource, DescriptorSet};
pub use descriptor_set_layout::{DescriptorSetLayout, LayoutEntry};
pub use descriptor_set_layout_builder::{DescriptorSetLayoutBinding, DescriptorSetLayoutBuilder};

pub mod descriptor_set;
pub mod descriptor_set_layout;
pub mod descriptor_set_layout_builder;

use crate::sync::ResourceUses;

/// Every resource referenced by `sets`, one merged scope per resource
pub fn gather_uses<'a>(sets: impl IntoIterator<Item = &'a DescriptorSet>) -> ResourceUses {
    let mut uses = ResourceUses::default();
    for set in sets {
        uses.extend(&set.uses());
    }
    uses
}
