use ash::vk;

use super::ImageScope;

/// Load and store operations of one framebuffer attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentOps {
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub stencil_load_op: vk::AttachmentLoadOp,
    pub stencil_store_op: vk::AttachmentStoreOp,
}

impl Default for AttachmentOps {
    fn default() -> Self {
        Self::new(vk::AttachmentLoadOp::LOAD, vk::AttachmentStoreOp::STORE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpUse {
    Read,
    Write,
}

/// Ops missing from these tables (the `NONE` variants) touch nothing
const LOAD_OP_USES: [(vk::AttachmentLoadOp, OpUse); 3] = [
    (vk::AttachmentLoadOp::LOAD, OpUse::Read),
    (vk::AttachmentLoadOp::CLEAR, OpUse::Write),
    // contents become undefined, which is a write
    (vk::AttachmentLoadOp::DONT_CARE, OpUse::Write),
];

const STORE_OP_USES: [(vk::AttachmentStoreOp, OpUse); 2] = [
    (vk::AttachmentStoreOp::STORE, OpUse::Write),
    (vk::AttachmentStoreOp::DONT_CARE, OpUse::Write),
];

fn load_use(op: vk::AttachmentLoadOp) -> Option<OpUse> {
    LOAD_OP_USES
        .iter()
        .find(|(candidate, _)| *candidate == op)
        .map(|(_, op_use)| *op_use)
}

fn store_use(op: vk::AttachmentStoreOp) -> Option<OpUse> {
    STORE_OP_USES
        .iter()
        .find(|(candidate, _)| *candidate == op)
        .map(|(_, op_use)| *op_use)
}

impl AttachmentOps {
    /// Stencil ops mirror the depth/color ops
    pub fn new(load_op: vk::AttachmentLoadOp, store_op: vk::AttachmentStoreOp) -> Self {
        Self {
            load_op,
            store_op,
            stencil_load_op: load_op,
            stencil_store_op: store_op,
        }
    }

    pub fn stencil(
        mut self,
        load_op: vk::AttachmentLoadOp,
        store_op: vk::AttachmentStoreOp,
    ) -> Self {
        self.stencil_load_op = load_op;
        self.stencil_store_op = store_op;
        self
    }

    /// Scope of an attachment with the given aspect.
    ///
    /// Stencil ops only count when the aspect has a stencil component. Ops that touch nothing
    /// still leave the attachment bound, so the result is never empty.
    pub fn scope(&self, aspect: vk::ImageAspectFlags) -> ImageScope {
        let mut uses = vec![load_use(self.load_op), store_use(self.store_op)];
        if aspect.contains(vk::ImageAspectFlags::STENCIL) {
            uses.push(load_use(self.stencil_load_op));
            uses.push(store_use(self.stencil_store_op));
        }
        let reads = uses.contains(&Some(OpUse::Read));
        let writes = uses.contains(&Some(OpUse::Write));

        let (read, write) = if aspect
            .intersects(vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL)
        {
            (
                ImageScope::DEPTH_STENCIL_ATTACHMENT_READ,
                ImageScope::DEPTH_STENCIL_ATTACHMENT_WRITE,
            )
        } else {
            (
                ImageScope::COLOR_ATTACHMENT_READ,
                ImageScope::COLOR_ATTACHMENT_WRITE,
            )
        };
        let mut scope = ImageScope::empty();
        if reads {
            scope |= read;
        }
        if writes {
            scope |= write;
        }
        if scope.is_empty() {
            scope = read;
        }
        scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_store_color_is_read_write() {
        let scope = AttachmentOps::default().scope(vk::ImageAspectFlags::COLOR);
        assert_eq!(scope, ImageScope::COLOR_ATTACHMENT);
    }

    #[test]
    fn clear_is_write_only() {
        let scope = AttachmentOps::new(vk::AttachmentLoadOp::CLEAR, vk::AttachmentStoreOp::STORE)
            .scope(vk::ImageAspectFlags::COLOR);
        assert_eq!(scope, ImageScope::COLOR_ATTACHMENT_WRITE);
    }

    #[test]
    fn none_ops_fall_back_to_read() {
        let scope = AttachmentOps::new(vk::AttachmentLoadOp::LOAD, vk::AttachmentStoreOp::NONE)
            .scope(vk::ImageAspectFlags::DEPTH);
        assert_eq!(scope, ImageScope::DEPTH_STENCIL_ATTACHMENT_READ);
        assert_eq!(
            scope.layout(),
            Ok(vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL)
        );
    }

    #[test]
    fn stencil_ops_only_count_with_stencil_aspect() {
        let ops = AttachmentOps::new(vk::AttachmentLoadOp::LOAD, vk::AttachmentStoreOp::NONE)
            .stencil(vk::AttachmentLoadOp::CLEAR, vk::AttachmentStoreOp::STORE);
        assert_eq!(
            ops.scope(vk::ImageAspectFlags::DEPTH),
            ImageScope::DEPTH_STENCIL_ATTACHMENT_READ
        );
        assert_eq!(
            ops.scope(vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL),
            ImageScope::DEPTH_STENCIL_ATTACHMENT
        );
    }
}
