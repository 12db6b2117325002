use ash::vk;
use bitflags::bitflags;

use super::Access;
use crate::error::SyncError;

bitflags! {
    /// How an image is (or is about to be) used
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageScope: u32 {
        const TRANSFER_SRC = 1 << 0;
        const TRANSFER_DST = 1 << 1;
        const VERTEX_SHADER_SAMPLED = 1 << 2;
        const FRAGMENT_SHADER_SAMPLED = 1 << 3;
        const COMPUTE_SHADER_SAMPLED = 1 << 4;
        const VERTEX_SHADER_STORAGE = 1 << 5;
        const FRAGMENT_SHADER_STORAGE = 1 << 6;
        const COMPUTE_SHADER_STORAGE = 1 << 7;
        const COLOR_ATTACHMENT_READ = 1 << 8;
        const COLOR_ATTACHMENT_WRITE = 1 << 9;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 10;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 11;
        const INPUT_ATTACHMENT = 1 << 12;
        /// Hand-off to the presentation engine
        const PRESENT = 1 << 13;
    }
}

impl ImageScope {
    pub const TRANSFER: Self = Self::TRANSFER_SRC.union(Self::TRANSFER_DST);
    pub const SHADER_SAMPLED: Self = Self::VERTEX_SHADER_SAMPLED
        .union(Self::FRAGMENT_SHADER_SAMPLED)
        .union(Self::COMPUTE_SHADER_SAMPLED);
    pub const SHADER_STORAGE: Self = Self::VERTEX_SHADER_STORAGE
        .union(Self::FRAGMENT_SHADER_STORAGE)
        .union(Self::COMPUTE_SHADER_STORAGE);
    pub const COLOR_ATTACHMENT: Self =
        Self::COLOR_ATTACHMENT_READ.union(Self::COLOR_ATTACHMENT_WRITE);
    pub const DEPTH_STENCIL_ATTACHMENT: Self =
        Self::DEPTH_STENCIL_ATTACHMENT_READ.union(Self::DEPTH_STENCIL_ATTACHMENT_WRITE);
}

/// Stages, accesses and layout required to acquire an image into a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageAccess {
    pub access: Access,
    pub layout: vk::ImageLayout,
}

struct ImageRule {
    scope: ImageScope,
    stage: vk::PipelineStageFlags2,
    access: vk::AccessFlags2,
    /// Creation usage of which at least one bit must be present, empty for none
    usage: vk::ImageUsageFlags,
}

const SHADER_READ_WRITE: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
    vk::AccessFlags2::SHADER_READ.as_raw() | vk::AccessFlags2::SHADER_WRITE.as_raw(),
);
const FRAGMENT_TESTS: vk::PipelineStageFlags2 = vk::PipelineStageFlags2::from_raw(
    vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS.as_raw()
        | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS.as_raw(),
);

const IMAGE_RULES: [ImageRule; 14] = [
    ImageRule {
        scope: ImageScope::TRANSFER_SRC,
        stage: vk::PipelineStageFlags2::TRANSFER,
        access: vk::AccessFlags2::TRANSFER_READ,
        usage: vk::ImageUsageFlags::TRANSFER_SRC,
    },
    ImageRule {
        scope: ImageScope::TRANSFER_DST,
        stage: vk::PipelineStageFlags2::TRANSFER,
        access: vk::AccessFlags2::TRANSFER_WRITE,
        usage: vk::ImageUsageFlags::TRANSFER_DST,
    },
    ImageRule {
        scope: ImageScope::VERTEX_SHADER_SAMPLED,
        stage: vk::PipelineStageFlags2::VERTEX_SHADER,
        access: vk::AccessFlags2::SHADER_READ,
        usage: vk::ImageUsageFlags::SAMPLED,
    },
    ImageRule {
        scope: ImageScope::FRAGMENT_SHADER_SAMPLED,
        stage: vk::PipelineStageFlags2::FRAGMENT_SHADER,
        access: vk::AccessFlags2::SHADER_READ,
        usage: vk::ImageUsageFlags::SAMPLED,
    },
    ImageRule {
        scope: ImageScope::COMPUTE_SHADER_SAMPLED,
        stage: vk::PipelineStageFlags2::COMPUTE_SHADER,
        access: vk::AccessFlags2::SHADER_READ,
        usage: vk::ImageUsageFlags::SAMPLED,
    },
    ImageRule {
        scope: ImageScope::VERTEX_SHADER_STORAGE,
        stage: vk::PipelineStageFlags2::VERTEX_SHADER,
        access: SHADER_READ_WRITE,
        usage: vk::ImageUsageFlags::STORAGE,
    },
    ImageRule {
        scope: ImageScope::FRAGMENT_SHADER_STORAGE,
        stage: vk::PipelineStageFlags2::FRAGMENT_SHADER,
        access: SHADER_READ_WRITE,
        usage: vk::ImageUsageFlags::STORAGE,
    },
    ImageRule {
        scope: ImageScope::COMPUTE_SHADER_STORAGE,
        stage: vk::PipelineStageFlags2::COMPUTE_SHADER,
        access: SHADER_READ_WRITE,
        usage: vk::ImageUsageFlags::STORAGE,
    },
    ImageRule {
        scope: ImageScope::COLOR_ATTACHMENT_READ,
        stage: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        access: vk::AccessFlags2::COLOR_ATTACHMENT_READ,
        usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
    },
    ImageRule {
        scope: ImageScope::COLOR_ATTACHMENT_WRITE,
        stage: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        access: vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
        usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
    },
    ImageRule {
        scope: ImageScope::DEPTH_STENCIL_ATTACHMENT_READ,
        stage: FRAGMENT_TESTS,
        access: vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ,
        usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
    },
    ImageRule {
        scope: ImageScope::DEPTH_STENCIL_ATTACHMENT_WRITE,
        stage: FRAGMENT_TESTS,
        access: vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
        usage: vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
    },
    ImageRule {
        scope: ImageScope::INPUT_ATTACHMENT,
        stage: vk::PipelineStageFlags2::FRAGMENT_SHADER,
        access: vk::AccessFlags2::INPUT_ATTACHMENT_READ,
        usage: vk::ImageUsageFlags::INPUT_ATTACHMENT,
    },
    ImageRule {
        scope: ImageScope::PRESENT,
        stage: vk::PipelineStageFlags2::BOTTOM_OF_PIPE,
        access: vk::AccessFlags2::NONE,
        usage: vk::ImageUsageFlags::empty(),
    },
];

/// Picks a layout when the scope contains every flag of `all_of` and nothing outside `allowed`
struct LayoutRule {
    all_of: ImageScope,
    allowed: ImageScope,
    layout: vk::ImageLayout,
}

const STORAGE_COMPATIBLE: ImageScope = ImageScope::SHADER_STORAGE
    .union(ImageScope::SHADER_SAMPLED)
    .union(ImageScope::TRANSFER);

/// Ordered most specific first; the first match wins
const LAYOUT_RULES: [LayoutRule; 15] = [
    // source and destination of the same copy
    LayoutRule {
        all_of: ImageScope::TRANSFER,
        allowed: STORAGE_COMPATIBLE,
        layout: vk::ImageLayout::GENERAL,
    },
    // storage widens sampled and transfer uses to GENERAL
    LayoutRule {
        all_of: ImageScope::VERTEX_SHADER_STORAGE,
        allowed: STORAGE_COMPATIBLE,
        layout: vk::ImageLayout::GENERAL,
    },
    LayoutRule {
        all_of: ImageScope::FRAGMENT_SHADER_STORAGE,
        allowed: STORAGE_COMPATIBLE,
        layout: vk::ImageLayout::GENERAL,
    },
    LayoutRule {
        all_of: ImageScope::COMPUTE_SHADER_STORAGE,
        allowed: STORAGE_COMPATIBLE,
        layout: vk::ImageLayout::GENERAL,
    },
    LayoutRule {
        all_of: ImageScope::TRANSFER_SRC,
        allowed: ImageScope::TRANSFER_SRC,
        layout: vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
    },
    LayoutRule {
        all_of: ImageScope::TRANSFER_DST,
        allowed: ImageScope::TRANSFER_DST,
        layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    },
    LayoutRule {
        all_of: ImageScope::COLOR_ATTACHMENT_WRITE,
        allowed: ImageScope::COLOR_ATTACHMENT,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    },
    LayoutRule {
        all_of: ImageScope::COLOR_ATTACHMENT_READ,
        allowed: ImageScope::COLOR_ATTACHMENT,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    },
    LayoutRule {
        all_of: ImageScope::DEPTH_STENCIL_ATTACHMENT_WRITE,
        allowed: ImageScope::DEPTH_STENCIL_ATTACHMENT,
        layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    },
    // read-only depth may be sampled at the same time
    LayoutRule {
        all_of: ImageScope::DEPTH_STENCIL_ATTACHMENT_READ,
        allowed: ImageScope::DEPTH_STENCIL_ATTACHMENT_READ
            .union(ImageScope::SHADER_SAMPLED)
            .union(ImageScope::INPUT_ATTACHMENT),
        layout: vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
    },
    LayoutRule {
        all_of: ImageScope::INPUT_ATTACHMENT,
        allowed: ImageScope::INPUT_ATTACHMENT.union(ImageScope::SHADER_SAMPLED),
        layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    },
    LayoutRule {
        all_of: ImageScope::VERTEX_SHADER_SAMPLED,
        allowed: ImageScope::SHADER_SAMPLED,
        layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    },
    LayoutRule {
        all_of: ImageScope::FRAGMENT_SHADER_SAMPLED,
        allowed: ImageScope::SHADER_SAMPLED,
        layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    },
    LayoutRule {
        all_of: ImageScope::COMPUTE_SHADER_SAMPLED,
        allowed: ImageScope::SHADER_SAMPLED,
        layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    },
    LayoutRule {
        all_of: ImageScope::PRESENT,
        allowed: ImageScope::PRESENT,
        layout: vk::ImageLayout::PRESENT_SRC_KHR,
    },
];

/// Preferred baseline scope for each creation usage, first match wins
const BASELINE_RULES: [(vk::ImageUsageFlags, ImageScope); 3] = [
    (vk::ImageUsageFlags::SAMPLED, ImageScope::SHADER_SAMPLED),
    (vk::ImageUsageFlags::INPUT_ATTACHMENT, ImageScope::INPUT_ATTACHMENT),
    (vk::ImageUsageFlags::TRANSFER_SRC, ImageScope::TRANSFER_SRC),
];

impl ImageScope {
    /// Layout an image must be in for this scope
    pub fn layout(self) -> Result<vk::ImageLayout, SyncError> {
        if self.is_empty() {
            return Err(SyncError::EmptyScope);
        }
        LAYOUT_RULES
            .iter()
            .find(|rule| self.contains(rule.all_of) && rule.allowed.contains(self))
            .map(|rule| rule.layout)
            .ok_or(SyncError::IrreconcilableScope(self))
    }

    /// Stages, accesses and layout required to acquire an image into this scope
    pub fn access(self) -> Result<ImageAccess, SyncError> {
        let access = IMAGE_RULES
            .iter()
            .filter(|rule| self.contains(rule.scope))
            .fold(Access::NONE, |acc, rule| {
                acc.union(Access::new(rule.stage, rule.access))
            });
        if access.is_empty() {
            return Err(SyncError::EmptyScope);
        }
        Ok(ImageAccess {
            access,
            layout: self.layout()?,
        })
    }

    /// Check the scope against the usage flags the image was created with
    pub fn validate_usage(self, declared: vk::ImageUsageFlags) -> Result<(), SyncError> {
        match IMAGE_RULES.iter().find(|rule| {
            self.contains(rule.scope) && !rule.usage.is_empty() && !declared.intersects(rule.usage)
        }) {
            Some(rule) => Err(SyncError::MissingImageUsage {
                scope: rule.scope,
                required: rule.usage,
                declared,
            }),
            None => Ok(()),
        }
    }

    /// Read-only scope an image created with `usage` is released to, if any
    pub fn baseline_for_usage(usage: vk::ImageUsageFlags) -> Option<Self> {
        BASELINE_RULES
            .iter()
            .find(|(required, _)| usage.contains(*required))
            .map(|(_, scope)| *scope)
    }
}
