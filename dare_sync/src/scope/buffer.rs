use ash::vk;
use bitflags::bitflags;

use super::Access;
use crate::error::SyncError;

bitflags! {
    /// How a buffer is (or is about to be) used
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferScope: u32 {
        const TRANSFER_SRC = 1 << 0;
        const TRANSFER_DST = 1 << 1;
        const INDIRECT_COMMAND = 1 << 2;
        const VERTEX_BUFFER = 1 << 3;
        const INDEX_BUFFER = 1 << 4;
        const VERTEX_SHADER_UNIFORM = 1 << 5;
        const FRAGMENT_SHADER_UNIFORM = 1 << 6;
        const COMPUTE_SHADER_UNIFORM = 1 << 7;
        const VERTEX_SHADER_STORAGE = 1 << 8;
        const FRAGMENT_SHADER_STORAGE = 1 << 9;
        const COMPUTE_SHADER_STORAGE = 1 << 10;
        /// Uniform texel buffer reads
        const VERTEX_SHADER_SAMPLED = 1 << 11;
        const FRAGMENT_SHADER_SAMPLED = 1 << 12;
        const COMPUTE_SHADER_SAMPLED = 1 << 13;
    }
}

struct BufferRule {
    scope: BufferScope,
    stage: vk::PipelineStageFlags2,
    access: vk::AccessFlags2,
    /// Creation usage of which at least one bit must be present
    usage: vk::BufferUsageFlags,
}

const SHADER_READ_WRITE: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
    vk::AccessFlags2::SHADER_READ.as_raw() | vk::AccessFlags2::SHADER_WRITE.as_raw(),
);
const STORAGE_USAGE: vk::BufferUsageFlags = vk::BufferUsageFlags::from_raw(
    vk::BufferUsageFlags::STORAGE_BUFFER.as_raw()
        | vk::BufferUsageFlags::STORAGE_TEXEL_BUFFER.as_raw(),
);

const BUFFER_RULES: [BufferRule; 14] = [
    BufferRule {
        scope: BufferScope::TRANSFER_SRC,
        stage: vk::PipelineStageFlags2::TRANSFER,
        access: vk::AccessFlags2::TRANSFER_READ,
        usage: vk::BufferUsageFlags::TRANSFER_SRC,
    },
    BufferRule {
        scope: BufferScope::TRANSFER_DST,
        stage: vk::PipelineStageFlags2::TRANSFER,
        access: vk::AccessFlags2::TRANSFER_WRITE,
        usage: vk::BufferUsageFlags::TRANSFER_DST,
    },
    BufferRule {
        scope: BufferScope::INDIRECT_COMMAND,
        stage: vk::PipelineStageFlags2::DRAW_INDIRECT,
        access: vk::AccessFlags2::INDIRECT_COMMAND_READ,
        usage: vk::BufferUsageFlags::INDIRECT_BUFFER,
    },
    BufferRule {
        scope: BufferScope::VERTEX_BUFFER,
        stage: vk::PipelineStageFlags2::VERTEX_INPUT,
        access: vk::AccessFlags2::VERTEX_ATTRIBUTE_READ,
        usage: vk::BufferUsageFlags::VERTEX_BUFFER,
    },
    BufferRule {
        scope: BufferScope::INDEX_BUFFER,
        stage: vk::PipelineStageFlags2::VERTEX_INPUT,
        access: vk::AccessFlags2::INDEX_READ,
        usage: vk::BufferUsageFlags::INDEX_BUFFER,
    },
    BufferRule {
        scope: BufferScope::VERTEX_SHADER_UNIFORM,
        stage: vk::PipelineStageFlags2::VERTEX_SHADER,
        access: vk::AccessFlags2::UNIFORM_READ,
        usage: vk::BufferUsageFlags::UNIFORM_BUFFER,
    },
    BufferRule {
        scope: BufferScope::FRAGMENT_SHADER_UNIFORM,
        stage: vk::PipelineStageFlags2::FRAGMENT_SHADER,
        access: vk::AccessFlags2::UNIFORM_READ,
        usage: vk::BufferUsageFlags::UNIFORM_BUFFER,
    },
    BufferRule {
        scope: BufferScope::COMPUTE_SHADER_UNIFORM,
        stage: vk::PipelineStageFlags2::COMPUTE_SHADER,
        access: vk::AccessFlags2::UNIFORM_READ,
        usage: vk::BufferUsageFlags::UNIFORM_BUFFER,
    },
    BufferRule {
        scope: BufferScope::VERTEX_SHADER_STORAGE,
        stage: vk::PipelineStageFlags2::VERTEX_SHADER,
        access: SHADER_READ_WRITE,
        usage: STORAGE_USAGE,
    },
    BufferRule {
        scope: BufferScope::FRAGMENT_SHADER_STORAGE,
        stage: vk::PipelineStageFlags2::FRAGMENT_SHADER,
        access: SHADER_READ_WRITE,
        usage: STORAGE_USAGE,
    },
    BufferRule {
        scope: BufferScope::COMPUTE_SHADER_STORAGE,
        stage: vk::PipelineStageFlags2::COMPUTE_SHADER,
        access: SHADER_READ_WRITE,
        usage: STORAGE_USAGE,
    },
    BufferRule {
        scope: BufferScope::VERTEX_SHADER_SAMPLED,
        stage: vk::PipelineStageFlags2::VERTEX_SHADER,
        access: vk::AccessFlags2::SHADER_READ,
        usage: vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER,
    },
    BufferRule {
        scope: BufferScope::FRAGMENT_SHADER_SAMPLED,
        stage: vk::PipelineStageFlags2::FRAGMENT_SHADER,
        access: vk::AccessFlags2::SHADER_READ,
        usage: vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER,
    },
    BufferRule {
        scope: BufferScope::COMPUTE_SHADER_SAMPLED,
        stage: vk::PipelineStageFlags2::COMPUTE_SHADER,
        access: vk::AccessFlags2::SHADER_READ,
        usage: vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER,
    },
];

impl BufferScope {
    /// Stages and accesses required to acquire a buffer into this scope.
    ///
    /// Each set flag contributes its own row; stages and accesses are unioned.
    pub fn access(self) -> Result<Access, SyncError> {
        let access = BUFFER_RULES
            .iter()
            .filter(|rule| self.contains(rule.scope))
            .fold(Access::NONE, |acc, rule| {
                acc.union(Access::new(rule.stage, rule.access))
            });
        if access.is_empty() {
            return Err(SyncError::EmptyScope);
        }
        Ok(access)
    }

    /// Check the scope against the usage flags the buffer was created with
    pub fn validate_usage(self, declared: vk::BufferUsageFlags) -> Result<(), SyncError> {
        match BUFFER_RULES
            .iter()
            .find(|rule| self.contains(rule.scope) && !declared.intersects(rule.usage))
        {
            Some(rule) => Err(SyncError::MissingBufferUsage {
                scope: rule.scope,
                required: rule.usage,
                declared,
            }),
            None => Ok(()),
        }
    }

    /// Every read-only scope a buffer created with `usage` may be released to
    pub fn baseline_for_usage(usage: vk::BufferUsageFlags) -> Self {
        BUFFER_RULES
            .iter()
            .filter(|rule| {
                usage.intersects(rule.usage) && !Access::new(rule.stage, rule.access).is_write()
            })
            .fold(Self::empty(), |acc, rule| acc | rule.scope)
    }
}
