use ash::vk;
use dare_containers::slot::Slot;

use crate::error::SyncError;
use crate::scope::BufferScope;
use crate::sync::BufferState;

pub type BufferHandle = Slot<BufferRecord>;

/// Describes an externally created buffer to be tracked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    pub handle: vk::Buffer,
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    pub name: Option<String>,
    /// Scope [`release_buffer`](crate::CommandRecorder::release_buffer) returns to. Derived from
    /// `usage` when unset.
    pub baseline: Option<BufferScope>,
}

impl BufferDesc {
    pub fn new(handle: vk::Buffer, size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> Self {
        Self {
            handle,
            size,
            usage,
            name: None,
            baseline: None,
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn baseline(mut self, baseline: BufferScope) -> Self {
        self.baseline = Some(baseline);
        self
    }
}

#[derive(Debug)]
pub struct BufferRecord {
    handle: vk::Buffer,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
    name: Option<String>,
    baseline: Option<BufferScope>,
    pub(crate) state: BufferState,
}

impl BufferRecord {
    pub(crate) fn new(desc: BufferDesc) -> Result<Self, SyncError> {
        if desc.usage.is_empty() {
            return Err(SyncError::NoUsage);
        }
        let baseline = match desc.baseline {
            Some(baseline) => {
                baseline.validate_usage(desc.usage)?;
                Some(baseline)
            }
            None => Some(BufferScope::baseline_for_usage(desc.usage)).filter(|s| !s.is_empty()),
        };
        Ok(Self {
            handle: desc.handle,
            size: desc.size,
            usage: desc.usage,
            name: desc.name,
            baseline,
            state: BufferState::default(),
        })
    }

    pub fn handle(&self) -> vk::Buffer {
        self.handle
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    pub fn usage(&self) -> vk::BufferUsageFlags {
        self.usage
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn baseline(&self) -> Option<BufferScope> {
        self.baseline
    }

    pub fn state(&self) -> &BufferState {
        &self.state
    }

    /// Checks `[offset, offset + size)` lies within the buffer
    pub(crate) fn check_range(
        &self,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
    ) -> Result<(), SyncError> {
        match offset.checked_add(size) {
            Some(end) if size > 0 && end <= self.size => Ok(()),
            _ => Err(SyncError::RegionOutOfBounds),
        }
    }
}
