use crate::error::SyncError;

/// Tunables for a [`SyncContext`](crate::SyncContext)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Number of ring buffering slots (frames in flight)
    pub frames_in_flight: usize,
    /// Upper bound for push constant ranges, in bytes
    pub max_push_constant_size: u32,
    /// How many deferred destructions a single slot may queue
    pub deferred_queue_capacity: usize,
    /// Timeout handed to the device when waiting on a slot, in nanoseconds
    pub fence_timeout_ns: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            // minimum guaranteed by the Vulkan spec
            max_push_constant_size: 128,
            deferred_queue_capacity: 1024,
            fence_timeout_ns: u64::MAX,
        }
    }
}

impl SyncConfig {
    pub fn frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames;
        self
    }

    pub fn max_push_constant_size(mut self, size: u32) -> Self {
        self.max_push_constant_size = size;
        self
    }

    pub fn deferred_queue_capacity(mut self, capacity: usize) -> Self {
        self.deferred_queue_capacity = capacity;
        self
    }

    pub fn fence_timeout_ns(mut self, timeout: u64) -> Self {
        self.fence_timeout_ns = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.frames_in_flight == 0 {
            return Err(SyncError::InvalidConfig("frames_in_flight must be at least 1"));
        }
        if self.deferred_queue_capacity == 0 {
            return Err(SyncError::InvalidConfig(
                "deferred_queue_capacity must be at least 1",
            ));
        }
        Ok(())
    }
}
