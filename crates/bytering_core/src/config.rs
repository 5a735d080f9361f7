use crate::RingError;

/// Behavior of a write that does not fit in the free space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullPolicy {
    /// Refuse the write with `InsufficientSpace`. Nothing is written.
    #[default]
    Reject,

    /// Discard the oldest unread bytes to make room. Writes never fail for
    /// lack of space, so the buffer retains the most recent `capacity - 1`
    /// bytes.
    Overwrite,
}

/// Per-instance ring buffer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingConfig {
    /// Storage size in bytes. Must be a nonzero power of two; one slot is
    /// reserved, so `capacity - 1` bytes are usable.
    pub capacity: usize,

    /// What a write does when the buffer lacks room.
    pub policy: FullPolicy,
}

impl RingConfig {
    /// Creates a configuration with the default reject policy.
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            policy: FullPolicy::Reject,
        }
    }

    /// Replaces the full-buffer policy.
    pub const fn with_policy(mut self, policy: FullPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Checks the power-of-two constraint that cursor masking relies on.
    pub fn validate(&self) -> Result<(), RingError> {
        if self.capacity.is_power_of_two() {
            Ok(())
        } else {
            Err(RingError::InvalidCapacity)
        }
    }
}
