//! Engine configuration.
//!
//! [`EngineConfig`] bounds the resources one [`crate::execution::Engine`] may use. Every limit is
//! enforced as an error, never as a panic or a native stack overflow:
//!
//! | Field | Error when exceeded |
//! |-------|---------------------|
//! | `stack_capacity` | [`crate::execution::ExecutionError::StackOverflow`] |
//! | `max_call_depth` | [`crate::execution::ExecutionError::CallDepthExceeded`] |
//! | `heap_capacity` | [`crate::execution::ExecutionError::OutOfMemory`] |
//!
//! # Presets
//!
//! - [`EngineConfig::default()`] - 1 MiB stack, 256 nested calls, 16 MiB heap
//! - [`EngineConfig::minimal()`] - small buffers for tests and constant evaluation
//! - [`EngineConfig::extended()`] - deep recursion and large heaps
//!
//! # Example
//!
//! ```rust
//! use minclr::execution::EngineConfig;
//!
//! let config = EngineConfig::minimal()
//!     .with_max_call_depth(32)
//!     .with_trace_instructions(true);
//! assert_eq!(config.max_call_depth, 32);
//! ```

/// Resource limits and diagnostics of one engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Capacity of the evaluation stack in bytes.
    ///
    /// Arguments of all active calls and every pushed value share this buffer.
    pub stack_capacity: usize,

    /// Maximum number of nested calls.
    pub max_call_depth: usize,

    /// Capacity of the object heap in bytes, headers included.
    ///
    /// The heap never reclaims memory.
    pub heap_capacity: usize,

    /// Log every executed instruction at `trace` level.
    pub trace_instructions: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            stack_capacity: 1024 * 1024,
            max_call_depth: 256,
            heap_capacity: 16 * 1024 * 1024,
            trace_instructions: false,
        }
    }
}

impl EngineConfig {
    /// Small limits, enough for short test programs
    #[must_use]
    pub fn minimal() -> Self {
        EngineConfig {
            stack_capacity: 16 * 1024,
            max_call_depth: 64,
            heap_capacity: 64 * 1024,
            trace_instructions: false,
        }
    }

    /// Generous limits for deeply recursive or allocation heavy programs
    #[must_use]
    pub fn extended() -> Self {
        EngineConfig {
            stack_capacity: 16 * 1024 * 1024,
            max_call_depth: 4096,
            heap_capacity: 256 * 1024 * 1024,
            trace_instructions: false,
        }
    }

    /// Set the evaluation stack capacity in bytes
    #[must_use]
    pub fn with_stack_capacity(mut self, bytes: usize) -> Self {
        self.stack_capacity = bytes;
        self
    }

    /// Set the maximum call depth
    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Set the heap capacity in bytes
    #[must_use]
    pub fn with_heap_capacity(mut self, bytes: usize) -> Self {
        self.heap_capacity = bytes;
        self
    }

    /// Enable or disable per-instruction tracing
    #[must_use]
    pub fn with_trace_instructions(mut self, enabled: bool) -> Self {
        self.trace_instructions = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_ordered() {
        let minimal = EngineConfig::minimal();
        let default = EngineConfig::default();
        let extended = EngineConfig::extended();

        assert!(minimal.stack_capacity < default.stack_capacity);
        assert!(default.stack_capacity < extended.stack_capacity);
        assert!(minimal.max_call_depth < default.max_call_depth);
        assert!(default.max_call_depth < extended.max_call_depth);
        assert!(minimal.heap_capacity < default.heap_capacity);
        assert!(!default.trace_instructions);
    }

    #[test]
    fn builder() {
        let config = EngineConfig::default()
            .with_stack_capacity(512)
            .with_max_call_depth(3)
            .with_heap_capacity(4096)
            .with_trace_instructions(true);

        assert_eq!(
            config,
            EngineConfig {
                stack_capacity: 512,
                max_call_depth: 3,
                heap_capacity: 4096,
                trace_instructions: true,
            }
        );
    }
}
