pub mod allocator;
pub mod api;
pub mod config;
pub mod loader;
pub mod model;
pub mod report;
pub mod types;

pub use allocator::{
    AllocationError, AllocationRequest, AllocationResult, AllocatorConfig, allocate,
    allocate_with_config, allocate_with_progress,
};
pub use model::{Collection, PinSet};
