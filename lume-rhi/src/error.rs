//! Error taxonomy for the device/resource/shader/command-buffer boundary (spec §4.9).
//!
//! New subsystems added against this crate (the fence arbiter, the descriptor pool
//! chain, `EngineConfig` validation) return these directly. The existing Vulkan
//! backend predates this taxonomy and still threads `String` through its internal
//! helpers; bridging it fully is tracked in `DESIGN.md` rather than done as a mass
//! rename across files with no behavioral change.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no suitable physical device found")]
    NoSuitablePhysicalDevice,
    #[error("required extension missing: {0}")]
    MissingExtension(String),
    #[error("instance creation failed: {0}")]
    InstanceCreation(String),
    #[error("device creation failed: {0}")]
    DeviceCreation(String),
}

impl From<String> for DeviceError {
    fn from(s: String) -> Self {
        DeviceError::DeviceCreation(s)
    }
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("out of memory")]
    OutOfMemory,
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("allocation failed: {0}")]
    AllocationFailed(String),
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("invalid SPIR-V module")]
    InvalidSpirv,
    #[error("push constant block of {requested} bytes exceeds device limit of {limit} bytes")]
    PushConstantTooLarge { requested: u32, limit: u32 },
    #[error("workgroup size {requested:?} exceeds device limit {limit:?}")]
    WorkgroupSizeExceeded { requested: [u32; 3], limit: [u32; 3] },
}

#[derive(Debug, Error)]
pub enum CommandBufferError {
    #[error("command encoder was not finished before submission")]
    EncoderNotFinished,
    #[error("queue submit failed: {0}")]
    SubmitFailed(String),
    #[error("no fence available from the fence arbiter")]
    FenceAcquisitionFailed,
}
