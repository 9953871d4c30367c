use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FermatError {
    #[error("Invalid particle count {0} (expected 1..={})", u32::MAX)]
    InvalidParticleCount(i64),

    #[error("Failed to allocate {requested} bytes of particle storage: {reason}")]
    AllocationFailure { requested: u64, reason: String },

    #[error("Parameter `{name}` must be finite")]
    NonFiniteParameter { name: &'static str },

    #[error("Invalid time step {0}: must be finite and non-negative")]
    InvalidTimeStep(f32),

    #[error("Render observed a dispatch that was never synchronized")]
    MisorderedCall,

    #[error("No compatible GPU adapter found")]
    NoAdapter,

    #[error("Failed to request device: {0}")]
    DeviceRequest(String),

    #[error("Surface error: {0}")]
    Surface(String),

    #[error("Failed to read particles back from the device: {0}")]
    Readback(String),
}

pub type Result<T> = std::result::Result<T, FermatError>;
