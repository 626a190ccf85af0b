// src/error.rs

/// Result type for engine construction and configuration.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while building the engine from its configuration.
///
/// Nothing on the audio or control paths can fail; these only surface at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("sample rate must be greater than zero")]
    ZeroSampleRate,

    #[error("block size must be greater than zero")]
    ZeroBlockSize,

    #[error("voice pool must hold at least one voice")]
    EmptyVoicePool,

    #[error("delay capacity must hold at least one sample")]
    ZeroDelayCapacity,

    #[error("initial delay length {length} exceeds capacity {capacity} samples")]
    DelayLengthExceedsCapacity { length: usize, capacity: usize },

    #[error("{name} must be finite and non-negative (got {value})")]
    InvalidValue { name: &'static str, value: f32 },

    #[error("controller number {0} is outside 0-127")]
    InvalidController(u8),

    #[error("controller {0} is routed more than once")]
    DuplicateController(u8),

    #[error("unknown audio channel: {0}")]
    UnknownChannel(String),

    #[error("cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration file: {0}")]
    Parse(#[from] serde_yaml::Error),
}
