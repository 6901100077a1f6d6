//! Server sizing and operational configuration.
//!
//! Hardcoded defaults mirror spec §6; all are overridable from the CLI (see
//! `Args` in `main.rs`). Protocol-adjacent constants (header caps, opcodes)
//! live in `constants`.

/// Default ring depth (submission queue entries).
pub const DEFAULT_QUEUE_DEPTH: u32 = 256;

/// Default per-buffer size in the pool (bytes).
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Default number of buffers in the pool.
pub const DEFAULT_BUFFER_COUNT: usize = 1024;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

/// Listen backlog for the TCP socket.
pub const LISTEN_BACKLOG: i32 = 1024;

/// Resolved server configuration, built from CLI args or defaults.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub queue_depth: u32,
    pub buffer_size: usize,
    pub buffer_count: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            buffer_size: DEFAULT_BUFFER_SIZE,
            buffer_count: DEFAULT_BUFFER_COUNT,
        }
    }
}

// Compile-time sanity checks on the defaults; CLI-supplied values are
// validated at runtime by `ServerConfig::validate`.
const _: () = assert!(
    DEFAULT_BUFFER_COUNT <= u16::MAX as usize,
    "buffer indices are u16"
);
const _: () = assert!(
    DEFAULT_QUEUE_DEPTH.is_power_of_two(),
    "sq_entries must be a power of two"
);

/// Error returned when CLI-supplied sizing is out of range.
#[derive(Debug, Clone, Copy)]
pub enum ConfigError {
    BufferCountTooLarge { requested: usize, max: usize },
    QueueDepthNotPowerOfTwo(u32),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::BufferCountTooLarge { requested, max } => write!(
                f,
                "buffer_count {} exceeds maximum {} (buffer indices are u16)",
                requested, max
            ),
            ConfigError::QueueDepthNotPowerOfTwo(v) => {
                write!(f, "queue_depth {} must be a power of two", v)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_count > u16::MAX as usize {
            return Err(ConfigError::BufferCountTooLarge {
                requested: self.buffer_count,
                max: u16::MAX as usize,
            });
        }
        if !self.queue_depth.is_power_of_two() {
            return Err(ConfigError::QueueDepthNotPowerOfTwo(self.queue_depth));
        }
        Ok(())
    }
}
