// Storage unit namespace; units whose name lacks this prefix are ignored
pub const UNIT_NAME_PREFIX: &str = "mydriveos-";

// Hard ceiling applied to every storage unit (bytes)
pub const MAX_CONTAINER_SIZE: u64 = 1024 * 1024 * 1024;

// Mount point of the unit's persistent volume inside the sandbox
pub const UNIT_STORAGE_PATH: &str = "/app/storage";

pub const DEFAULT_UNIT_IMAGE: &str = "alpine";

// Foreground command that keeps an otherwise idle sandbox running
pub const KEEPALIVE_CMD: [&str; 3] = ["tail", "-f", "/dev/null"];

pub const VOLUME_SUFFIX: &str = "-volume";
