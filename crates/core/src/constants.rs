/// Constants used throughout the gaitstore workspace
// File and directory names inside the data directory
pub const DATABASE_FILENAME: &str = "gaitstore.db";
pub const STORAGE_DIRNAME: &str = "storage";
pub const BACKUPS_DIRNAME: &str = "backups";
pub const MANIFEST_FILENAME: &str = "manifest.json";
pub const CONFIG_FILENAME: &str = "config.json";
pub const APP_DIRNAME: &str = "gaitstore";

// Storage suffixes
pub const METADATA_SUFFIX: &str = ".meta.json";
/// Keys ending here would share a file with another key's sidecar
pub const RESERVED_KEY_SUFFIX: &str = ".meta";
pub const TEMP_FILE_PREFIX: &str = ".tmp-";

// Namespace used by the file tier of the result cache
pub const POSE_RESULTS_NAMESPACE: &str = "pose_results";

// Cache expiry
pub const DEFAULT_CACHE_TTL_DAYS: u64 = 7;
pub const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

// Backup retention
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

// Environment variable names
pub const GAITSTORE_DATA_DIR_VAR: &str = "GAITSTORE_DATA_DIR";
pub const GAITSTORE_DATABASE_VAR: &str = "GAITSTORE_DATABASE";
pub const GAITSTORE_CACHE_TTL_DAYS_VAR: &str = "GAITSTORE_CACHE_TTL_DAYS";
pub const GAITSTORE_BACKUP_DIR_VAR: &str = "GAITSTORE_BACKUP_DIR";
pub const GAITSTORE_BACKUP_RETENTION_DAYS_VAR: &str = "GAITSTORE_BACKUP_RETENTION_DAYS";
pub const GAITSTORE_DEFAULT_BACKEND_VAR: &str = "GAITSTORE_DEFAULT_BACKEND";

// Storage backend names
pub const JSON_BACKEND: &str = "json";
pub const BINARY_BACKEND: &str = "binary";
pub const KNOWN_BACKENDS: &[&str] = &[JSON_BACKEND, BINARY_BACKEND];
