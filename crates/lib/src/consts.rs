/// Name used for the binary, config file and remedy hints.
pub const APP_NAME: &str = "clangbox";

/// Project config file looked up in the build context directory.
pub const CONFIG_FILE_NAME: &str = "clangbox.toml";

/// Environment variable naming an explicit project config file.
pub const CONFIG_ENV_VAR: &str = "CLANGBOX_CONFIG";

/// Longest full image tag (`<image>:<version><suffix>`) a stage may produce.
pub const MAX_TAG_LEN: usize = 128;

/// File listing context paths that are not sent to the engine.
pub const IGNORE_FILE_NAME: &str = ".dockerignore";
