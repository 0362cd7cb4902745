//! Environment variable source: SITESYNC__ prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Add environment variable overlay to builder.
///
/// `SITESYNC__RECONCILER__MAX_FILE_SIZE_BYTES=1048576` sets
/// `reconciler.max_file_size_bytes`; glob lists are comma separated.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = builder.add_source(
        Environment::with_prefix("SITESYNC")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("reconciler.extra_ignore_globs")
            .with_list_parse_key("reconciler.permission_file_names"),
    );
    Ok(builder)
}
