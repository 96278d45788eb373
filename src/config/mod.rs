//! Configuration: vault location, password source, log level.

pub mod settings;

pub use settings::{
    app_data_dir, default_config_path, Settings, APP_DIR_NAME, DEFAULT_PASSWORD_ENV,
    VAULT_FILE_ENV,
};
