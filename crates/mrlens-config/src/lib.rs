use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "MRLENS_";
pub const CONFIG_HOME_ENV: &str = "MRLENS_CONFIG_HOME";
pub const CONFIG_FILE_NAME: &str = "mrlens.kdl";

#[derive(thiserror::Error, Debug)]
pub enum EnvError {
    #[error("invalid environment config: {0}")]
    EnvError(#[source] anyhow::Error),
}

pub trait Env {
    fn set_from_env(&mut self) -> Result<(), EnvError>;
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigFileError {
    #[error("unusable config file: {0}")]
    ConfigFileError(#[source] anyhow::Error),
}

pub trait ConfigFile {
    fn set_from_config_file(&mut self, config_file: &Path) -> Result<(), ConfigFileError>;
}

/// `$MRLENS_CONFIG_HOME`, else the platform config dir, else `./.config`.
pub fn config_home() -> PathBuf {
    std::env::var(CONFIG_HOME_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            directories::ProjectDirs::from("io", "mrlens", "mrlens")
                .map(|p| p.config_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".").join(".config"))
        })
}

pub fn default_config_file() -> PathBuf {
    config_home().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_config_file_uses_config_home() {
        std::env::set_var(CONFIG_HOME_ENV, "/tmp/mrlens-test-home");

        assert_eq!(
            default_config_file(),
            PathBuf::from("/tmp/mrlens-test-home/mrlens.kdl")
        );

        std::env::remove_var(CONFIG_HOME_ENV);
    }
}
