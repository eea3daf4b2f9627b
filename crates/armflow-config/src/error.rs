use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config directory not found")]
    ConfigDirNotFound,

    #[error(
        "provider configuration not found. Looked in:\n\
        - ARMFLOW_CONFIG_PATH\n\
        - current directory: armflow.local.yaml, armflow.yaml\n\
        - ./.armflow/armflow.yaml\n\
        - ~/.config/armflow/armflow.yaml"
    )]
    ProviderFileNotFound,

    #[error("invalid provider configuration in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
