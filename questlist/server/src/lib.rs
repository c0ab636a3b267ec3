pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        #[serde(default = "default_port")]
        pub port: u16,
        #[serde(default = "default_environment")]
        pub environment: String,
        #[serde(default = "default_cors_origin")]
        pub cors_origin: String,
        #[serde(default = "default_log_level")]
        pub log_level: String,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(config::Environment::default())
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                port: default_port(),
                environment: default_environment(),
                cors_origin: default_cors_origin(),
                log_level: default_log_level(),
            }
        }
    }

    fn default_port() -> u16 {
        3000
    }

    fn default_environment() -> String {
        "development".to_string()
    }

    fn default_cors_origin() -> String {
        "*".to_string()
    }

    fn default_log_level() -> String {
        "info".to_string()
    }

}
pub mod category;
pub mod error;
pub mod store;
pub mod task;
pub mod validation;
pub mod web;
