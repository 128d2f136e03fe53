use std::ops::Deref;

use mrlens_api::http::HttpApiOptions;
use mrlens_config_derive::AppConfig;

#[derive(AppConfig, Clone, Debug)]
pub struct InnerApplicationConfig {
    #[config(default = "http://localhost:8000/api")]
    pub api_url: String,
}

#[derive(Clone, Debug)]
pub struct ApplicationConfig {
    config: InnerApplicationConfig,
}

impl ApplicationConfig {
    pub fn new(args: inner_application_config::InnerApplicationConfig) -> anyhow::Result<Self> {
        if let Some(path) = args.config_file.as_ref() {
            tracing::debug!("config file: {}", path.display());
        }

        let config = InnerApplicationConfig::from(args)?;
        tracing::debug!(api_url = %config.api_url, "resolved application config");

        Ok(Self { config })
    }

    pub fn api_options(&self) -> HttpApiOptions {
        HttpApiOptions::with_uri(self.api_url.trim_end_matches('/'))
    }
}

impl Deref for ApplicationConfig {
    type Target = InnerApplicationConfig;

    fn deref(&self) -> &Self::Target {
        &self.config
    }
}
