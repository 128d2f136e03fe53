use std::{ops::Deref, sync::Arc};

use crate::http::{HttpApi, HttpApiOptions};
use crate::traits::{ProjectSource, ReviewActions};

pub mod errors;
pub mod http;
pub mod models;
pub mod traits;

pub trait Provider: ProjectSource + ReviewActions {}

/// Cheap to clone handle over whichever backend implementation is in use.
#[derive(Clone)]
pub struct ApiProvider {
    provider: Arc<dyn Provider>,
}

impl ApiProvider {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    pub fn http(options: HttpApiOptions) -> anyhow::Result<Self> {
        tracing::debug!(uri = %options.uri, "using http api");
        let api = Arc::new(HttpApi::new(options)?);

        Ok(Self { provider: api })
    }
}

impl Deref for ApiProvider {
    type Target = Arc<dyn Provider>;

    fn deref(&self) -> &Self::Target {
        &self.provider
    }
}
