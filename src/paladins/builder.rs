use super::catalogs::Catalogs;
use super::client::PaladinsApi;
use super::conversions::{convert_champion, convert_device};
use super::player::player_fetcher;
use super::types::{PaladinsChampion, PaladinsDevice};
use crate::core::cache::{CacheKey, ReferenceDataCache, ReferenceFetcher};
use crate::core::config::ClientConfig;
use crate::core::errors::ApiError;
use crate::core::expander::EntityExpander;
use crate::core::kernel::{
    DispatcherConfig, HttpTransport, Md5Signer, RateLimits, RequestDispatcher, RestClientBuilder,
    RestClientConfig, RetryPolicy, SessionPolicy, Signer,
};
use crate::core::types::Language;
use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Build a catalog fetcher that calls the category's method with the language code
/// and converts every entry, dropping the ones `convert` rejects.
fn catalog_fetcher<T, R, F>(dispatcher: Arc<RequestDispatcher>, convert: F) -> ReferenceFetcher<T>
where
    T: Send + 'static,
    R: DeserializeOwned + Send + 'static,
    F: Fn(R, Language) -> Option<T> + Copy + Send + Sync + 'static,
{
    Arc::new(move |key: CacheKey| {
        let dispatcher = Arc::clone(&dispatcher);
        async move {
            let language = key.language.value().to_string();
            let response = dispatcher
                .call(key.category.method_name(), &[language.as_str()])
                .await?;
            let raw: Vec<R> = serde_json::from_value(response)?;
            let items: Vec<T> = raw
                .into_iter()
                .filter_map(|entry| convert(entry, key.language))
                .collect();
            debug!(category = ?key.category, count = items.len(), "Catalog decoded");
            Ok(items)
        }
        .boxed()
    })
}

/// Assembles a `PaladinsApi` from a `ClientConfig`.
///
/// The transport and signer can be swapped, which is how tests run the full client
/// against an in-memory service.
pub struct PaladinsApiBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    signer: Option<Arc<dyn Signer>>,
}

impl PaladinsApiBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            signer: None,
        }
    }

    /// Use a custom transport instead of the pooled reqwest client
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn build(self) -> Result<PaladinsApi, ApiError> {
        let config = self.config;
        config.validate()?;

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                RestClientBuilder::new(
                    RestClientConfig::default().with_timeout(config.response_timeout),
                )
                .build()?,
            ),
        };
        let signer: Arc<dyn Signer> = match self.signer {
            Some(signer) => signer,
            None => Arc::new(Md5Signer::new(
                config.developer_id.clone(),
                config.auth_key(),
            )),
        };

        let dispatcher = Arc::new(RequestDispatcher::new(
            DispatcherConfig {
                base_url: config.effective_base_url().to_string(),
                retry: RetryPolicy {
                    max_retries: config.max_retries,
                    base_delay: config.retry_base_delay,
                    ..RetryPolicy::default()
                },
                session: SessionPolicy {
                    idle_timeout: config.session_timeout,
                    max_age: config.session_max_age,
                },
                limits: RateLimits::new(config.requests_per_minute, config.requests_per_day),
            },
            transport,
            signer,
        )?);

        let champions = ReferenceDataCache::new(
            catalog_fetcher(Arc::clone(&dispatcher), |raw: PaladinsChampion, language| {
                Some(convert_champion(raw, language))
            }),
            config.cache_enabled,
            config.cache_ttl,
        );
        let devices = ReferenceDataCache::new(
            catalog_fetcher(Arc::clone(&dispatcher), |raw: PaladinsDevice, _| {
                convert_device(raw)
            }),
            config.cache_enabled,
            config.cache_ttl,
        );
        let players = Arc::new(EntityExpander::new(player_fetcher(Arc::clone(&dispatcher))));

        debug!(
            base_url = config.effective_base_url(),
            language = %config.language,
            cache_enabled = config.cache_enabled,
            "Client built"
        );

        Ok(PaladinsApi {
            dispatcher,
            catalogs: Catalogs::new(champions, devices, config.language),
            players,
        })
    }
}
