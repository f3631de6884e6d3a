use crate::core::cache::{CacheKey, ReferenceDataCache};
use crate::core::errors::ApiError;
use crate::core::types::{Category, Champion, Device, Language};
use std::sync::Arc;

/// Champion and device catalogs, shared by the client and every player handle.
///
/// Clones share the same caches.
#[derive(Debug, Clone)]
pub struct Catalogs {
    champions: Arc<ReferenceDataCache<Champion>>,
    devices: Arc<ReferenceDataCache<Device>>,
    language: Language,
}

impl Catalogs {
    pub(crate) fn new(
        champions: ReferenceDataCache<Champion>,
        devices: ReferenceDataCache<Device>,
        language: Language,
    ) -> Self {
        Self {
            champions: Arc::new(champions),
            devices: Arc::new(devices),
            language,
        }
    }

    pub fn default_language(&self) -> Language {
        self.language
    }

    /// `language`, or the default when `None`
    pub fn language(&self, language: Option<Language>) -> Language {
        language.unwrap_or(self.language)
    }

    pub async fn champions(&self, language: Option<Language>) -> Result<Arc<[Champion]>, ApiError> {
        let key = CacheKey::new(Category::Champions, self.language(language));
        self.champions.get(key).await
    }

    pub async fn devices(&self, language: Option<Language>) -> Result<Arc<[Device]>, ApiError> {
        let key = CacheKey::new(Category::Devices, self.language(language));
        self.devices.get(key).await
    }

    /// Both catalogs, fetched concurrently
    pub async fn both(
        &self,
        language: Option<Language>,
    ) -> Result<(Arc<[Champion]>, Arc<[Device]>), ApiError> {
        tokio::try_join!(self.champions(language), self.devices(language))
    }

    pub async fn refresh(&self, language: Option<Language>) -> Result<(), ApiError> {
        let language = self.language(language);
        tokio::try_join!(
            self.champions
                .refresh(CacheKey::new(Category::Champions, language)),
            self.devices
                .refresh(CacheKey::new(Category::Devices, language)),
        )?;
        Ok(())
    }

    pub(crate) fn close(&self) {
        self.champions.close();
        self.devices.close();
    }
}
