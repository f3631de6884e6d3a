use super::builder::PaladinsApiBuilder;
use super::catalogs::Catalogs;
use super::conversions::{convert_data_used, convert_listing, convert_server_status, PlayerListing};
use super::player::{collect_batch, PartialPlayer, PlayerIdentity};
use super::types::{
    PaladinsDataUsed, PaladinsPatchInfo, PaladinsPlayer, PaladinsPlayerSearch,
    PaladinsServerStatus,
};
use crate::core::config::ClientConfig;
use crate::core::errors::ApiError;
use crate::core::expander::EntityExpander;
use crate::core::kernel::RequestDispatcher;
use crate::core::types::{
    Champion, DataUsed, Device, DeviceType, Language, Platform, Player, ServerStatus,
};
use crate::utils::{find, Lookup, LookupKey};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Maximum number of ids `getplayerbatch` accepts per request
pub const PLAYER_BATCH_SIZE: usize = 20;

/// Platforms whose names are looked up with `getplayeridbyname`
pub const PC_PLATFORMS: [Platform; 3] = [Platform::PC, Platform::Steam, Platform::Discord];

/// Options for `PaladinsApi::search_players`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSearch {
    /// Restrict results to one platform
    pub platform: Option<Platform>,
    /// Match the whole name, ignoring case. `false` matches by prefix.
    pub exact: bool,
    pub include_private: bool,
}

impl Default for PlayerSearch {
    fn default() -> Self {
        Self {
            platform: None,
            exact: true,
            include_private: true,
        }
    }
}

impl PlayerSearch {
    pub fn on(platform: Platform) -> Self {
        Self {
            platform: Some(platform),
            ..Self::default()
        }
    }

    pub fn prefix(mut self) -> Self {
        self.exact = false;
        self
    }

    pub fn public_only(mut self) -> Self {
        self.include_private = false;
        self
    }
}

/// Client for the Paladins statistics API.
///
/// Owns the dispatcher (session, rate limits, transport), the per-language champion
/// and device catalogs, and the player expander. Cheap handles such as
/// `PartialPlayer` keep the pieces they need alive on their own.
#[derive(Debug)]
pub struct PaladinsApi {
    pub(crate) dispatcher: Arc<RequestDispatcher>,
    pub(crate) catalogs: Catalogs,
    pub(crate) players: Arc<EntityExpander<PlayerIdentity, Player>>,
}

impl PaladinsApi {
    /// Create a client with the default reqwest transport
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        PaladinsApiBuilder::new(config).build()
    }

    pub fn builder(config: ClientConfig) -> PaladinsApiBuilder {
        PaladinsApiBuilder::new(config)
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    /// Language used when none is passed explicitly
    pub fn default_language(&self) -> Language {
        self.catalogs.default_language()
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    /// Make a raw API call and return the decoded body
    pub async fn request(&self, method_name: &str, params: &[&str]) -> Result<Value, ApiError> {
        self.dispatcher.call(method_name, params).await
    }

    pub async fn ping(&self) -> Result<String, ApiError> {
        self.dispatcher.ping().await
    }

    /// Ask the service whether the current session is accepted
    #[instrument(skip(self))]
    pub async fn test_session(&self) -> Result<bool, ApiError> {
        let response = self.dispatcher.call("testsession", &[]).await?;
        Ok(response
            .as_str()
            .map_or(false, |text| text.to_lowercase().contains("successful")))
    }

    /// Open a session and load both catalogs for `language`.
    #[instrument(skip(self))]
    pub async fn initialize(&self, language: Option<Language>) -> Result<(), ApiError> {
        let language = self.catalogs.language(language);
        self.dispatcher.sessions().ensure_valid_session().await?;
        self.catalogs.both(Some(language)).await?;
        info!(%language, "Client initialized");
        Ok(())
    }

    /// Current game version string
    pub async fn get_patch_info(&self) -> Result<String, ApiError> {
        let response = self.dispatcher.call("getpatchinfo", &[]).await?;
        let info: PaladinsPatchInfo = serde_json::from_value(response)?;
        Ok(info.version_string)
    }

    /// Status of every platform's game servers
    pub async fn get_server_status(&self) -> Result<Vec<ServerStatus>, ApiError> {
        let response = self.dispatcher.call("gethirezserverstatus", &[]).await?;
        let statuses: Vec<PaladinsServerStatus> = serde_json::from_value(response)?;
        Ok(statuses.into_iter().map(convert_server_status).collect())
    }

    /// Developer quota usage. Also raises the local daily counter to the reported figure.
    #[instrument(skip(self))]
    pub async fn get_data_used(&self) -> Result<DataUsed, ApiError> {
        let response = self.dispatcher.call("getdataused", &[]).await?;
        let entries: Vec<PaladinsDataUsed> = serde_json::from_value(response)?;
        let data = entries
            .into_iter()
            .next()
            .map(convert_data_used)
            .ok_or_else(|| ApiError::MalformedResponse("Empty getdataused response".into()))?;

        self.dispatcher
            .limiter()
            .sync_daily_usage(data.total_requests_today)
            .await;
        if data.remaining_requests() == 0 {
            warn!("Daily request limit reported as spent");
        }
        Ok(data)
    }

    pub async fn get_champions(&self, language: Option<Language>) -> Result<Arc<[Champion]>, ApiError> {
        self.catalogs.champions(language).await
    }

    pub async fn get_devices(&self, language: Option<Language>) -> Result<Arc<[Device]>, ApiError> {
        self.catalogs.devices(language).await
    }

    /// Re-fetch both catalogs for `language`
    #[instrument(skip(self))]
    pub async fn refresh_reference_data(&self, language: Option<Language>) -> Result<(), ApiError> {
        self.catalogs.refresh(language).await
    }

    /// Find a champion by id or name
    ///
    /// # Arguments
    /// * `key` - Champion id or name
    /// * `language` - Catalog language, the client default when `None`
    /// * `fuzzy` - Ignore case when matching names
    pub async fn get_champion<'k>(
        &self,
        key: impl Into<LookupKey<'k>>,
        language: Option<Language>,
        fuzzy: bool,
    ) -> Result<Option<Champion>, ApiError> {
        let key = key.into();
        let champions = self.get_champions(language).await?;
        Ok(Lookup::new(&champions).get(key, fuzzy).cloned())
    }

    /// Find a device by id or name, optionally restricted to one kind
    pub async fn get_device<'k>(
        &self,
        key: impl Into<LookupKey<'k>>,
        device_type: Option<DeviceType>,
        language: Option<Language>,
        fuzzy: bool,
    ) -> Result<Option<Device>, ApiError> {
        let key = key.into();
        let devices = self.get_devices(language).await?;
        let found = find(
            devices
                .iter()
                .filter(|device| device_type.map_or(true, |t| device.device_type == t)),
            key,
            fuzzy,
        );
        Ok(found.cloned())
    }

    fn partial(&self, identity: PlayerIdentity) -> PartialPlayer {
        PartialPlayer::new(
            identity,
            Arc::clone(&self.players),
            Arc::clone(&self.dispatcher),
            self.catalogs.clone(),
        )
    }

    fn listed_player(&self, listing: PlayerListing) -> PartialPlayer {
        self.partial(PlayerIdentity::Id(listing.id))
            .with_listing(listing.name, listing.platform, listing.private)
    }

    /// Wrap a player id without fetching anything
    pub fn wrap_player(&self, player_id: u64) -> PartialPlayer {
        self.partial(PlayerIdentity::Id(player_id))
    }

    /// Wrap a player name without fetching anything
    pub fn wrap_player_by_name(&self, name: impl Into<String>, platform: Platform) -> PartialPlayer {
        self.partial(PlayerIdentity::Name {
            name: name.into(),
            platform,
        })
    }

    /// Find players by name.
    ///
    /// An exact search on one platform asks that platform's id lookup; everything else
    /// goes through `searchplayers` and is filtered here. Fails with `NotFound` when
    /// nothing is left.
    #[instrument(skip(self))]
    pub async fn search_players(
        &self,
        player_name: &str,
        search: PlayerSearch,
    ) -> Result<Vec<PartialPlayer>, ApiError> {
        let listings: Vec<PlayerListing> = match search.platform {
            Some(platform) if search.exact => {
                let response = if PC_PLATFORMS.contains(&platform) {
                    self.dispatcher
                        .call("getplayeridbyname", &[player_name])
                        .await?
                } else {
                    let portal = platform.value().to_string();
                    self.dispatcher
                        .call("getplayeridsbygamertag", &[portal.as_str(), player_name])
                        .await?
                };
                let raw: Vec<PaladinsPlayerSearch> = serde_json::from_value(response)?;
                raw.into_iter().map(convert_listing).collect()
            }
            _ => {
                let response = self
                    .dispatcher
                    .call("searchplayers", &[player_name])
                    .await?;
                let raw: Vec<PaladinsPlayerSearch> = serde_json::from_value(response)?;
                let wanted = player_name.to_lowercase();
                raw.into_iter()
                    .map(convert_listing)
                    .filter(|listing| {
                        !search.exact
                            || listing
                                .name
                                .as_deref()
                                .map_or(false, |name| name.to_lowercase() == wanted)
                    })
                    .filter(|listing| search.platform.map_or(true, |p| listing.platform == p))
                    .collect()
            }
        };

        let players: Vec<PartialPlayer> = listings
            .into_iter()
            .filter(|listing| search.include_private || !listing.private)
            .map(|listing| self.listed_player(listing))
            .collect();
        if players.is_empty() {
            return Err(ApiError::NotFound("Player".to_string()));
        }
        info!(count = players.len(), "Players found");
        Ok(players)
    }

    /// Find the profile linked to a platform account, e.g. a Steam id
    #[instrument(skip(self))]
    pub async fn get_from_platform(
        &self,
        platform_id: u64,
        platform: Platform,
    ) -> Result<PartialPlayer, ApiError> {
        let portal = platform.value().to_string();
        let account = platform_id.to_string();
        let response = self
            .dispatcher
            .call(
                "getplayeridbyportaluserid",
                &[portal.as_str(), account.as_str()],
            )
            .await?;
        let raw: Vec<PaladinsPlayerSearch> = serde_json::from_value(response)?;
        raw.into_iter()
            .map(convert_listing)
            .find(|listing| listing.id != 0)
            .map(|listing| self.listed_player(listing))
            .ok_or_else(|| ApiError::NotFound("Linked profile".to_string()))
    }

    /// Fetch one full profile
    pub async fn get_player(&self, player_id: u64) -> Result<Player, ApiError> {
        self.wrap_player(player_id).resolve().await
    }

    /// Fetch many profiles, `PLAYER_BATCH_SIZE` per request.
    ///
    /// Duplicate and zero ids are dropped. Private or missing profiles are left out;
    /// the rest keep the order of `player_ids`.
    #[instrument(skip(self, player_ids))]
    pub async fn get_players(
        &self,
        player_ids: impl IntoIterator<Item = u64>,
    ) -> Result<Vec<Player>, ApiError> {
        let mut seen = HashSet::new();
        let ids: Vec<u64> = player_ids
            .into_iter()
            .filter(|id| *id != 0 && seen.insert(*id))
            .collect();

        let mut players = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(PLAYER_BATCH_SIZE) {
            let joined = chunk
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let response = match self.dispatcher.call("getplayerbatch", &[joined.as_str()]).await {
                Ok(response) => response,
                // a one-element batch surfaces its entry's message as the call's error
                Err(ApiError::PrivateProfile(_) | ApiError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            let raw: Vec<PaladinsPlayer> = serde_json::from_value(response)?;
            players.extend(collect_batch(raw, chunk));
        }
        Ok(players)
    }

    /// Release the session, the connection pool and the catalogs.
    ///
    /// Later calls fail with `ClientClosed`.
    pub async fn close(&self) {
        self.catalogs.close();
        self.dispatcher.close().await;
        info!("Client closed");
    }

    pub fn is_closed(&self) -> bool {
        self.dispatcher.is_closed()
    }
}
