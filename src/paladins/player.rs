use super::catalogs::Catalogs;
use super::conversions::{
    convert_champion_stats, convert_friends, convert_loadout, convert_player,
    convert_player_status,
};
use super::types::{
    PaladinsChampionRank, PaladinsFriend, PaladinsLoadout, PaladinsPlayer, PaladinsPlayerStatus,
};
use crate::core::errors::{classify_ret_msg, ApiError};
use crate::core::expander::{EntityExpander, EntityFetcher, Partial, ResolveState};
use crate::core::kernel::RequestDispatcher;
use crate::core::types::{
    ChampionStats, Friend, Language, Loadout, Platform, Player, PlayerStatus,
};
use futures_util::FutureExt;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

/// How a player is identified before their profile is fetched
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlayerIdentity {
    /// Player id. `0` stands for a hidden (private) account.
    Id(u64),
    Name { name: String, platform: Platform },
}

impl fmt::Display for PlayerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Name { name, platform } => write!(f, "{} ({:?})", name, platform),
        }
    }
}

fn private_error() -> ApiError {
    ApiError::PrivateProfile("Player".to_string())
}

fn has_message(ret_msg: Option<&str>) -> bool {
    ret_msg.map_or(false, |msg| !msg.trim().is_empty())
}

/// Fetch one full profile with `getplayer`.
pub(crate) async fn fetch_player(
    dispatcher: &RequestDispatcher,
    identity: &PlayerIdentity,
) -> Result<Player, ApiError> {
    let response = match identity {
        PlayerIdentity::Id(0) => return Err(private_error()),
        PlayerIdentity::Id(id) => {
            let id = id.to_string();
            dispatcher.call("getplayer", &[id.as_str()]).await?
        }
        PlayerIdentity::Name {
            name,
            platform: Platform::Unknown,
        } => dispatcher.call("getplayer", &[name.as_str()]).await?,
        PlayerIdentity::Name { name, platform } => {
            let portal = platform.value().to_string();
            dispatcher
                .call("getplayer", &[name.as_str(), portal.as_str()])
                .await?
        }
    };

    let players: Vec<PaladinsPlayer> = serde_json::from_value(response)?;
    first_profile(players)
}

// The dispatcher already classifies a lone entry's message; this covers transports
// that hand back the raw list.
fn first_profile(players: Vec<PaladinsPlayer>) -> Result<Player, ApiError> {
    let player = players
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound("Player".to_string()))?;
    if let Some(error) = player.ret_msg.as_deref().and_then(classify_ret_msg) {
        return Err(error);
    }
    Ok(convert_player(player))
}

pub(crate) fn player_fetcher(
    dispatcher: Arc<RequestDispatcher>,
) -> EntityFetcher<PlayerIdentity, Player> {
    Arc::new(move |identity| {
        let dispatcher = Arc::clone(&dispatcher);
        async move { fetch_player(&dispatcher, &identity).await }.boxed()
    })
}

/// Keep the entries of a `getplayerbatch` response that carry a profile, in `order`.
pub(crate) fn collect_batch(raw: Vec<PaladinsPlayer>, order: &[u64]) -> Vec<Player> {
    let mut players: Vec<Player> = raw
        .into_iter()
        .filter(|p| !has_message(p.ret_msg.as_deref()))
        .map(convert_player)
        .collect();
    players.sort_by_key(|p| order.iter().position(|id| *id == p.id).unwrap_or(usize::MAX));
    players
}

/// A player known only by id or name.
///
/// `resolve` fetches the full profile; concurrent resolutions of the same identity,
/// from this handle or any other, share one request.
#[derive(Debug, Clone)]
pub struct PartialPlayer {
    partial: Partial<PlayerIdentity, Player>,
    dispatcher: Arc<RequestDispatcher>,
    catalogs: Catalogs,
    private: bool,
    // what a search listing already told us
    known_name: Option<String>,
    known_platform: Platform,
}

impl PartialPlayer {
    pub(crate) fn new(
        identity: PlayerIdentity,
        expander: Arc<EntityExpander<PlayerIdentity, Player>>,
        dispatcher: Arc<RequestDispatcher>,
        catalogs: Catalogs,
    ) -> Self {
        Self {
            partial: Partial::new(identity, expander),
            dispatcher,
            catalogs,
            private: false,
            known_name: None,
            known_platform: Platform::Unknown,
        }
    }

    /// Attach what a listing reported about the player
    pub(crate) fn with_listing(
        mut self,
        name: Option<String>,
        platform: Platform,
        private: bool,
    ) -> Self {
        self.known_name = name;
        self.known_platform = platform;
        self.private = private;
        self
    }

    pub fn identity(&self) -> &PlayerIdentity {
        self.partial.identity()
    }

    /// Display name, when known without a fetch
    pub fn name(&self) -> Option<String> {
        match self.identity() {
            PlayerIdentity::Name { name, .. } => Some(name.clone()),
            PlayerIdentity::Id(_) => self
                .known_name
                .clone()
                .or_else(|| self.partial.resolved().map(|p| p.name)),
        }
    }

    /// Platform, `Unknown` until a listing or a fetch reports it
    pub fn platform(&self) -> Platform {
        match self.identity() {
            PlayerIdentity::Name { platform, .. } if *platform != Platform::Unknown => *platform,
            _ if self.known_platform != Platform::Unknown => self.known_platform,
            _ => self
                .partial
                .resolved()
                .map_or(Platform::Unknown, |p| p.platform),
        }
    }

    /// Player id, when known without a fetch
    pub fn id(&self) -> Option<u64> {
        match self.identity() {
            PlayerIdentity::Id(id) => Some(*id),
            PlayerIdentity::Name { .. } => self.partial.resolved().map(|p| p.id),
        }
    }

    /// Private profiles never reach the network
    pub fn is_private(&self) -> bool {
        self.private || matches!(self.identity(), PlayerIdentity::Id(0))
    }

    pub fn state(&self) -> ResolveState<Player> {
        self.partial.state()
    }

    pub fn resolved(&self) -> Option<Player> {
        self.partial.resolved()
    }

    /// Fetch the full profile. Every call asks the service again.
    #[instrument(skip(self), fields(player = %self.identity()))]
    pub async fn resolve(&self) -> Result<Player, ApiError> {
        if self.is_private() {
            return Err(private_error());
        }
        info!("Resolving player");
        self.partial.resolve().await
    }

    async fn player_id(&self) -> Result<u64, ApiError> {
        if self.is_private() {
            return Err(private_error());
        }
        match self.id() {
            Some(id) => Ok(id),
            None => Ok(self.resolve().await?.id),
        }
    }

    /// Fetch what the player is doing right now
    #[instrument(skip(self), fields(player = %self.identity()))]
    pub async fn get_status(&self) -> Result<PlayerStatus, ApiError> {
        let id = self.player_id().await?;
        let id_param = id.to_string();
        let response = self
            .dispatcher
            .call("getplayerstatus", &[id_param.as_str()])
            .await?;
        let statuses: Vec<PaladinsPlayerStatus> = serde_json::from_value(response)?;
        statuses
            .into_iter()
            .next()
            .and_then(|status| convert_player_status(id, status))
            .ok_or_else(|| ApiError::NotFound("Player status".to_string()))
    }

    /// Fetch the player's accepted friends
    #[instrument(skip(self), fields(player = %self.identity()))]
    pub async fn get_friends(&self) -> Result<Vec<Friend>, ApiError> {
        let id = self.player_id().await?.to_string();
        let response = self.dispatcher.call("getfriends", &[id.as_str()]).await?;
        let friends: Vec<PaladinsFriend> = serde_json::from_value(response)?;
        Ok(convert_friends(friends))
    }

    /// Fetch the player's saved loadouts, joined with the catalogs of `language`.
    ///
    /// Cards missing from the catalog keep their id and name with `card: None`.
    #[instrument(skip(self), fields(player = %self.identity()))]
    pub async fn get_loadouts(&self, language: Option<Language>) -> Result<Vec<Loadout>, ApiError> {
        let id = self.player_id().await?;
        let language = self.catalogs.language(language);
        let (champions, devices) = self.catalogs.both(Some(language)).await?;

        let id_param = id.to_string();
        let language_param = language.value().to_string();
        let response = self
            .dispatcher
            .call(
                "getplayerloadouts",
                &[id_param.as_str(), language_param.as_str()],
            )
            .await?;
        let raw: Vec<PaladinsLoadout> = serde_json::from_value(response)?;
        if raw.first().map_or(true, |loadout| loadout.player_id == 0) {
            return Ok(Vec::new());
        }
        Ok(raw
            .into_iter()
            .map(|loadout| convert_loadout(loadout, language, &champions, &devices))
            .collect())
    }

    /// Fetch the player's per-champion records
    #[instrument(skip(self), fields(player = %self.identity()))]
    pub async fn get_champion_stats(
        &self,
        language: Option<Language>,
    ) -> Result<Vec<ChampionStats>, ApiError> {
        let id = self.player_id().await?;
        let champions = self.catalogs.champions(language).await?;
        let id_param = id.to_string();
        let response = self
            .dispatcher
            .call("getgodranks", &[id_param.as_str()])
            .await?;
        let raw: Vec<PaladinsChampionRank> = serde_json::from_value(response)?;
        Ok(raw
            .into_iter()
            .map(|stats| convert_champion_stats(id, stats, &champions))
            .collect())
    }
}

impl PartialEq for PartialPlayer {
    /// Hidden accounts share id `0` and never compare equal.
    fn eq(&self, other: &Self) -> bool {
        !self.is_private() && !other.is_private() && self.identity() == other.identity()
    }
}
