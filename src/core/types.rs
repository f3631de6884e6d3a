use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Response language for catalog and loadout data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    English,
    German,
    French,
    Chinese,
    Spanish,
    Portuguese,
    Russian,
    Polish,
    Turkish,
}

impl Language {
    pub const ALL: [Self; 9] = [
        Self::English,
        Self::German,
        Self::French,
        Self::Chinese,
        Self::Spanish,
        Self::Portuguese,
        Self::Russian,
        Self::Polish,
        Self::Turkish,
    ];

    /// Numeric code the service expects as a request parameter.
    pub const fn value(self) -> u8 {
        match self {
            Self::English => 1,
            Self::German => 2,
            Self::French => 3,
            Self::Chinese => 5,
            Self::Spanish => 9,
            Self::Portuguese => 10,
            Self::Russian => 11,
            Self::Polish => 12,
            Self::Turkish => 13,
        }
    }

    pub fn from_value(value: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|l| i64::from(l.value()) == value)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(value) = s.parse::<i64>() {
            return Self::from_value(value).ok_or_else(|| format!("Unknown language code: {}", s));
        }
        match s.trim().to_lowercase().as_str() {
            "english" | "en" | "eng" => Ok(Self::English),
            "german" | "de" | "ger" => Ok(Self::German),
            "french" | "fr" | "fre" => Ok(Self::French),
            "chinese" | "zh" | "chi" => Ok(Self::Chinese),
            "spanish" | "es" | "spa" => Ok(Self::Spanish),
            "portuguese" | "pt" | "por" => Ok(Self::Portuguese),
            "russian" | "ru" | "rus" => Ok(Self::Russian),
            "polish" | "pl" | "pol" => Ok(Self::Polish),
            "turkish" | "tr" | "tur" => Ok(Self::Turkish),
            _ => Err(format!("Unknown language: {}", s)),
        }
    }
}

/// A player's account platform (the service calls it a "portal").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Platform {
    #[default]
    Unknown,
    PC,
    Steam,
    PS4,
    Xbox,
    Facebook,
    Google,
    Mixer,
    Switch,
    Discord,
    EpicGames,
}

impl Platform {
    /// Portal id used by the service.
    pub const fn value(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::PC => 1,
            Self::Steam => 5,
            Self::PS4 => 9,
            Self::Xbox => 10,
            Self::Facebook => 12,
            Self::Google => 13,
            Self::Mixer => 14,
            Self::Switch => 22,
            Self::Discord => 25,
            Self::EpicGames => 28,
        }
    }

    /// Unrecognised portal ids map to `Unknown`.
    pub fn from_value(value: i64) -> Self {
        match value {
            1 => Self::PC,
            5 => Self::Steam,
            9 => Self::PS4,
            10 => Self::Xbox,
            12 => Self::Facebook,
            13 => Self::Google,
            14 => Self::Mixer,
            22 => Self::Switch,
            25 => Self::Discord,
            28 => Self::EpicGames,
            _ => Self::Unknown,
        }
    }

    /// Accepts either the numeric portal id or a name/alias; falls back to `Unknown`.
    pub fn parse_lenient(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(value) = raw.parse::<i64>() {
            return Self::from_value(value);
        }
        match raw.to_lowercase().replace([' ', '-'], "_").as_str() {
            "pc" | "hirez" | "standalone" => Self::PC,
            "steam" => Self::Steam,
            "ps4" | "psn" | "playstation" => Self::PS4,
            "xbox" | "xb" | "xboxlive" | "xbox_live" | "xboxone" | "xbox_one" | "xbox1" => {
                Self::Xbox
            }
            "facebook" | "fb" => Self::Facebook,
            "google" => Self::Google,
            "mixer" => Self::Mixer,
            "switch" | "nintendo_switch" => Self::Switch,
            "discord" => Self::Discord,
            "epic_games" | "epic" => Self::EpicGames,
            _ => Self::Unknown,
        }
    }
}

/// The region a player has set in their profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Region {
    #[default]
    Unknown,
    NorthAmerica,
    Europe,
    Australia,
    Brazil,
    LatinAmericaNorth,
    SoutheastAsia,
    Japan,
}

impl Region {
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "north_america" | "na" => Self::NorthAmerica,
            "europe" | "eu" => Self::Europe,
            "australia" | "oceania" | "au" | "aus" | "oce" => Self::Australia,
            "brazil" | "br" | "bra" => Self::Brazil,
            "latin_america_north" | "latam" => Self::LatinAmericaNorth,
            "southeast_asia" | "sea" => Self::SoutheastAsia,
            "japan" | "jp" | "jpn" => Self::Japan,
            _ => Self::Unknown,
        }
    }
}

/// What a player is currently doing, as reported by `getplayerstatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    Offline,
    InLobby,
    CharacterSelection,
    InMatch,
    Online,
}

impl Activity {
    /// Status code `5` means the player could not be found, hence the `Option`.
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Offline),
            1 => Some(Self::InLobby),
            2 => Some(Self::CharacterSelection),
            3 => Some(Self::InMatch),
            4 => Some(Self::Online),
            _ => None,
        }
    }
}

/// Semi-static catalog categories held by the reference-data cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Champions,
    Devices,
}

impl Category {
    /// Service method that returns this catalog.
    pub const fn method_name(self) -> &'static str {
        match self {
            Self::Champions => "getchampions",
            Self::Devices => "getitems",
        }
    }
}

/// Device classification derived from the catalog's `item_type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    /// Consumable shop items bought during a match
    Item,
    Card,
    Talent,
}

impl DeviceType {
    /// `None` for catalog entries that are neither cards, talents nor shop items.
    pub fn classify(item_type: &str) -> Option<Self> {
        if item_type == "Inventory Vendor - Talents" {
            Some(Self::Talent)
        } else if item_type.starts_with("Card Vendor Rank")
            || item_type == "Inventory Vendor - Champion Cards"
        {
            Some(Self::Card)
        } else if item_type.starts_with("Burn Card") {
            Some(Self::Item)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub damage_type: String,
    pub cooldown: u32,
    pub icon_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Champion {
    pub id: u64,
    pub name: String,
    pub title: String,
    pub role: String,
    pub icon_url: String,
    pub lore: String,
    pub health: u32,
    pub speed: u32,
    pub abilities: Vec<Ability>,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub device_type: DeviceType,
    /// Owning champion for cards and talents
    pub champion_id: Option<u64>,
    pub icon_url: String,
    pub cooldown: u32,
    pub price: u32,
    /// Account level a talent unlocks at
    pub unlocked_at: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedStats {
    pub wins: u32,
    pub losses: u32,
    pub leaves: u32,
    pub tier: u32,
    pub season: u32,
    pub points: i64,
}

/// Full player profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: u64,
    /// Display name: the Hi-Rez name or gamer tag when set, else the platform name
    pub name: String,
    pub platform_name: String,
    pub platform: Platform,
    pub region: Region,
    pub level: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub playtime_minutes: u64,
    pub wins: u32,
    pub losses: u32,
    pub leaves: u32,
    pub champion_count: u32,
    pub total_achievements: u32,
    pub total_experience: u64,
    pub title: String,
    pub avatar_id: u64,
    pub avatar_url: Option<String>,
    pub loading_frame: String,
    /// Set when this account was merged into another one
    pub active_player_id: Option<u64>,
    pub merged_player_ids: Vec<u64>,
    pub ranked_keyboard: RankedStats,
    pub ranked_controller: RankedStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub player_id: u64,
    pub status: Activity,
    pub live_match_id: Option<u64>,
    pub queue_id: Option<u64>,
}

/// A friend-list entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    pub id: u64,
    pub name: String,
    pub platform: Platform,
}

/// One card of a loadout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadoutCard {
    pub card_id: u64,
    pub name: String,
    pub points: u32,
    /// Catalog entry; `None` when the catalog does not list the card
    pub card: Option<Device>,
}

/// A saved card deck for one champion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loadout {
    pub id: u64,
    pub name: String,
    pub player_id: u64,
    pub champion_id: u64,
    pub champion_name: String,
    pub champion: Option<Champion>,
    pub language: Language,
    /// Highest points first
    pub cards: Vec<LoadoutCard>,
}

/// A player's record on one champion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChampionStats {
    pub player_id: u64,
    pub champion_id: u64,
    pub champion_name: String,
    pub champion: Option<Champion>,
    pub level: u32,
    pub experience: u64,
    pub wins: u32,
    pub losses: u32,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub credits: u64,
    pub playtime_minutes: u64,
    pub last_played: Option<DateTime<Utc>>,
}

impl ChampionStats {
    pub fn matches_played(&self) -> u32 {
        self.wins + self.losses
    }

    /// `(kills + assists / 2) / deaths`, with zero deaths counted as one
    pub fn kda(&self) -> f64 {
        (f64::from(self.kills) + f64::from(self.assists) / 2.0) / f64::from(self.deaths.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub platform: String,
    pub environment: String,
    pub up: bool,
    pub limited_access: bool,
    pub version: Option<String>,
}

/// Developer quota usage as reported by the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataUsed {
    pub active_sessions: u32,
    pub concurrent_sessions: u32,
    pub request_limit_daily: u32,
    pub session_cap: u32,
    pub session_time_limit: u32,
    pub total_requests_today: u32,
    pub total_sessions_today: u32,
}

impl DataUsed {
    pub fn remaining_requests(&self) -> u32 {
        self.request_limit_daily
            .saturating_sub(self.total_requests_today)
    }
}
