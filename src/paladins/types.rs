use serde::{Deserialize, Deserializer};

// The service sends `null` for most fields of private or merged profiles.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Ids arrive as numbers on some endpoints and as strings on others.
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
        Null(()),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) if s.trim().is_empty() => Ok(0),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Raw::Null(()) => Ok(0),
    }
}

#[derive(Debug, Deserialize)]
pub struct PaladinsPatchInfo {
    #[serde(default)]
    pub ret_msg: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub version_string: String,
}

#[derive(Debug, Deserialize)]
pub struct PaladinsServerStatus {
    #[serde(default, deserialize_with = "null_default")]
    pub platform: String,
    #[serde(default, deserialize_with = "null_default")]
    pub environment: String,
    #[serde(default, deserialize_with = "null_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_default")]
    pub limited_access: bool,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaladinsDataUsed {
    #[serde(rename = "Active_Sessions", default, deserialize_with = "null_default")]
    pub active_sessions: u32,
    #[serde(rename = "Concurrent_Sessions", default, deserialize_with = "null_default")]
    pub concurrent_sessions: u32,
    #[serde(rename = "Request_Limit_Daily", default, deserialize_with = "null_default")]
    pub request_limit_daily: u32,
    #[serde(rename = "Session_Cap", default, deserialize_with = "null_default")]
    pub session_cap: u32,
    #[serde(rename = "Session_Time_Limit", default, deserialize_with = "null_default")]
    pub session_time_limit: u32,
    #[serde(rename = "Total_Requests_Today", default, deserialize_with = "null_default")]
    pub total_requests_today: u32,
    #[serde(rename = "Total_Sessions_Today", default, deserialize_with = "null_default")]
    pub total_sessions_today: u32,
}

#[derive(Debug, Deserialize)]
pub struct PaladinsAbility {
    #[serde(rename = "Id", deserialize_with = "lenient_u64")]
    pub id: u64,
    #[serde(rename = "Summary", default, deserialize_with = "null_default")]
    pub summary: String,
    #[serde(rename = "Description", default, deserialize_with = "null_default")]
    pub description: String,
    #[serde(rename = "damageType", default, deserialize_with = "null_default")]
    pub damage_type: String,
    #[serde(rename = "rechargeSeconds", default, deserialize_with = "null_default")]
    pub recharge_seconds: u32,
    #[serde(rename = "URL", default, deserialize_with = "null_default")]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct PaladinsChampion {
    #[serde(deserialize_with = "lenient_u64")]
    pub id: u64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Title", default, deserialize_with = "null_default")]
    pub title: String,
    /// `"Paladins Damage"`, `"Paladins Front Line"` and so on
    #[serde(rename = "Roles", default, deserialize_with = "null_default")]
    pub roles: String,
    #[serde(rename = "ChampionIcon_URL", default, deserialize_with = "null_default")]
    pub icon_url: String,
    #[serde(rename = "Lore", default, deserialize_with = "null_default")]
    pub lore: String,
    #[serde(rename = "Health", default, deserialize_with = "null_default")]
    pub health: u32,
    #[serde(rename = "Speed", default, deserialize_with = "null_default")]
    pub speed: u32,
    #[serde(rename = "Ability_1", default)]
    pub ability_1: Option<PaladinsAbility>,
    #[serde(rename = "Ability_2", default)]
    pub ability_2: Option<PaladinsAbility>,
    #[serde(rename = "Ability_3", default)]
    pub ability_3: Option<PaladinsAbility>,
    #[serde(rename = "Ability_4", default)]
    pub ability_4: Option<PaladinsAbility>,
    #[serde(rename = "Ability_5", default)]
    pub ability_5: Option<PaladinsAbility>,
}

#[derive(Debug, Deserialize)]
pub struct PaladinsDevice {
    #[serde(rename = "ItemId", deserialize_with = "lenient_u64")]
    pub item_id: u64,
    #[serde(rename = "DeviceName", default, deserialize_with = "null_default")]
    pub device_name: String,
    #[serde(rename = "Description", default, deserialize_with = "null_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_default")]
    pub item_type: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub champion_id: u64,
    #[serde(rename = "itemIcon_URL", default, deserialize_with = "null_default")]
    pub icon_url: String,
    #[serde(default, deserialize_with = "null_default")]
    pub recharge_seconds: u32,
    #[serde(rename = "Price", default, deserialize_with = "null_default")]
    pub price: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub talent_reward_level: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaladinsRankedStats {
    #[serde(rename = "Wins", default, deserialize_with = "null_default")]
    pub wins: u32,
    #[serde(rename = "Losses", default, deserialize_with = "null_default")]
    pub losses: u32,
    #[serde(rename = "Leaves", default, deserialize_with = "null_default")]
    pub leaves: u32,
    #[serde(rename = "Tier", default, deserialize_with = "null_default")]
    pub tier: u32,
    #[serde(rename = "Season", default, deserialize_with = "null_default")]
    pub season: u32,
    #[serde(rename = "Points", default, deserialize_with = "null_default")]
    pub points: i64,
}

#[derive(Debug, Deserialize)]
pub struct PaladinsMergedPlayer {
    #[serde(rename = "playerId", deserialize_with = "lenient_u64")]
    pub player_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct PaladinsPlayer {
    #[serde(default)]
    pub ret_msg: Option<String>,
    #[serde(rename = "Id", default, deserialize_with = "lenient_u64")]
    pub id: u64,
    #[serde(rename = "Name", default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default)]
    pub hz_player_name: Option<String>,
    #[serde(default)]
    pub hz_gamer_tag: Option<String>,
    #[serde(rename = "Platform", default, deserialize_with = "null_default")]
    pub platform: String,
    #[serde(rename = "Region", default, deserialize_with = "null_default")]
    pub region: String,
    #[serde(rename = "Level", default, deserialize_with = "null_default")]
    pub level: u32,
    #[serde(rename = "Created_Datetime", default)]
    pub created_datetime: Option<String>,
    #[serde(rename = "Last_Login_Datetime", default)]
    pub last_login_datetime: Option<String>,
    #[serde(rename = "MinutesPlayed", default, deserialize_with = "null_default")]
    pub minutes_played: u64,
    #[serde(rename = "Wins", default, deserialize_with = "null_default")]
    pub wins: u32,
    #[serde(rename = "Losses", default, deserialize_with = "null_default")]
    pub losses: u32,
    #[serde(rename = "Leaves", default, deserialize_with = "null_default")]
    pub leaves: u32,
    #[serde(rename = "MasteryLevel", default, deserialize_with = "null_default")]
    pub mastery_level: u32,
    #[serde(rename = "Total_Achievements", default, deserialize_with = "null_default")]
    pub total_achievements: u32,
    #[serde(rename = "Total_XP", default, deserialize_with = "null_default")]
    pub total_xp: u64,
    #[serde(rename = "Title", default)]
    pub title: Option<String>,
    #[serde(rename = "AvatarId", default, deserialize_with = "lenient_u64")]
    pub avatar_id: u64,
    #[serde(rename = "AvatarURL", default)]
    pub avatar_url: Option<String>,
    #[serde(rename = "LoadingFrame", default)]
    pub loading_frame: Option<String>,
    #[serde(rename = "ActivePlayerId", default, deserialize_with = "lenient_u64")]
    pub active_player_id: u64,
    #[serde(rename = "MergedPlayers", default)]
    pub merged_players: Option<Vec<PaladinsMergedPlayer>>,
    #[serde(rename = "RankedKBM", default)]
    pub ranked_kbm: Option<PaladinsRankedStats>,
    #[serde(rename = "RankedController", default)]
    pub ranked_controller: Option<PaladinsRankedStats>,
}

#[derive(Debug, Deserialize)]
pub struct PaladinsPlayerStatus {
    #[serde(rename = "Match", default, deserialize_with = "lenient_u64")]
    pub match_id: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub match_queue_id: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub status: i64,
}

#[derive(Debug, Deserialize)]
pub struct PaladinsFriend {
    #[serde(deserialize_with = "lenient_u64")]
    pub player_id: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub portal_id: u64,
    /// `"1"` for accepted friends; other values are pending or blocked entries
    #[serde(default, deserialize_with = "null_default")]
    pub friend_flags: String,
}

/// Entry of `searchplayers`, `getplayeridbyname` and the other id lookups
#[derive(Debug, Deserialize)]
pub struct PaladinsPlayerSearch {
    #[serde(rename = "Name", default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default)]
    pub hz_player_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub player_id: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub portal_id: u64,
    /// `"y"` for private profiles
    #[serde(default, deserialize_with = "null_default")]
    pub privacy_flag: String,
}

#[derive(Debug, Deserialize)]
pub struct PaladinsLoadoutItem {
    #[serde(rename = "ItemId", default, deserialize_with = "lenient_u64")]
    pub item_id: u64,
    #[serde(rename = "ItemName", default, deserialize_with = "null_default")]
    pub item_name: String,
    #[serde(rename = "Points", default, deserialize_with = "null_default")]
    pub points: u32,
}

#[derive(Debug, Deserialize)]
pub struct PaladinsLoadout {
    #[serde(rename = "DeckId", default, deserialize_with = "lenient_u64")]
    pub deck_id: u64,
    #[serde(rename = "DeckName", default, deserialize_with = "null_default")]
    pub deck_name: String,
    #[serde(rename = "ChampionId", default, deserialize_with = "lenient_u64")]
    pub champion_id: u64,
    #[serde(rename = "ChampionName", default, deserialize_with = "null_default")]
    pub champion_name: String,
    /// `0` on the placeholder entry sent for players without loadouts
    #[serde(rename = "playerId", default, deserialize_with = "lenient_u64")]
    pub player_id: u64,
    #[serde(rename = "LoadoutItems", default, deserialize_with = "null_default")]
    pub items: Vec<PaladinsLoadoutItem>,
}

/// Per-champion entry of `getgodranks`
#[derive(Debug, Deserialize)]
pub struct PaladinsChampionRank {
    #[serde(default, deserialize_with = "lenient_u64")]
    pub champion_id: u64,
    #[serde(default, deserialize_with = "null_default")]
    pub champion: String,
    /// Champion mastery level
    #[serde(rename = "Rank", default, deserialize_with = "null_default")]
    pub rank: u32,
    #[serde(rename = "Worshippers", default, deserialize_with = "null_default")]
    pub worshippers: u64,
    #[serde(rename = "Wins", default, deserialize_with = "null_default")]
    pub wins: u32,
    #[serde(rename = "Losses", default, deserialize_with = "null_default")]
    pub losses: u32,
    #[serde(rename = "Kills", default, deserialize_with = "null_default")]
    pub kills: u32,
    #[serde(rename = "Deaths", default, deserialize_with = "null_default")]
    pub deaths: u32,
    #[serde(rename = "Assists", default, deserialize_with = "null_default")]
    pub assists: u32,
    #[serde(rename = "Gold", default, deserialize_with = "null_default")]
    pub gold: u64,
    #[serde(rename = "Minutes", default, deserialize_with = "null_default")]
    pub minutes: u64,
    #[serde(rename = "LastPlayed", default)]
    pub last_played: Option<String>,
}
