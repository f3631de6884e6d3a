use super::types::{
    PaladinsAbility, PaladinsChampion, PaladinsChampionRank, PaladinsDataUsed, PaladinsDevice,
    PaladinsFriend, PaladinsLoadout, PaladinsPlayer, PaladinsPlayerSearch, PaladinsPlayerStatus,
    PaladinsRankedStats, PaladinsServerStatus,
};
use crate::core::types::{
    Ability, Activity, Champion, ChampionStats, DataUsed, Device, DeviceType, Friend, Language,
    Loadout, LoadoutCard, Platform, Player, PlayerStatus, RankedStats, Region, ServerStatus,
};
use crate::utils::{find, LookupKey};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

/// Timestamp layout used inside response bodies, e.g. `6/24/2017 4:02:37 PM`
pub const RESPONSE_TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// Parse a response-body timestamp. Empty or unparsable values give `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveDateTime::parse_from_str(raw, RESPONSE_TIMESTAMP_FORMAT) {
        Ok(naive) => Some(Utc.from_utc_datetime(&naive)),
        Err(e) => {
            warn!(raw, error = %e, "Unparsable timestamp");
            None
        }
    }
}

fn convert_ability(ability: PaladinsAbility) -> Ability {
    Ability {
        id: ability.id,
        name: ability.summary,
        description: ability.description.trim().replace('\r', ""),
        damage_type: ability.damage_type,
        cooldown: ability.recharge_seconds,
        icon_url: ability.url,
    }
}

/// Convert a catalog champion to the core champion type
pub fn convert_champion(champion: PaladinsChampion, language: Language) -> Champion {
    // "Paladins Front Line" -> "Front Line", "Paladins Flanker" -> "Flank"
    let role = champion
        .roles
        .strip_prefix("Paladins ")
        .unwrap_or(&champion.roles)
        .replace("er", "");

    let abilities = [
        champion.ability_1,
        champion.ability_2,
        champion.ability_3,
        champion.ability_4,
        champion.ability_5,
    ]
    .into_iter()
    .flatten()
    .map(convert_ability)
    .collect();

    Champion {
        id: champion.id,
        name: champion.name,
        title: champion.title,
        role,
        icon_url: champion.icon_url,
        lore: champion.lore,
        health: champion.health,
        speed: champion.speed,
        abilities,
        language,
    }
}

/// Convert a catalog device; entries of an unknown kind give `None`
pub fn convert_device(device: PaladinsDevice) -> Option<Device> {
    let device_type = DeviceType::classify(&device.item_type)?;
    Some(Device {
        id: device.item_id,
        name: device.device_name,
        description: device.description.trim().to_string(),
        device_type,
        champion_id: (device.champion_id != 0).then_some(device.champion_id),
        icon_url: device.icon_url,
        cooldown: device.recharge_seconds,
        price: device.price,
        unlocked_at: device.talent_reward_level,
    })
}

fn convert_ranked(stats: Option<PaladinsRankedStats>) -> RankedStats {
    let stats = stats.unwrap_or_default();
    RankedStats {
        wins: stats.wins,
        losses: stats.losses,
        leaves: stats.leaves,
        tier: stats.tier,
        season: stats.season,
        points: stats.points,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Convert a `getplayer`/`getplayerbatch` entry to the core player type
pub fn convert_player(player: PaladinsPlayer) -> Player {
    let name = non_empty(player.hz_player_name)
        .or_else(|| non_empty(player.hz_gamer_tag))
        .unwrap_or_else(|| player.name.clone());

    Player {
        id: player.id,
        name,
        platform_name: player.name,
        platform: Platform::parse_lenient(&player.platform),
        region: Region::parse_lenient(&player.region),
        level: player.level,
        created_at: player.created_datetime.as_deref().and_then(parse_timestamp),
        last_login: player.last_login_datetime.as_deref().and_then(parse_timestamp),
        playtime_minutes: player.minutes_played,
        wins: player.wins,
        losses: player.losses,
        leaves: player.leaves,
        champion_count: player.mastery_level,
        total_achievements: player.total_achievements,
        total_experience: player.total_xp,
        title: player.title.unwrap_or_default(),
        avatar_id: player.avatar_id,
        avatar_url: non_empty(player.avatar_url),
        loading_frame: player.loading_frame.unwrap_or_default(),
        active_player_id: (player.active_player_id != 0 && player.active_player_id != player.id)
            .then_some(player.active_player_id),
        merged_player_ids: player
            .merged_players
            .unwrap_or_default()
            .into_iter()
            .map(|merged| merged.player_id)
            .collect(),
        ranked_keyboard: convert_ranked(player.ranked_kbm),
        ranked_controller: convert_ranked(player.ranked_controller),
    }
}

/// `None` when the service reports the player as not found (status 5)
pub fn convert_player_status(player_id: u64, status: PaladinsPlayerStatus) -> Option<PlayerStatus> {
    Some(PlayerStatus {
        player_id,
        status: Activity::from_value(status.status)?,
        live_match_id: (status.match_id != 0).then_some(status.match_id),
        queue_id: (status.match_queue_id != 0).then_some(status.match_queue_id),
    })
}

/// Accepted friends only
pub fn convert_friends(friends: Vec<PaladinsFriend>) -> Vec<Friend> {
    friends
        .into_iter()
        .filter(|friend| friend.friend_flags == "1")
        .map(|friend| Friend {
            id: friend.player_id,
            name: friend.name,
            platform: Platform::from_value(friend.portal_id as i64),
        })
        .collect()
}

/// A player found by search or id lookup, before any profile fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerListing {
    pub id: u64,
    pub name: Option<String>,
    pub platform: Platform,
    pub private: bool,
}

pub fn convert_listing(entry: PaladinsPlayerSearch) -> PlayerListing {
    let name = non_empty(entry.hz_player_name).or_else(|| non_empty(Some(entry.name)));
    PlayerListing {
        id: entry.player_id,
        name,
        platform: Platform::from_value(entry.portal_id as i64),
        private: entry.privacy_flag.eq_ignore_ascii_case("y"),
    }
}

/// Join a loadout with the catalogs of its language
pub fn convert_loadout(
    loadout: PaladinsLoadout,
    language: Language,
    champions: &[Champion],
    devices: &[Device],
) -> Loadout {
    let mut cards: Vec<LoadoutCard> = loadout
        .items
        .into_iter()
        .map(|item| LoadoutCard {
            card: devices
                .iter()
                .find(|d| d.id == item.item_id && d.device_type == DeviceType::Card)
                .cloned(),
            card_id: item.item_id,
            name: item.item_name,
            points: item.points,
        })
        .collect();
    cards.sort_by(|a, b| b.points.cmp(&a.points));

    Loadout {
        id: loadout.deck_id,
        name: loadout.deck_name,
        player_id: loadout.player_id,
        champion: find(champions, LookupKey::Id(loadout.champion_id), false).cloned(),
        champion_id: loadout.champion_id,
        champion_name: loadout.champion_name,
        language,
        cards,
    }
}

pub fn convert_champion_stats(
    player_id: u64,
    stats: PaladinsChampionRank,
    champions: &[Champion],
) -> ChampionStats {
    ChampionStats {
        player_id,
        champion: find(champions, LookupKey::Id(stats.champion_id), false).cloned(),
        champion_id: stats.champion_id,
        champion_name: stats.champion,
        level: stats.rank,
        experience: stats.worshippers,
        wins: stats.wins,
        losses: stats.losses,
        kills: stats.kills,
        deaths: stats.deaths,
        assists: stats.assists,
        credits: stats.gold,
        playtime_minutes: stats.minutes,
        last_played: stats.last_played.as_deref().and_then(parse_timestamp),
    }
}

pub fn convert_server_status(status: PaladinsServerStatus) -> ServerStatus {
    ServerStatus {
        up: status.status.eq_ignore_ascii_case("up"),
        platform: status.platform,
        environment: status.environment,
        limited_access: status.limited_access,
        version: non_empty(status.version),
    }
}

pub fn convert_data_used(data: PaladinsDataUsed) -> DataUsed {
    DataUsed {
        active_sessions: data.active_sessions,
        concurrent_sessions: data.concurrent_sessions,
        request_limit_daily: data.request_limit_daily,
        session_cap: data.session_cap,
        session_time_limit: data.session_time_limit,
        total_requests_today: data.total_requests_today,
        total_sessions_today: data.total_sessions_today,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use serde_json::json;

    #[test]
    fn test_parse_timestamp() {
        let at = parse_timestamp("6/24/2017 4:02:37 PM").unwrap();
        assert_eq!((at.year(), at.month(), at.day()), (2017, 6, 24));
        assert_eq!(at.format("%H:%M:%S").to_string(), "16:02:37");
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_convert_player_prefers_hirez_name() {
        let raw: PaladinsPlayer = serde_json::from_value(json!({
            "ret_msg": null,
            "Id": 479353,
            "Name": "SteamName",
            "hz_player_name": "HiRezName",
            "hz_gamer_tag": null,
            "Platform": "Steam",
            "Region": "Europe",
            "Level": 120,
            "Created_Datetime": "1/2/2019 10:00:00 AM",
            "Last_Login_Datetime": "",
            "ActivePlayerId": 479353,
            "MergedPlayers": [{"merge_datetime": "", "playerId": "1234", "portalId": "5"}],
            "RankedKBM": {"Wins": 10, "Losses": 5, "Leaves": 0, "Tier": 12, "Season": 4, "Points": 60}
        }))
        .unwrap();

        let player = convert_player(raw);
        assert_eq!(player.name, "HiRezName");
        assert_eq!(player.platform_name, "SteamName");
        assert_eq!(player.platform, Platform::Steam);
        assert_eq!(player.region, Region::Europe);
        assert!(player.created_at.is_some());
        assert!(player.last_login.is_none());
        assert_eq!(player.active_player_id, None);
        assert_eq!(player.merged_player_ids, vec![1234]);
        assert_eq!(player.ranked_keyboard.tier, 12);
        assert_eq!(player.ranked_controller, RankedStats::default());
    }

    #[test]
    fn test_convert_champion_role_and_abilities() {
        let ability = json!({
            "Id": 1, "Summary": "Shoot", "Description": " Pew\r\n", "damageType": "Direct",
            "rechargeSeconds": 0, "URL": "https://example.invalid/shoot.jpg"
        });
        let raw: PaladinsChampion = serde_json::from_value(json!({
            "id": 2205, "Name": "Androxus", "Title": "The Godslayer",
            "Roles": "Paladins Flanker", "Health": 2100, "Speed": 380,
            "Ability_1": ability, "Ability_2": null
        }))
        .unwrap();

        let champion = convert_champion(raw, Language::English);
        assert_eq!(champion.role, "Flank");
        assert_eq!(champion.abilities.len(), 1);
        assert_eq!(champion.abilities[0].description, "Pew");
    }

    #[test]
    fn test_convert_device_skips_unknown_kinds() {
        let card: PaladinsDevice = serde_json::from_value(json!({
            "ItemId": 100, "DeviceName": "Reversal", "Description": "x",
            "item_type": "Card Vendor Rank 1 Rare", "champion_id": 2205,
            "itemIcon_URL": "", "recharge_seconds": 0, "Price": 0, "talent_reward_level": 0
        }))
        .unwrap();
        let emote: PaladinsDevice = serde_json::from_value(json!({
            "ItemId": 101, "DeviceName": "Wave", "item_type": "Emotes", "champion_id": 0
        }))
        .unwrap();

        let card = convert_device(card).unwrap();
        assert_eq!(card.device_type, DeviceType::Card);
        assert_eq!(card.champion_id, Some(2205));
        assert!(convert_device(emote).is_none());
    }

    #[test]
    fn test_friends_and_status() {
        let friends: Vec<PaladinsFriend> = serde_json::from_value(json!([
            {"player_id": "1", "name": "a", "portal_id": "5", "friend_flags": "1"},
            {"player_id": "2", "name": "b", "portal_id": "5", "friend_flags": "2"}
        ]))
        .unwrap();
        let friends = convert_friends(friends);
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].platform, Platform::Steam);

        let offline: PaladinsPlayerStatus =
            serde_json::from_value(json!({"Match": 0, "match_queue_id": 0, "status": 0})).unwrap();
        assert_eq!(
            convert_player_status(7, offline).map(|s| s.status),
            Some(Activity::Offline)
        );
        let unknown: PaladinsPlayerStatus =
            serde_json::from_value(json!({"Match": 0, "status": 5})).unwrap();
        assert!(convert_player_status(7, unknown).is_none());
    }

    fn catalog_device(id: u64, device_type: DeviceType) -> Device {
        Device {
            id,
            name: format!("device {}", id),
            description: String::new(),
            device_type,
            champion_id: Some(2205),
            icon_url: String::new(),
            cooldown: 0,
            price: 0,
            unlocked_at: 0,
        }
    }

    #[test]
    fn test_loadout_joins_catalog_and_orders_cards() {
        let raw: PaladinsLoadout = serde_json::from_value(json!({
            "DeckId": 77, "DeckName": "Burst", "ChampionId": 2205, "ChampionName": "Androxus",
            "playerId": 42, "LoadoutItems": [
                {"ItemId": 1, "ItemName": "Low", "Points": 1},
                {"ItemId": 2, "ItemName": "Talent id", "Points": 5},
                {"ItemId": 3, "ItemName": "Gone", "Points": 3}
            ]
        }))
        .unwrap();
        let devices = vec![
            catalog_device(1, DeviceType::Card),
            catalog_device(2, DeviceType::Talent),
        ];

        let loadout = convert_loadout(raw, Language::English, &[], &devices);
        assert_eq!(loadout.champion, None);
        assert_eq!(loadout.champion_name, "Androxus");
        let points: Vec<u32> = loadout.cards.iter().map(|c| c.points).collect();
        assert_eq!(points, vec![5, 3, 1]);
        // only cards are joined
        assert_eq!(loadout.cards[0].card, None);
        assert_eq!(loadout.cards[1].card, None);
        assert_eq!(loadout.cards[2].card.as_ref().map(|d| d.id), Some(1));
    }

    #[test]
    fn test_listing_prefers_hirez_name() {
        let entry: PaladinsPlayerSearch = serde_json::from_value(json!({
            "Name": "console tag", "hz_player_name": "HiRez", "player_id": "12",
            "portal_id": "10", "privacy_flag": "y"
        }))
        .unwrap();
        let listing = convert_listing(entry);
        assert_eq!(listing.name.as_deref(), Some("HiRez"));
        assert_eq!(listing.platform, Platform::Xbox);
        assert!(listing.private);

        let bare: PaladinsPlayerSearch =
            serde_json::from_value(json!({"player_id": 5, "portal_id": 5, "privacy_flag": "n"})).unwrap();
        assert_eq!(convert_listing(bare).name, None);
    }

    #[test]
    fn test_champion_stats() {
        let raw: PaladinsChampionRank = serde_json::from_value(json!({
            "champion": "Androxus", "champion_id": "2205", "player_id": "42", "Rank": 50,
            "Worshippers": 1200000, "Wins": 30, "Losses": 10, "Kills": 100, "Deaths": 0,
            "Assists": 20, "Gold": 5000, "Minutes": 900, "LastPlayed": "3/1/2021 8:00:00 PM"
        }))
        .unwrap();
        let stats = convert_champion_stats(42, raw, &[]);
        assert_eq!(stats.level, 50);
        assert_eq!(stats.matches_played(), 40);
        assert_eq!(stats.kda(), 110.0);
        assert!(stats.last_played.is_some());
    }
}
