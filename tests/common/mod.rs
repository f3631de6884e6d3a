#![allow(dead_code)]

use arez::core::errors::ApiError;
use arez::core::kernel::{HttpTransport, TransportResponse};
use arez::{ClientConfig, PaladinsApi};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub const DEV_ID: &str = "1004";
pub const AUTH_KEY: &str = "23DF3C7E9BD14D84BF892AD206B6755C";
pub const BASE_URL: &str = "http://paladins.test/paladinsapi.svc";

type Handler = Arc<dyn Fn(&[String]) -> Value + Send + Sync>;

/// In-memory stand-in for the service.
///
/// Requests are routed by method name. One-off scripted replies are served first,
/// then the method's handler, and finally an empty JSON array.
#[derive(Default)]
pub struct FakeTransport {
    scripted: Mutex<HashMap<String, VecDeque<Result<TransportResponse, ApiError>>>>,
    handlers: Mutex<HashMap<String, Handler>>,
    delays: Mutex<HashMap<String, Duration>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    counts: Mutex<HashMap<String, usize>>,
    requests: Mutex<HashMap<String, Vec<Vec<String>>>>,
    sessions_created: AtomicUsize,
    closed: AtomicBool,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reply to every `method` request with `body`
    pub fn respond(&self, method: &str, body: Value) {
        self.respond_with(method, move |_| body.clone());
    }

    /// Reply to every `method` request with a body built from its positional parameters
    pub fn respond_with(&self, method: &str, handler: impl Fn(&[String]) -> Value + Send + Sync + 'static) {
        self.handlers
            .lock()
            .unwrap()
            .insert(method.to_string(), Arc::new(handler));
    }

    /// Serve `reply` once, before any handler
    pub fn enqueue(&self, method: &str, reply: Result<TransportResponse, ApiError>) {
        self.scripted
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn enqueue_json(&self, method: &str, body: Value) {
        self.enqueue(method, Ok(TransportResponse::ok(body.to_string())));
    }

    pub fn delay(&self, method: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(method.to_string(), delay);
    }

    /// Hold every `method` request until the returned `Notify` is signalled
    pub fn gate(&self, method: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(method.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn count(&self, method: &str) -> usize {
        self.counts.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    /// Path segments after `{method}json` for every request made to `method`
    pub fn requests(&self, method: &str) -> Vec<Vec<String>> {
        self.requests
            .lock()
            .unwrap()
            .get(method)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn split(url: &str) -> (String, Vec<String>) {
        let path = url.strip_prefix(BASE_URL).unwrap_or(url);
        let mut segments = path.trim_start_matches('/').split('/');
        let method = segments
            .next()
            .unwrap_or_default()
            .trim_end_matches("json")
            .to_string();
        let params = segments
            .map(|s| s.replace("%20", " ").replace("%2C", ","))
            .collect();
        (method, params)
    }

    fn default_reply(&self, method: &str, params: &[String]) -> Value {
        if let Some(handler) = self.handlers.lock().unwrap().get(method).cloned() {
            return handler(params);
        }
        match method {
            "createsession" => {
                let n = self.sessions_created.fetch_add(1, Ordering::SeqCst) + 1;
                json!({
                    "ret_msg": "Approved",
                    "session_id": format!("session-{}", n),
                    "timestamp": "1/1/2024 12:00:00 PM"
                })
            }
            "ping" => json!("Paladins API (ver 1.0.0) [PATCH - 6.1] - Ping successful."),
            "testsession" => json!("This was a successful test with the following parameters added"),
            "getpatchinfo" => json!({"ret_msg": null, "version_string": "6.1"}),
            _ => json!([]),
        }
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, ApiError> {
        let (method, params) = Self::split(url);
        *self.counts.lock().unwrap().entry(method.clone()).or_default() += 1;
        self.requests
            .lock()
            .unwrap()
            .entry(method.clone())
            .or_default()
            .push(params.clone());

        let delay = self.delays.lock().unwrap().get(&method).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let gate = self.gates.lock().unwrap().get(&method).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let scripted = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(&method)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(reply) => reply,
            None => Ok(TransportResponse::ok(
                self.default_reply(&method, &params).to_string(),
            )),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Config pointed at the fake service, with instant retries
pub fn test_config() -> ClientConfig {
    ClientConfig::new(DEV_ID, AUTH_KEY)
        .base_url(BASE_URL)
        .retries(2, Duration::ZERO)
}

pub fn build_client(transport: &Arc<FakeTransport>, config: ClientConfig) -> PaladinsApi {
    PaladinsApi::builder(config)
        .with_transport(Arc::clone(transport) as Arc<dyn HttpTransport>)
        .build()
        .unwrap()
}

pub fn player_json(id: u64, name: &str) -> Value {
    json!({
        "ret_msg": null,
        "Id": id,
        "Name": name,
        "hz_player_name": name,
        "hz_gamer_tag": null,
        "Platform": "Steam",
        "Region": "Europe",
        "Level": 100,
        "Created_Datetime": "6/24/2017 4:02:37 PM",
        "Last_Login_Datetime": "1/2/2024 10:00:00 AM",
        "MinutesPlayed": 6000,
        "Wins": 500,
        "Losses": 450,
        "Leaves": 3,
        "MasteryLevel": 40,
        "Total_Achievements": 80,
        "Total_XP": 1_000_000,
        "Title": "Legend",
        "AvatarId": 0,
        "AvatarURL": null,
        "LoadingFrame": null,
        "ActivePlayerId": id,
        "MergedPlayers": null,
        "RankedKBM": {"Wins": 1, "Losses": 2, "Leaves": 0, "Tier": 15, "Season": 5, "Points": 10},
        "RankedController": null
    })
}

pub fn private_json(id: u64) -> Value {
    json!({
        "ret_msg": format!("Player Privacy Flag set for: playerIdStr=; playerIdType=1; playerId={}", id),
        "Id": null,
        "Name": null
    })
}

pub fn champion_json(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "Name": name,
        "Title": "Title",
        "Roles": "Paladins Damage",
        "ChampionIcon_URL": "",
        "Lore": "",
        "Health": 2000,
        "Speed": 375,
        "Ability_1": {
            "Id": id * 10, "Summary": "Primary", "Description": "Shoot", "damageType": "Direct",
            "rechargeSeconds": 0, "URL": ""
        },
        "ret_msg": null
    })
}

pub fn device_json(id: u64, name: &str, item_type: &str, champion_id: u64) -> Value {
    json!({
        "ItemId": id,
        "DeviceName": name,
        "Description": "",
        "item_type": item_type,
        "champion_id": champion_id,
        "itemIcon_URL": "",
        "recharge_seconds": 0,
        "Price": 300,
        "talent_reward_level": 0,
        "ret_msg": null
    })
}
