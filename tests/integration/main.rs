use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use dedisync::config::DedimaniaConfig;
use dedisync::constants::DEFAULT_DEDIMANIA_URL;
use dedisync::controller::Controller;
use dedisync::dedimania::{Completion, RequestKind, SessionState, Ticket};
use dedisync::network::{PostOptions, Transport, TransportError};
use dedisync::server::xml::{read_method_call, write_method_response};
use dedisync::server::{
    Call, Calls, CheckpointEvent, DetailedPlayerInfo, Fault, GameString, MapInfo, ModeInfo,
    PlayerInfo, ServerEvent, ServerInfo, ServerOptions, SystemInfo, Value,
};

const MAP_A: &str = "map-a";
const MAP_B: &str = "map-b";
const SESSION_ID: &str = "sid-1";

/// How the ranking service answers a method.
#[derive(Debug, Clone)]
enum Reply {
    Value(Value),
    Fault(&'static str),
    Timeout,
}

/// A ranking service that answers with scripted replies, and remembers
/// every call it received.
#[derive(Default)]
struct ScriptedTransport {
    replies: Mutex<HashMap<&'static str, Reply>>,
    received: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    fn script(&self, method: &'static str, reply: Reply) {
        self.replies.lock().unwrap().insert(method, reply);
    }

    /// The calls received since the last time this was called.
    fn take_received(&self) -> Vec<Call> {
        std::mem::take(&mut *self.received.lock().unwrap())
    }

    fn reply_to(&self, call: &Call) -> Reply {
        if let Some(reply) = self.replies.lock().unwrap().get(call.name.as_str()) {
            return reply.clone();
        }
        match call.name.as_str() {
            "dedimania.OpenSession" => Reply::Value(
                vec![("SessionId", Value::from(SESSION_ID))]
                    .into_iter()
                    .collect(),
            ),
            "dedimania.GetChallengeRecords" => Reply::Value(challenge_records(&[
                ("ann", 30_000),
                ("bob", 31_000),
                ("tim", 32_000),
            ])),
            "dedimania.PlayerConnect" => Reply::Value(
                vec![
                    ("Login", call.args[1].clone()),
                    ("MaxRank", Value::from(30)),
                    ("Banned", Value::from(false)),
                    ("OptionsEnabled", Value::from(false)),
                    ("ToolOption", Value::from("")),
                ]
                .into_iter()
                .collect(),
            ),
            _ => Reply::Value(Value::from(true)),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, body: Vec<u8>, _options: PostOptions) -> Result<Vec<u8>, TransportError> {
        let multicall = read_method_call(std::str::from_utf8(&body).unwrap()).unwrap();
        let batch = multicall.args[0].as_array().unwrap();
        assert_eq!(2, batch.len());

        let name = batch[0].member("methodName").and_then(Value::as_str).unwrap();
        let params = batch[0].member("params").and_then(Value::as_array).unwrap();
        let call = Call::new(name, params.to_vec());
        self.received.lock().unwrap().push(call.clone());

        let primary = match self.reply_to(&call) {
            Reply::Value(value) => Value::Array(vec![value]),
            Reply::Fault(msg) => vec![
                ("faultCode", Value::Int(-1)),
                ("faultString", Value::from(msg)),
            ]
            .into_iter()
            .collect(),
            Reply::Timeout => return Err(TransportError::Timeout),
        };
        let warnings: Value = vec![
            ("globalTTR", Value::Double(0.0)),
            ("methods", Value::Array(vec![])),
        ]
        .into_iter()
        .collect();
        let reply = Value::Array(vec![primary, Value::Array(vec![warnings])]);
        Ok(write_method_response(&Ok(reply)))
    }
}

fn challenge_records(records: &[(&str, i32)]) -> Value {
    let records = records
        .iter()
        .enumerate()
        .map(|(idx, (login, millis))| {
            vec![
                ("Login", Value::from(*login)),
                ("NickName", Value::from(login.to_uppercase())),
                ("Best", Value::from(*millis)),
                ("Rank", Value::from(idx + 1)),
                ("MaxRank", Value::from(30)),
                ("Checks", Value::from(format!("{},{},{}", millis - 20_000, millis - 10_000, millis))),
                ("Vote", Value::from(-1)),
            ]
            .into_iter()
            .collect::<Value>()
        })
        .collect::<Vec<Value>>();
    vec![
        ("ServerMaxRank", Value::from(30)),
        ("Records", Value::Array(records)),
        ("Players", Value::Array(vec![])),
    ]
    .into_iter()
    .collect()
}

/// A game server with a fixed set of players, that remembers chat messages.
struct MockServer {
    players: Vec<PlayerInfo>,
    chat: Mutex<Vec<String>>,
}

impl MockServer {
    fn new() -> Self {
        MockServer {
            players: vec![
                PlayerInfo::joined(1, "tim", "$f00Tim"),
                PlayerInfo::joined(2, "bob", "Bob"),
            ],
            chat: Mutex::new(vec![]),
        }
    }
}

fn map(uid: &str) -> MapInfo {
    MapInfo {
        uid: uid.to_string(),
        name: GameString::from(format!("$fff{}", uid)),
        file_name: format!("{}.Map.Gbx", uid),
        author_login: "nadeo".to_string(),
        environment: "Stadium".to_string(),
        nb_checkpoints: 3,
        nb_laps: 1,
    }
}

#[async_trait]
impl Calls for MockServer {
    async fn authenticate(&self, _username: &str, _password: &str) {}

    async fn enable_callbacks(&self) {}

    async fn set_api_version(&self) {}

    async fn server_info(&self) -> ServerInfo {
        ServerInfo {
            name: "ManiaPlanet".to_string(),
            title_id: "TMStadium@nadeo".to_string(),
            version: "3.3.0".to_string(),
            build: "2019-10-23_20_00".to_string(),
        }
    }

    async fn system_info(&self) -> SystemInfo {
        SystemInfo {
            server_login: "srv".to_string(),
            title_id: "TMStadium@nadeo".to_string(),
            server_player_id: 0,
            is_dedicated: true,
        }
    }

    async fn server_options(&self) -> ServerOptions {
        ServerOptions {
            name: GameString::from("$o Server".to_string()),
            comment: GameString::from(String::new()),
            password: String::new(),
            password_spectator: String::new(),
            current_max_players: 32,
            current_max_spectators: 32,
        }
    }

    async fn mode(&self) -> ModeInfo {
        ModeInfo {
            file_name: "TrackMania/TM_TimeAttack_Online.Script.txt".to_string(),
            compatible_map_types: "TrackMania\\TM_Race".to_string(),
        }
    }

    async fn players(&self) -> Vec<PlayerInfo> {
        self.players.clone()
    }

    async fn detailed_player_info(&self, login: &str) -> gbx::Result<DetailedPlayerInfo> {
        let nick_name = match login {
            "srv" => "Server",
            _ => match self.players.iter().find(|p| p.login == login) {
                Some(info) => info.nick_name.formatted.as_str(),
                None => {
                    return Err(Fault {
                        code: -1000,
                        msg: "Login unknown.".to_string(),
                    })
                }
            },
        };
        Ok(DetailedPlayerInfo {
            login: login.to_string(),
            nick_name: GameString::from(nick_name.to_string()),
            path: "World|Europe|Germany".to_string(),
            is_spectator: false,
        })
    }

    async fn current_map(&self) -> MapInfo {
        map(MAP_A)
    }

    async fn user_data_dir(&self) -> PathBuf {
        PathBuf::from("/srv/UserData")
    }

    async fn chat_send(&self, msg: &str) {
        self.chat.lock().unwrap().push(msg.to_string());
    }

    async fn validation_replay(&self, _player_login: &str) -> gbx::Result<Vec<u8>> {
        Ok(vec![1, 2, 3])
    }

    async fn ghost_replay(&self, _player_login: &str) -> gbx::Result<std::io::Result<Vec<u8>>> {
        Ok(Ok(vec![4, 5, 6]))
    }

    async fn check_directory_access(&self, _path: &std::path::Path) -> bool {
        true
    }
}

struct Harness {
    controller: Controller,
    completions: UnboundedReceiver<Completion>,

    /// Completions that were received, but not handled yet.
    held: Vec<Completion>,

    transport: Arc<ScriptedTransport>,
    server: Arc<MockServer>,
}

impl Harness {
    async fn new() -> Harness {
        let _ = env_logger::builder().is_test(true).try_init();

        let config = DedimaniaConfig {
            url: DEFAULT_DEDIMANIA_URL.to_string(),
            auth_code: "code".to_string(),
            request_timeout_millis: 5_000,
            liveness_interval_secs: 30,
            player_update_interval_secs: 180,
            compress: true,
        };
        let transport = Arc::new(ScriptedTransport::default());
        let server = Arc::new(MockServer::new());
        let (controller, completions) = Controller::init(
            &config,
            server.clone() as Arc<dyn Calls>,
            transport.clone() as Arc<dyn Transport>,
        )
        .await;
        Harness {
            controller,
            completions,
            held: vec![],
            transport,
            server,
        }
    }

    /// Wait until every posted request was answered, without handling
    /// the completions yet.
    async fn hold(&mut self) {
        loop {
            let next = tokio::time::timeout(Duration::from_millis(200), self.completions.recv());
            match next.await {
                Ok(Some(completion)) => self.held.push(completion),
                _ => return,
            }
        }
    }

    /// Handle completions until no more requests are in flight.
    async fn settle(&mut self) {
        for completion in std::mem::take(&mut self.held) {
            self.controller.on_completion(completion).await;
        }
        loop {
            let next = tokio::time::timeout(Duration::from_millis(200), self.completions.recv());
            match next.await {
                Ok(Some(completion)) => self.controller.on_completion(completion).await,
                _ => return,
            }
        }
    }

    /// Open the session, and fetch the records of the current map.
    async fn open(&mut self) {
        self.controller.on_liveness_tick().await;
        self.settle().await;
        assert_eq!(
            &SessionState::Open {
                session_id: SESSION_ID.to_string()
            },
            self.controller.session_state()
        );
        self.transport.take_received();
    }

    async fn finish(&mut self, login: &str, millis: i32) {
        let event = CheckpointEvent {
            player_login: login.to_string(),
            race_time_millis: millis,
            race_time_cp_millis: vec![millis - 20_000, millis - 10_000, millis],
            cp_index: 2,
            is_finish: true,
        };
        self.controller
            .on_server_event(ServerEvent::RunCheckpoint { event })
            .await;
        self.settle().await;
    }

    fn received_names(&self) -> Vec<String> {
        self.transport
            .take_received()
            .into_iter()
            .map(|call| call.name)
            .collect()
    }

    fn logins(&self) -> Vec<String> {
        self.controller
            .store()
            .records()
            .iter()
            .map(|rec| rec.login.clone())
            .collect()
    }
}

#[tokio::test]
async fn open_then_fetch() {
    let mut h = Harness::new().await;
    assert_eq!(&SessionState::Closed, h.controller.session_state());

    h.controller.on_liveness_tick().await;
    h.settle().await;

    let received = h.received_names();
    assert_eq!("dedimania.OpenSession", received[0]);
    assert_eq!(
        2,
        received
            .iter()
            .filter(|name| *name == "dedimania.PlayerConnect")
            .count()
    );
    assert!(received.iter().any(|name| name == "dedimania.GetChallengeRecords"));
    assert_eq!(4, received.len());

    assert!(h.controller.store().is_loaded_for(MAP_A));
    assert_eq!(vec!["ann", "bob", "tim"], h.logins());
    assert!(h.controller.store().player("tim").is_some());
}

#[tokio::test]
async fn open_session_identity() {
    let mut h = Harness::new().await;
    h.controller.on_liveness_tick().await;
    h.settle().await;

    let open = h
        .transport
        .take_received()
        .into_iter()
        .find(|call| call.name == "dedimania.OpenSession")
        .unwrap();
    let info = &open.args[0];
    let member = |name| info.member(name).and_then(Value::as_str).unwrap();
    assert_eq!("TM2", member("Game"));
    assert_eq!("srv", member("Login"));
    assert_eq!("code", member("Code"));
    assert_eq!("Stadium", member("Packmask"));
    assert_eq!("World|Europe|Germany", member("Path"));
}

#[tokio::test]
async fn expired_session_reopens_once() {
    let mut h = Harness::new().await;
    h.open().await;

    h.transport
        .script("dedimania.CheckSession", Reply::Value(Value::from(false)));
    h.controller.on_liveness_tick().await;
    h.settle().await;
    assert_eq!(vec!["dedimania.CheckSession"], h.received_names());
    assert_eq!(&SessionState::Closed, h.controller.session_state());

    // no leaderboard calls without a session
    h.controller.on_players_tick().await;
    h.finish("tim", 20_000).await;
    h.settle().await;
    assert!(h.received_names().is_empty());

    h.controller.on_liveness_tick().await;
    h.hold().await;
    assert_eq!(vec!["dedimania.OpenSession"], h.received_names());
    h.settle().await;
    assert!(h.controller.session_state() != &SessionState::Closed);
}

#[tokio::test]
async fn check_timeout_reopens() {
    let mut h = Harness::new().await;
    h.open().await;

    h.transport.script("dedimania.CheckSession", Reply::Timeout);
    h.controller.on_liveness_tick().await;
    h.settle().await;
    assert_eq!(&SessionState::Closed, h.controller.session_state());
    h.received_names();

    h.controller.on_players_tick().await;
    h.settle().await;
    assert!(h.received_names().is_empty());

    h.controller.on_liveness_tick().await;
    h.hold().await;
    assert_eq!(vec!["dedimania.OpenSession"], h.received_names());

    // the session is announced before anything else
    h.settle().await;
    let received = h.received_names();
    assert!(!received.is_empty());
    assert!(received.iter().all(|name| name != "dedimania.OpenSession"));
    assert!(h.controller.session_state() != &SessionState::Closed);
}

#[tokio::test]
async fn improve_to_top_record() {
    let mut h = Harness::new().await;
    h.open().await;

    h.finish("tim", 29_000).await;

    assert_eq!(vec!["tim", "ann", "bob"], h.logins());
    let top = &h.controller.store().records()[0];
    assert_eq!(1, top.rank);
    assert!(top.is_pending);
    assert_eq!(Some(vec![1, 2, 3]), top.validation_replay);
    assert_eq!(Some(vec![4, 5, 6]), top.ghost_replay);

    let chat = h.server.chat.lock().unwrap();
    assert_eq!(1, chat.len());
    assert!(chat[0].contains("gained"));
}

#[tokio::test]
async fn slower_run_is_ignored() {
    let mut h = Harness::new().await;
    h.open().await;

    h.finish("tim", 33_000).await;
    h.finish("ann", 30_000).await;

    assert_eq!(vec!["ann", "bob", "tim"], h.logins());
    assert!(h.controller.store().pending().is_empty());
    assert!(h.server.chat.lock().unwrap().is_empty());
}

#[tokio::test]
async fn submit_at_map_end() {
    let mut h = Harness::new().await;
    h.open().await;
    h.finish("tim", 29_000).await;
    h.finish("bob", 30_500).await;
    h.transport.take_received();

    h.controller
        .on_server_event(ServerEvent::MapEnd { map: map(MAP_A) })
        .await;
    h.settle().await;

    let received = h.transport.take_received();
    assert_eq!(1, received.len());
    let submit = &received[0];
    assert_eq!("dedimania.SetChallengeTimes", submit.name);
    assert_eq!(Some(SESSION_ID), submit.args[0].as_str());

    let times = submit.args[3].as_array().unwrap();
    let logins: Vec<&str> = times
        .iter()
        .map(|t| t.member("Login").and_then(Value::as_str).unwrap())
        .collect();
    assert_eq!(vec!["tim", "bob"], logins);
    assert_eq!(Some("9000,19000,29000"), times[0].member("Checks").and_then(Value::as_str));

    let replays = &submit.args[4];
    assert_eq!(Some(&[1u8, 2, 3][..]), replays.member("VReplay").and_then(Value::as_bytes));
    assert_eq!(Some(&[4u8, 5, 6][..]), replays.member("Top1GReplay").and_then(Value::as_bytes));

    assert!(h.controller.store().pending().is_empty());
}

#[tokio::test]
async fn stale_fetch_is_ignored() {
    let mut h = Harness::new().await;
    h.open().await;

    let stale = |map_uid: &str, session_id: &str| Completion {
        ticket: Ticket {
            kind: RequestKind::GetChallengeRecords,
            session_id: Some(session_id.to_string()),
            map_uid: Some(map_uid.to_string()),
        },
        outcome: Ok(challenge_records(&[("zed", 1_000)])),
    };

    h.controller
        .on_server_event(ServerEvent::MapBegin { map: map(MAP_B) })
        .await;
    assert!(!h.controller.store().is_loaded_for(MAP_B));

    h.controller.on_completion(stale(MAP_A, SESSION_ID)).await;
    h.controller.on_completion(stale(MAP_B, "sid-0")).await;
    assert!(!h.controller.store().is_loaded_for(MAP_B));
    assert!(h.controller.store().records().is_empty());

    h.settle().await;
    assert!(h.controller.store().is_loaded_for(MAP_B));
    assert_eq!(vec!["ann", "bob", "tim"], h.logins());
}

#[tokio::test]
async fn missing_records_is_empty() {
    let mut h = Harness::new().await;
    h.transport.script(
        "dedimania.GetChallengeRecords",
        Reply::Value(
            vec![("ServerMaxRank", Value::from(30))]
                .into_iter()
                .collect(),
        ),
    );
    h.open().await;

    assert!(h.controller.store().is_loaded_for(MAP_A));
    assert!(h.controller.store().records().is_empty());

    // the first record on the map
    h.finish("bob", 40_000).await;
    assert_eq!(vec!["bob"], h.logins());
}

#[tokio::test]
async fn failed_fetch_is_retried() {
    let mut h = Harness::new().await;
    h.transport
        .script("dedimania.GetChallengeRecords", Reply::Timeout);
    h.open().await;
    assert!(!h.controller.store().is_loaded_for(MAP_A));

    // runs are ignored until records are loaded
    h.finish("tim", 10_000).await;
    assert!(h.controller.store().records().is_empty());

    h.transport.script(
        "dedimania.GetChallengeRecords",
        Reply::Value(challenge_records(&[("ann", 30_000)])),
    );
    h.controller.on_liveness_tick().await;
    h.settle().await;
    assert_eq!(
        vec!["dedimania.CheckSession", "dedimania.GetChallengeRecords"],
        h.received_names()
    );
    assert!(h.controller.store().is_loaded_for(MAP_A));
}

#[tokio::test]
async fn fault_closes_session() {
    let mut h = Harness::new().await;
    h.open().await;

    h.transport
        .script("dedimania.UpdateServerPlayers", Reply::Fault("Invalid session"));
    h.controller.on_players_tick().await;
    h.settle().await;

    assert_eq!(vec!["dedimania.UpdateServerPlayers"], h.received_names());
    assert_eq!(&SessionState::Closed, h.controller.session_state());
}

#[tokio::test]
async fn players_are_reported() {
    let mut h = Harness::new().await;
    h.open().await;

    h.controller
        .on_server_event(ServerEvent::PlayerDisconnect {
            login: "bob".to_string(),
        })
        .await;
    h.controller.on_players_tick().await;
    h.settle().await;

    let received = h.transport.take_received();
    assert_eq!(2, received.len());
    let find = |name: &str| received.iter().find(|call| call.name == name).unwrap();

    let disconnect = find("dedimania.PlayerDisconnect");
    assert_eq!(Some("bob"), disconnect.args[1].as_str());

    let update = find("dedimania.UpdateServerPlayers");
    assert_eq!(Some(&Value::Int(1)), update.args[1].member("NumPlayers"));
    assert_eq!(1, update.args[3].as_array().unwrap().len());
}
