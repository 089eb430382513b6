use serde::Deserialize;

use crate::constants::{DEFAULT_MAX_RANK, GAME, TOOL_NAME, VERSION};
use crate::dedimania::{MissingField, Record, RemotePlayer};
use crate::server::xml::from_value;
use crate::server::{Call, MapInfo, ServerInfo, ServerOptions, SystemInfo, Value};

/// Identifies this server to the ranking service when opening a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerIdentity {
    /// The login of the server account.
    pub login: String,

    /// The community code of the server account.
    pub auth_code: String,

    /// The server's zone, f.e. "World|Europe|Germany".
    pub path: String,

    /// f.e. "Stadium"
    pub pack_mask: String,

    pub server_version: String,
    pub server_build: String,
    pub tool: String,
    pub tool_version: String,
}

impl ServerIdentity {
    pub fn new(server: &ServerInfo, system: &SystemInfo, path: &str, auth_code: &str) -> Self {
        ServerIdentity {
            login: system.server_login.clone(),
            auth_code: auth_code.to_string(),
            path: path.to_string(),
            pack_mask: pack_mask(&system.title_id),
            server_version: server.version.clone(),
            server_build: server.build.clone(),
            tool: TOOL_NAME.to_string(),
            tool_version: VERSION.to_string(),
        }
    }
}

/// The title pack a server runs, f.e. "Stadium" for "TMStadium@nadeo".
pub fn pack_mask(title_id: &str) -> String {
    let title = title_id.split('@').next().unwrap_or(title_id);
    title.strip_prefix("TM").unwrap_or(title).to_string()
}

/// Game modes that the ranking service keeps records for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    /// Time Attack and Laps
    TimeAttack,

    /// Rounds, Team and Cup
    Rounds,
}

impl GameMode {
    /// Identify the game mode of the given mode script,
    /// f.e. "TrackMania/TM_TimeAttack_Online.Script.txt".
    ///
    /// Returns `None` for modes that the ranking service does not support.
    pub fn from_script(script_name: &str) -> Option<GameMode> {
        let name = script_name.to_lowercase();
        if name.contains("timeattack") || name.contains("laps") {
            Some(GameMode::TimeAttack)
        } else if name.contains("rounds") || name.contains("team") || name.contains("cup") {
            Some(GameMode::Rounds)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::TimeAttack => "TA",
            GameMode::Rounds => "Rounds",
        }
    }
}

/// The map that is currently being played.
#[derive(Debug, Clone, PartialEq)]
pub struct MapContext {
    pub uid: String,
    pub name: String,
    pub environment: String,
    pub author: String,
    pub nb_checkpoints: i32,
    pub nb_laps: i32,

    /// `None` if records set in the running mode are not tracked.
    pub game_mode: Option<GameMode>,
}

impl MapContext {
    pub fn new(map: &MapInfo, game_mode: Option<GameMode>) -> Self {
        MapContext {
            uid: map.uid.clone(),
            name: map.name.formatted.clone(),
            environment: map.environment.clone(),
            author: map.author_login.clone(),
            nb_checkpoints: map.nb_checkpoints,
            nb_laps: map.nb_laps,
            game_mode,
        }
    }

    fn to_value(&self) -> Value {
        vec![
            ("UId", Value::from(self.uid.as_str())),
            ("Name", Value::from(self.name.as_str())),
            ("Environment", Value::from(self.environment.as_str())),
            ("Author", Value::from(self.author.as_str())),
            ("NbCheckpoints", Value::from(self.nb_checkpoints)),
            ("NbLaps", Value::from(self.nb_laps)),
        ]
        .into_iter()
        .collect()
    }
}

/// A connected player, as reported to the ranking service.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEntry {
    pub login: String,
    pub is_spectator: bool,
}

impl PlayerEntry {
    fn to_value(&self) -> Value {
        vec![
            ("Login", Value::from(self.login.as_str())),
            ("IsSpec", Value::from(self.is_spectator)),
        ]
        .into_iter()
        .collect()
    }
}

/// Server information as displayed by the ranking service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerStatus {
    pub name: String,
    pub comment: String,
    pub private: bool,
    pub nb_players: usize,
    pub max_players: i32,
    pub nb_spectators: usize,
    pub max_spectators: i32,
}

impl ServerStatus {
    pub fn new(options: &ServerOptions, players: &[PlayerEntry]) -> Self {
        let nb_spectators = players.iter().filter(|p| p.is_spectator).count();
        ServerStatus {
            name: options.name.formatted.clone(),
            comment: options.comment.formatted.clone(),
            private: options.is_private(),
            nb_players: players.len() - nb_spectators,
            max_players: options.current_max_players,
            nb_spectators,
            max_spectators: options.current_max_spectators,
        }
    }

    fn to_value(&self) -> Value {
        vec![
            ("SrvName", Value::from(self.name.as_str())),
            ("Comment", Value::from(self.comment.as_str())),
            ("Private", Value::from(self.private)),
            ("NumPlayers", Value::from(self.nb_players)),
            ("MaxPlayers", Value::from(self.max_players)),
            ("NumSpecs", Value::from(self.nb_spectators)),
            ("MaxSpecs", Value::from(self.max_spectators)),
        ]
        .into_iter()
        .collect()
    }
}

/// Replays that accompany the submitted records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Replays {
    /// The validation replay of the best submitted record.
    pub validation: Vec<u8>,

    /// The ghost replay of the top record, if it is submitted.
    pub top_ghost: Vec<u8>,
}

fn player_list(players: &[PlayerEntry]) -> Value {
    Value::Array(players.iter().map(PlayerEntry::to_value).collect())
}

/// Checkpoint splits are sent as a comma-separated list.
fn join_splits(splits: &[i32]) -> String {
    splits
        .iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_splits(splits: &str) -> Vec<i32> {
    splits
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect()
}

pub fn open_session(identity: &ServerIdentity) -> Call {
    let info: Value = vec![
        ("Game", Value::from(GAME)),
        ("Login", Value::from(identity.login.as_str())),
        ("Code", Value::from(identity.auth_code.as_str())),
        ("Path", Value::from(identity.path.as_str())),
        ("Packmask", Value::from(identity.pack_mask.as_str())),
        ("ServerVersion", Value::from(identity.server_version.as_str())),
        ("ServerBuild", Value::from(identity.server_build.as_str())),
        ("Tool", Value::from(identity.tool.as_str())),
        ("Version", Value::from(identity.tool_version.as_str())),
    ]
    .into_iter()
    .collect();
    Call::new("dedimania.OpenSession", vec![info])
}

pub fn check_session(session_id: &str) -> Call {
    Call::new("dedimania.CheckSession", vec![Value::from(session_id)])
}

pub fn get_challenge_records(
    session_id: &str,
    map: &MapContext,
    mode: GameMode,
    status: &ServerStatus,
    players: &[PlayerEntry],
) -> Call {
    Call::new(
        "dedimania.GetChallengeRecords",
        vec![
            Value::from(session_id),
            map.to_value(),
            Value::from(mode.as_str()),
            status.to_value(),
            player_list(players),
        ],
    )
}

pub fn player_connect(
    session_id: &str,
    login: &str,
    nick_name: &str,
    path: &str,
    is_spectator: bool,
) -> Call {
    Call::new(
        "dedimania.PlayerConnect",
        vec![
            Value::from(session_id),
            Value::from(login),
            Value::from(nick_name),
            Value::from(path),
            Value::from(is_spectator),
        ],
    )
}

pub fn player_disconnect(session_id: &str, login: &str) -> Call {
    Call::new(
        "dedimania.PlayerDisconnect",
        vec![Value::from(session_id), Value::from(login), Value::from("")],
    )
}

pub fn update_server_players(
    session_id: &str,
    map: &MapContext,
    mode: GameMode,
    status: &ServerStatus,
    players: &[PlayerEntry],
) -> Call {
    let votes: Value = vec![
        ("UId", Value::from(map.uid.as_str())),
        ("GameMode", Value::from(mode.as_str())),
    ]
    .into_iter()
    .collect();
    Call::new(
        "dedimania.UpdateServerPlayers",
        vec![
            Value::from(session_id),
            status.to_value(),
            votes,
            player_list(players),
        ],
    )
}

pub fn set_challenge_times(
    session_id: &str,
    map: &MapContext,
    mode: GameMode,
    records: &[&Record],
    replays: Replays,
) -> Call {
    let times: Vec<Value> = records
        .iter()
        .map(|rec| {
            vec![
                ("Login", Value::from(rec.login.as_str())),
                ("Best", Value::from(rec.millis)),
                ("Checks", Value::from(join_splits(&rec.checkpoints))),
            ]
            .into_iter()
            .collect::<Value>()
        })
        .collect();
    let replays: Value = vec![
        ("VReplay", Value::Base64(replays.validation)),
        ("VReplayChecks", Value::from("")),
        ("Top1GReplay", Value::Base64(replays.top_ghost)),
    ]
    .into_iter()
    .collect();
    Call::new(
        "dedimania.SetChallengeTimes",
        vec![
            Value::from(session_id),
            map.to_value(),
            Value::from(mode.as_str()),
            Value::Array(times),
            replays,
        ],
    )
}

/// Read the session ID from an `OpenSession` reply.
pub fn read_session(reply: &Value) -> Result<String, MissingField> {
    reply
        .member("SessionId")
        .and_then(Value::as_str)
        .filter(|sid| !sid.is_empty())
        .map(str::to_string)
        .ok_or(MissingField("SessionId"))
}

/// Read a `CheckSession` reply. Anything but `true` means that
/// the session is no longer valid.
pub fn read_check(reply: &Value) -> bool {
    reply.as_bool().unwrap_or(false)
}

/// The leaderboard of a map, as stored by the ranking service.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeRecords {
    pub server_max_rank: usize,
    pub records: Vec<Record>,
    pub players: Vec<RemotePlayer>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecordEntry {
    login: String,
    nick_name: String,
    best: i32,
    #[serde(default)]
    checks: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PlayerRankEntry {
    login: String,
    max_rank: i32,
}

pub fn read_challenge_records(reply: &Value) -> Result<ChallengeRecords, MissingField> {
    let server_max_rank = reply
        .member("ServerMaxRank")
        .and_then(Value::as_int)
        .ok_or(MissingField("ServerMaxRank"))?;
    let records = reply
        .member("Records")
        .and_then(Value::as_array)
        .ok_or(MissingField("Records"))?;
    let players = reply
        .member("Players")
        .and_then(Value::as_array)
        .unwrap_or_default();

    let records = records
        .iter()
        .filter_map(|value| match from_value::<RecordEntry>(value) {
            Ok(entry) if entry.best > 0 => Some(Record {
                login: entry.login,
                nick_name: entry.nick_name,
                millis: entry.best,
                rank: 0,
                checkpoints: parse_splits(&entry.checks),
                is_pending: false,
                validation_replay: None,
                ghost_replay: None,
            }),
            Ok(entry) => {
                log::warn!("skip record of {} with time {}", entry.login, entry.best);
                None
            }
            Err(err) => {
                log::warn!("skip unreadable record: {}", err);
                None
            }
        })
        .collect();

    let players = players
        .iter()
        .filter_map(|value| match from_value::<PlayerRankEntry>(value) {
            Ok(entry) => Some(RemotePlayer::with_max_rank(
                &entry.login,
                rank_or_default(entry.max_rank),
            )),
            Err(err) => {
                log::warn!("skip unreadable player: {}", err);
                None
            }
        })
        .collect();

    Ok(ChallengeRecords {
        server_max_rank: rank_or_default(server_max_rank),
        records,
        players,
    })
}

fn rank_or_default(rank: i32) -> usize {
    if rank > 0 {
        rank as usize
    } else {
        DEFAULT_MAX_RANK
    }
}

/// Read the ranking metadata of a player from a `PlayerConnect` reply.
pub fn read_player_connect(reply: &Value) -> Result<RemotePlayer, MissingField> {
    let login = reply
        .member("Login")
        .and_then(Value::as_str)
        .ok_or(MissingField("Login"))?;
    let max_rank = reply
        .member("MaxRank")
        .and_then(Value::as_int)
        .ok_or(MissingField("MaxRank"))?;

    let flag = |name: &str| reply.member(name).and_then(Value::as_bool).unwrap_or(false);
    let options = match reply.member("ToolOption") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Int(i)) => i.to_string(),
        _ => String::new(),
    };

    Ok(RemotePlayer {
        login: login.to_string(),
        max_rank: rank_or_default(max_rank),
        banned: flag("Banned"),
        options_enabled: flag("OptionsEnabled"),
        options,
    })
}
