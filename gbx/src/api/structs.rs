use regex::Regex;
use serde::{Deserialize, Deserializer};

use lazy_static::lazy_static;

/// Server version information.
///
/// Reference: GetVersion https://doc.maniaplanet.com/dedicated-server/references/xml-rpc-methods
#[derive(Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct ServerInfo {
    /// f.e. "ManiaPlanet" - this is not the display name of the server!
    pub name: String,

    /// f.e. "TMStadium@nadeo"
    pub title_id: String,

    /// f.e. "3.3.0"
    pub version: String,

    /// f.e. "2019-10-23_20_00"
    pub build: String,
}

/// Information about the server account and its connection.
///
/// Reference: GetSystemInfo https://doc.maniaplanet.com/dedicated-server/references/xml-rpc-methods
#[derive(Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct SystemInfo {
    /// The login of the server account.
    pub server_login: String,

    /// f.e. "TMStadium@nadeo"
    pub title_id: String,

    /// The UID of the "player" that represents the server.
    pub server_player_id: i32,

    /// `False` if this is a listen server hosted by a game client.
    pub is_dedicated: bool,
}

/// Server options that default to the values of the `<dedicated>`
/// config in `.../UserData/Config/*.txt`
///
/// Reference: GetServerOptions https://doc.maniaplanet.com/dedicated-server/references/xml-rpc-methods
#[derive(Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct ServerOptions {
    /// The server name, as displayed in the server browser.
    pub name: GameString,

    /// The server comment, as displayed in the server browser.
    pub comment: GameString,

    /// The password needed to connect as a player.
    pub password: String,

    /// The password needed to connect as a spectator.
    #[serde(rename = "PasswordForSpectator")]
    pub password_spectator: String,

    /// The number of player slots.
    pub current_max_players: i32,

    /// The number of spectator slots.
    pub current_max_spectators: i32,
}

impl ServerOptions {
    /// `True` if joining the server requires a password.
    pub fn is_private(&self) -> bool {
        !self.password.is_empty()
    }
}

/// Game mode information.
///
/// Reference: GetModeScriptInfo https://doc.maniaplanet.com/dedicated-server/references/xml-rpc-methods
#[derive(Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct ModeInfo {
    /// The name of the game mode script,
    /// f.e. "TrackMania/TM_TimeAttack_Online.Script.txt".
    #[serde(rename = "Name")]
    pub file_name: String,

    /// Comma-delimited; indicates compatible map types for this mode.
    pub compatible_map_types: String,
}

/// Player information.
///
/// Reference: SPlayerInfo https://doc.maniaplanet.com/dedicated-server/references/xml-rpc-callbacks
/// Reference: GetPlayerInfo https://doc.maniaplanet.com/dedicated-server/references/xml-rpc-methods
#[derive(Deserialize, PartialEq, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct PlayerInfo {
    /// Player UID that is tied to this player while they are connected.
    #[serde(rename = "PlayerId")]
    pub uid: i32,

    /// Player-unique login.
    pub login: String,

    /// Formatted nick name.
    pub nick_name: GameString,

    /// (see functions)
    #[serde(rename = "Flags")]
    flag_digit_mask: i32,

    /// (see functions)
    #[serde(rename = "SpectatorStatus")]
    spectator_digit_mask: i32,
}

impl PlayerInfo {
    /// Build player info without the digit masks of the game server,
    /// for a player that has joined and is not spectating.
    pub fn joined(uid: i32, login: &str, nick_name: &str) -> Self {
        PlayerInfo {
            uid,
            login: login.to_string(),
            nick_name: GameString::from(nick_name.to_string()),
            flag_digit_mask: 101_000_000,
            spectator_digit_mask: 0,
        }
    }

    /// `True` if the player spectates.
    pub fn is_spectator(&self) -> bool {
        // 2_551_010
        //         ^
        self.spectator_digit_mask % 10 == 1
    }

    /// `True` if this information belongs to a player.
    ///
    /// One "player" info will actually contain information about
    /// the server, f.e. "login" will be the server's login.
    pub fn is_player(&self) -> bool {
        // 101_000_000
        //     ^ 1 if server
        self.flag_digit_mask / 100_000 % 10 == 0
    }

    /// `False` if the player has disconnected, `True` otherwise.
    pub fn has_joined(&self) -> bool {
        // 101_000_000 yes
        //   1_000_000 no
        self.flag_digit_mask / 100_000_000 % 10 == 1
    }
}

impl std::fmt::Debug for PlayerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerInfo")
            .field("uid", &self.uid)
            .field("login", &self.login)
            .field("spectator", &self.is_spectator())
            .field("joined", &self.has_joined())
            .finish()
    }
}

/// Detailed player information.
///
/// Reference: GetDetailedPlayerInfo https://doc.maniaplanet.com/dedicated-server/references/xml-rpc-methods
#[derive(Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct DetailedPlayerInfo {
    pub login: String,

    pub nick_name: GameString,

    /// The player's zone, f.e. "World|Europe|Germany".
    pub path: String,

    pub is_spectator: bool,
}

/// Map information.
///
/// Reference: GetCurrentMapInfo https://doc.maniaplanet.com/dedicated-server/references/xml-rpc-methods
#[derive(Deserialize, Debug, PartialEq, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct MapInfo {
    /// A unique identifier.
    #[serde(rename = "UId")]
    pub uid: String,

    /// The formatted map name.
    pub name: GameString,

    /// The map's file name in `.../UserData/Maps`.
    pub file_name: String,

    /// The map author's login.
    #[serde(rename = "Author")]
    pub author_login: String,

    /// f.e. "Stadium" (sic)
    #[serde(rename = "Environnement", default)]
    pub environment: String,

    /// The number of checkpoints, including the finish line.
    #[serde(default)]
    pub nb_checkpoints: i32,

    /// The number of laps for multilap maps, or `-1`.
    #[serde(default)]
    pub nb_laps: i32,
}

/// Run data at the time of crossing any checkpoint or the finish line.
///
/// Reference: https://github.com/maniaplanet/script-xmlrpc/blob/master/XmlRpcListing.md#trackmaniaeventwaypoint
#[derive(Deserialize, Debug, PartialEq, Clone)]
pub struct CheckpointEvent {
    /// The driving player's login.
    #[serde(rename = "login")]
    pub player_login: String,

    /// Total duration of the run up to this checkpoint.
    #[serde(rename = "racetime")]
    pub race_time_millis: i32,

    /// The total durations of this run at the time of passing each checkpoint.
    /// The last element will be equal to `race_time_millis`.
    #[serde(rename = "curracecheckpoints")]
    pub race_time_cp_millis: Vec<i32>,

    /// Checkpoint index; or the number of unique checkpoints crossed
    /// since the beginning of this run minus one.
    #[serde(rename = "checkpointinrace")]
    pub cp_index: i32,

    /// `True` if the player has crossed the finish line.
    #[serde(rename = "isendrace")]
    pub is_finish: bool,
}

/// A string with in-game formatting.
#[derive(PartialEq, Clone)]
pub struct GameString {
    /// The formatted string.
    pub formatted: String,
}

impl GameString {
    pub fn from(str: String) -> Self {
        GameString { formatted: str }
    }

    /// Removes all text formatting.
    ///
    /// References:
    /// - https://doc.maniaplanet.com/client/text-formatting
    /// - https://wiki.xaseco.org/wiki/Text_formatting
    pub fn plain(&self) -> String {
        lazy_static! {
            static ref RE_DOLLAR: Regex = Regex::new(r"\${2}").unwrap();
            static ref RE_FORMATTING: Regex =
                Regex::new(r"\$[A-Fa-f0-9]{3}|\$[wWnNoOiItTsSgGzZpP]|\$[lLhHpP]\[.+]").unwrap();
        }

        let output = RE_DOLLAR.replace_all(&self.formatted, r"\$");
        let output = RE_FORMATTING.replace_all(&output, "");
        output.into_owned()
    }
}

impl std::fmt::Debug for GameString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.plain())
    }
}

impl<'de> Deserialize<'de> for GameString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let formatted: String = Deserialize::deserialize(deserializer)?;
        Ok(GameString { formatted })
    }
}
