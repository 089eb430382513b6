use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::api::*;
use crate::xml::Fault;

pub type Result<T> = std::result::Result<T, Fault>;

/// Remote procedure calls on the game server.
///
/// Every call might panic if the connection to the game server was interrupted.
///
/// References:
///  - https://doc.maniaplanet.com/dedicated-server/references/xml-rpc-methods
///  - https://github.com/maniaplanet/script-xmlrpc/blob/master/XmlRpcListing.md
#[async_trait]
pub trait Calls: Send + Sync {
    /// Allows authentication by specifying a login and a password,
    /// to gain access to the set of functionality corresponding to this
    /// authorization level. Reading validation replays requires "SuperAdmin"
    /// privileges.
    ///
    /// This function should be called right after establishing a connection
    /// to the game server, to ensure that other calls will work.
    ///
    /// Calls method:
    ///     Authenticate
    async fn authenticate(&self, username: &str, password: &str);

    /// Has to be called in order to receive callbacks.
    ///
    /// Calls methods:
    /// - EnableCallbacks(true)
    /// - XmlRpc.EnableCallbacks(true)
    async fn enable_callbacks(&self);

    /// Instructs the game server to use the supported API version.
    /// Changes callback and structure names, removes deprecated methods etc.
    ///
    /// Calls methods:
    /// - SetApiVersion
    /// - XmlRpc.SetApiVersion
    async fn set_api_version(&self);

    /// Fetch some info about the server version.
    ///
    /// Calls method:
    ///     GetVersion
    async fn server_info(&self) -> ServerInfo;

    /// Fetch the server login and title.
    ///
    /// Calls method:
    ///     GetSystemInfo
    async fn system_info(&self) -> SystemInfo;

    /// Fetch the active server options.
    ///
    /// Calls method:
    ///     GetServerOptions
    async fn server_options(&self) -> ServerOptions;

    /// Fetch some info about the running mode script.
    ///
    /// Calls method:
    ///     GetModeScriptInfo
    async fn mode(&self) -> ModeInfo;

    /// Fetch the list of connected players. This list includes
    /// the "player" that represents the server.
    ///
    /// Calls method:
    ///     GetPlayerList
    async fn players(&self) -> Vec<PlayerInfo>;

    /// Fetch detailed info of a connected player, or of the server login.
    ///
    /// Faults with "Login unknown." if there is no such player.
    ///
    /// Calls method:
    ///     GetDetailedPlayerInfo
    async fn detailed_player_info(&self, login: &str) -> Result<DetailedPlayerInfo>;

    /// Fetch info of the map that is currently being played.
    ///
    /// Calls method:
    ///     GetCurrentMapInfo
    async fn current_map(&self) -> MapInfo;

    /// Fetch the absolute path of the server's `UserData` directory.
    ///
    /// Calls method:
    ///     GameDataDirectory
    async fn user_data_dir(&self) -> PathBuf;

    /// Send a server message to every player.
    ///
    /// Calls method:
    ///     ChatSendServerMessage
    async fn chat_send(&self, msg: &str);

    /// Fetch the validation replay of the player's best run on the current map.
    ///
    /// Faults if the player has no run, or already left the server.
    ///
    /// Calls method:
    ///     GetValidationReplay
    async fn validation_replay(&self, player_login: &str) -> Result<Vec<u8>>;

    /// Fetch the ghost replay of the player's best run on the current map.
    ///
    /// The game server writes the replay into `.../UserData/Replays`, from where
    /// it is read and deleted again. Reading fails if this controller does not
    /// run on the same machine as the game server.
    ///
    /// Calls method:
    ///     SaveBestGhostsReplay
    async fn ghost_replay(&self, player_login: &str) -> Result<std::io::Result<Vec<u8>>>;

    /// Check that the given directory exists and that its entries can be read.
    ///
    /// This is not a server call: it checks the file system of the controller.
    async fn check_directory_access(&self, path: &Path) -> bool {
        match std::fs::read_dir(path) {
            Ok(_) => true,
            Err(err) => {
                log::debug!("cannot access {}: {}", path.display(), err);
                false
            }
        }
    }
}
