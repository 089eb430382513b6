use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_bytes::ByteBuf;

use crate::api::*;
use crate::xml::*;
use crate::RpcClient;

// Simple macro used to reduce 'Value::from' boilerplate.
macro_rules! args {
    ( $( $args:expr ),* ) => {
        vec![$( Value::from($args) ),*]
    };
}

#[async_trait]
impl Calls for RpcClient {
    async fn authenticate(&self, username: &str, password: &str) {
        self.call_method_unwrap_unit("Authenticate", args!(username, password))
            .await;
    }

    async fn enable_callbacks(&self) {
        self.call_method_unwrap_unit("EnableCallbacks", args!(true))
            .await;
        self.call_script("XmlRpc.EnableCallbacks", args!("true"))
            .await;
    }

    async fn set_api_version(&self) {
        self.call_method_unwrap_unit("SetApiVersion", args!(SERVER_API_VERSION))
            .await;
        self.call_script("XmlRpc.SetApiVersion", args!(SCRIPT_API_VERSION))
            .await;
    }

    async fn server_info(&self) -> ServerInfo {
        self.call_method_unwrap("GetVersion", args!()).await
    }

    async fn system_info(&self) -> SystemInfo {
        self.call_method_unwrap("GetSystemInfo", args!()).await
    }

    async fn server_options(&self) -> ServerOptions {
        self.call_method_unwrap("GetServerOptions", args!()).await
    }

    async fn mode(&self) -> ModeInfo {
        self.call_method_unwrap("GetModeScriptInfo", args!()).await
    }

    async fn players(&self) -> Vec<PlayerInfo> {
        self.call_method_unwrap(
            "GetPlayerList",
            args!(-1, 0), // length, offset
        )
        .await
    }

    async fn detailed_player_info(&self, login: &str) -> Result<DetailedPlayerInfo> {
        self.call_method("GetDetailedPlayerInfo", args!(login))
            .await
    }

    async fn current_map(&self) -> MapInfo {
        self.call_method_unwrap("GetCurrentMapInfo", args!()).await
    }

    async fn user_data_dir(&self) -> PathBuf {
        let path_str: String = self.call_method_unwrap("GameDataDirectory", args!()).await;
        let path = Path::new(&path_str);
        path.parent().unwrap_or(path).join("UserData")
    }

    async fn chat_send(&self, msg: &str) {
        // ignore fault caused by having no players connected
        let _ = self
            .call_method_unit("ChatSendServerMessage", args!(msg))
            .await;
    }

    async fn validation_replay(&self, player_login: &str) -> Result<Vec<u8>> {
        let buf: ByteBuf = self
            .call_method("GetValidationReplay", args!(player_login))
            .await?;
        Ok(buf.into_vec())
    }

    async fn ghost_replay(&self, player_login: &str) -> Result<std::io::Result<Vec<u8>>> {
        // The temporary file should never have the same name twice,
        // in case of calls in quick succession.
        let unique_file_name = {
            static COUNTER: AtomicUsize = AtomicUsize::new(1);
            format!("dedi_ghost_{}", COUNTER.fetch_add(1, Ordering::Relaxed))
        };

        // .../UserData/Replays/<file_name>.Replay.Gbx
        let replay_path = self
            .user_data_dir()
            .await
            .join("Replays")
            .join(format!("{}.Replay.Gbx", unique_file_name));

        self.call_method_unit(
            "SaveBestGhostsReplay",
            args!(player_login, unique_file_name),
        )
        .await?;

        Ok(consume_file(&replay_path))
    }
}

impl RpcClient {
    /// Call an XML-RPC method, and handle faults.
    async fn call_method<T>(&self, method_name: &str, args: Vec<Value>) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.call(Call::new(method_name, args)).await
    }

    /// Call an XML-RPC method that does not return a result, and handle faults.
    async fn call_method_unit(&self, method_name: &str, args: Vec<Value>) -> Result<()> {
        self.call_method::<bool>(method_name, args).await.map(|_| ())
    }

    /// Call an XML-RPC method, and do not expect any faults.
    /// This will panic if a fault is encountered.
    async fn call_method_unwrap<T>(&self, method_name: &str, args: Vec<Value>) -> T
    where
        T: serde::de::DeserializeOwned,
    {
        self.call_unwrap(Call::new(method_name, args)).await
    }

    /// Call an XML-RPC method that does not return a result,
    /// and do not expect any faults.
    /// This will panic if a fault is encountered.
    async fn call_method_unwrap_unit(&self, method_name: &str, args: Vec<Value>) {
        let ok: bool = self.call_unwrap(Call::new(method_name, args)).await;
        assert!(ok, "expected {} to return 'true'", method_name);
    }

    /// Call a mode script XML-RPC method.
    /// Script methods that return an answer will send it using a script callback.
    async fn call_script(&self, method_name: &str, args: Vec<Value>) {
        self.call_method_unwrap_unit("TriggerModeScriptEventArray", args!(method_name, args))
            .await;
    }
}

/// Read a file into memory, and delete it.
fn consume_file(file_path: &Path) -> std::io::Result<Vec<u8>> {
    let buffer = fs::read(file_path)?;
    fs::remove_file(file_path)?;
    Ok(buffer)
}
