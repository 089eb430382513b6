use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::config::DedimaniaConfig;
use crate::dedimania::*;
use crate::network::{PostOptions, Transport};
use crate::server::{Call, Calls};

use super::ReplayAccess;

mod on_completion;
mod on_finish;
mod on_map;
mod on_player;
mod on_server_event;
mod on_tick;

/// This facade owns the state of the ranking service synchronization,
/// and reacts to server events, timer ticks and request completions.
///
/// All of its state is only mutated on the event loop.
pub struct Controller {
    server: Arc<dyn Calls>,
    dispatcher: Dispatcher,
    identity: ServerIdentity,
    session: SessionManager,
    store: RecordStore,

    /// The map that is currently being played.
    map: Option<MapContext>,

    /// Connected players by login.
    players: HashMap<String, ConnectedPlayer>,

    replays: ReplayAccess,
}

#[derive(Debug, Clone)]
struct ConnectedPlayer {
    nick_name: String,
    path: String,
    is_spectator: bool,
}

impl Controller {
    /// Capture the server identity, the current map, and the players that
    /// are already connected.
    ///
    /// Returns the receiver for request completions, which have to be fed
    /// back into `on_completion`.
    pub async fn init(
        config: &DedimaniaConfig,
        server: Arc<dyn Calls>,
        transport: Arc<dyn Transport>,
    ) -> (Controller, UnboundedReceiver<Completion>) {
        let server_info = server.server_info().await;
        let system_info = server.system_info().await;
        let path = match server.detailed_player_info(&system_info.server_login).await {
            Ok(info) => info.path,
            Err(fault) => {
                log::warn!("cannot read the server's zone: {}", fault);
                String::new()
            }
        };
        let identity = ServerIdentity::new(&server_info, &system_info, &path, &config.auth_code);
        log::info!("server identity: {:?}", &identity);

        let options = PostOptions {
            timeout: config.request_timeout(),
            compress: config.compress,
        };
        let (dispatcher, completions) = Dispatcher::new(transport, options);

        let mut controller = Controller {
            server,
            dispatcher,
            identity,
            session: SessionManager::new(),
            store: RecordStore::new(),
            map: None,
            players: HashMap::new(),
            replays: ReplayAccess::default(),
        };

        let current_map = controller.server.current_map().await;
        controller.on_map_begin(current_map).await;

        let joined = controller
            .server
            .players()
            .await
            .into_iter()
            .filter(|info| info.is_player() && info.has_joined());
        for info in joined {
            controller
                .on_player_connect(&info.login, info.is_spectator())
                .await;
        }

        (controller, completions)
    }

    /// The records of the current map.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn session_state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn map(&self) -> Option<&MapContext> {
        self.map.as_ref()
    }

    /// The session, map and mode to make leaderboard calls with,
    /// or `None` if there is no open session, or no tracked map.
    fn leaderboard_context(&self) -> Option<(&str, &MapContext, GameMode)> {
        let session_id = self.session.session_id()?;
        let map = self.map.as_ref()?;
        let mode = map.game_mode?;
        Some((session_id, map, mode))
    }

    /// `True` if the current map is tracked, and its records were not fetched yet.
    fn needs_records(&self) -> bool {
        match &self.map {
            Some(map) => map.game_mode.is_some() && !self.store.is_loaded_for(&map.uid),
            None => false,
        }
    }

    fn player_entries(&self) -> Vec<PlayerEntry> {
        let mut entries: Vec<PlayerEntry> = self
            .players
            .iter()
            .map(|(login, player)| PlayerEntry {
                login: login.clone(),
                is_spectator: player.is_spectator,
            })
            .collect();
        entries.sort_by(|a, b| a.login.cmp(&b.login));
        entries
    }

    /// Post a call with the current session and map.
    fn post(&self, kind: RequestKind, call: &Call) {
        let ticket = Ticket {
            kind,
            session_id: self.session.session_id().map(str::to_string),
            map_uid: self.map.as_ref().map(|map| map.uid.clone()),
        };
        self.dispatcher.post(ticket, call);
    }

    /// Fetch the records of the current map, if there is an open session.
    async fn fetch_records(&self) {
        let (session_id, map, mode) = match self.leaderboard_context() {
            Some(ctx) => ctx,
            None => return,
        };
        let options = self.server.server_options().await;
        let players = self.player_entries();
        let status = ServerStatus::new(&options, &players);
        let call = get_challenge_records(session_id, map, mode, &status, &players);
        self.post(RequestKind::GetChallengeRecords, &call);
    }
}
