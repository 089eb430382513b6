use crate::controller::Controller;
use crate::dedimania::*;
use crate::server::MapInfo;

impl Controller {
    /// Forget the records of the previous map, and fetch the records
    /// of the new one.
    pub(super) async fn on_map_begin(&mut self, map: MapInfo) {
        let mode = self.server.mode().await;
        let game_mode = GameMode::from_script(&mode.file_name);
        if game_mode.is_none() {
            log::info!("records are not tracked in mode {}", &mode.file_name);
        }

        self.map = Some(MapContext::new(&map, game_mode));
        self.store.clear();
        self.replays.reset();
        self.fetch_records().await;
    }

    /// Submit the records that were set on this server.
    pub(super) fn on_map_end(&mut self) {
        let pending = self.store.pending();
        if pending.is_empty() {
            return;
        }
        let nb_pending = pending.len();

        let (session_id, context, mode) = match self.leaderboard_context() {
            Some(ctx) => ctx,
            None => {
                log::warn!("cannot submit {} records without a session", nb_pending);
                self.store.clear_pending();
                return;
            }
        };

        let top_ghost = match self.store.records().first() {
            Some(top) if top.is_pending => top.ghost_replay.clone(),
            _ => None,
        };
        let replays = Replays {
            validation: pending[0].validation_replay.clone().unwrap_or_default(),
            top_ghost: top_ghost.unwrap_or_default(),
        };

        log::info!("submit {} records", nb_pending);
        let call = set_challenge_times(session_id, context, mode, &pending, replays);
        self.post(RequestKind::SetChallengeTimes, &call);
        self.store.clear_pending();
    }
}
