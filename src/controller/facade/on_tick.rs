use crate::controller::Controller;
use crate::dedimania::*;

impl Controller {
    /// Open a session if there is none, or check that the current one is
    /// still valid. Records that could not be fetched before are fetched again.
    pub async fn on_liveness_tick(&mut self) {
        match self.session.on_tick() {
            TickAction::Open { attempt } => {
                let call = open_session(&self.identity);
                self.post(RequestKind::OpenSession { attempt }, &call);
            }
            TickAction::Check { session_id } => {
                self.post(RequestKind::CheckSession, &check_session(&session_id));
                if self.needs_records() {
                    log::debug!("fetch records again");
                    self.fetch_records().await;
                }
            }
        }
    }

    /// Report the connected players.
    pub async fn on_players_tick(&self) {
        let (session_id, map, mode) = match self.leaderboard_context() {
            Some(ctx) => ctx,
            None => return,
        };
        let options = self.server.server_options().await;
        let players = self.player_entries();
        let status = ServerStatus::new(&options, &players);
        let call = update_server_players(session_id, map, mode, &status, &players);
        self.post(RequestKind::UpdateServerPlayers, &call);
    }
}
