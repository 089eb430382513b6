use crate::controller::Controller;
use crate::dedimania::*;

use super::ConnectedPlayer;

impl Controller {
    pub(super) async fn on_player_connect(&mut self, login: &str, is_spectator: bool) {
        let info = match self.server.detailed_player_info(login).await {
            Ok(info) => info,
            Err(fault) => {
                // the player has likely left already
                log::debug!("no player info for {}: {}", login, fault);
                return;
            }
        };
        let player = ConnectedPlayer {
            nick_name: info.nick_name.formatted,
            path: info.path,
            is_spectator,
        };

        if let Some(session_id) = self.session.session_id() {
            let call = player_connect(
                session_id,
                login,
                &player.nick_name,
                &player.path,
                player.is_spectator,
            );
            self.post(RequestKind::PlayerConnect, &call);
        }
        self.players.insert(login.to_string(), player);
    }

    pub(super) fn on_player_disconnect(&mut self, login: &str) {
        if self.players.remove(login).is_none() {
            return;
        }
        if let Some(session_id) = self.session.session_id() {
            let call = player_disconnect(session_id, login);
            self.post(RequestKind::PlayerDisconnect, &call);
        }
    }
}
