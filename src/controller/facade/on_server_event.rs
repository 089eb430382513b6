use crate::controller::Controller;
use crate::server::ServerEvent;

impl Controller {
    /// Forward server events to the respective handlers.
    pub async fn on_server_event(&mut self, event: ServerEvent) {
        log::debug!("{:?}", &event);
        match event {
            ServerEvent::PlayerConnect {
                login,
                is_spectator,
            } => self.on_player_connect(&login, is_spectator).await,

            ServerEvent::PlayerDisconnect { login } => self.on_player_disconnect(&login),

            ServerEvent::MapBegin { map } => self.on_map_begin(map).await,

            ServerEvent::MapEnd { .. } => self.on_map_end(),

            ServerEvent::RunCheckpoint { event } if event.is_finish => self.on_finish(event).await,

            ServerEvent::RunCheckpoint { .. } => {}
        }
    }
}
