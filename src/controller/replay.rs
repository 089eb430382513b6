use crate::server::Calls;

/// Remembers whether ghost replays can be read on this machine.
///
/// Ghost replays are written to the game server's `UserData/Replays`
/// directory, which is only readable if this controller runs on the
/// same machine. The check is done once per map.
#[derive(Debug, Default)]
pub struct ReplayAccess {
    ghosts_readable: Option<bool>,
}

impl ReplayAccess {
    pub fn reset(&mut self) {
        self.ghosts_readable = None;
    }

    pub async fn ghosts_readable(&mut self, server: &dyn Calls) -> bool {
        if let Some(readable) = self.ghosts_readable {
            return readable;
        }
        let replay_dir = server.user_data_dir().await.join("Replays");
        let readable = server.check_directory_access(&replay_dir).await;
        if !readable {
            log::warn!(
                "cannot read ghost replays in {}; top records are submitted without them",
                replay_dir.display()
            );
        }
        self.ghosts_readable = Some(readable);
        readable
    }
}
