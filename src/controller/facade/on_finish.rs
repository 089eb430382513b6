use crate::chat::ServerMessage;
use crate::constants::MIN_CHECKPOINTS;
use crate::controller::{announce, Controller};
use crate::dedimania::*;
use crate::event::RecordDiff;
use crate::server::CheckpointEvent;

impl Controller {
    /// Try to insert a finished run into the records of the current map,
    /// and announce new records.
    pub(super) async fn on_finish(&mut self, event: CheckpointEvent) {
        let login = event.player_login;
        let millis = event.race_time_millis;

        let map = match &self.map {
            Some(map) if map.game_mode.is_some() => map,
            _ => {
                log::debug!("records are not tracked on this map");
                return;
            }
        };
        if map.nb_checkpoints < MIN_CHECKPOINTS {
            log::debug!("map has too few checkpoints");
            return;
        }
        if !self.store.is_loaded_for(&map.uid) {
            log::debug!("records are not loaded; ignore run of {}", &login);
            return;
        }
        if millis <= 0 {
            log::debug!("ignore run of {} with time {}", &login, millis);
            return;
        }
        let nick_name = match self.players.get(&login) {
            Some(player) => player.nick_name.clone(),
            None => {
                log::debug!("ignore run of unknown player {}", &login);
                return;
            }
        };

        // Equal times are attempted as well.
        if self.store.best(&login).beats(millis) {
            return;
        }

        let candidate = Candidate {
            login: login.clone(),
            nick_name: nick_name.clone(),
            millis,
            checkpoints: event.race_time_cp_millis,
        };
        let (new_rank, previous) = match self.store.try_insert(candidate) {
            InsertOutcome::Inserted { rank, previous } => (rank, previous),
            InsertOutcome::NotImproved => return,
        };
        log::info!("{} set the {}. record: {}ms", &login, new_rank, millis);

        self.fetch_replays(&login, new_rank).await;

        let diff = RecordDiff {
            login,
            nick_name,
            millis,
            new_rank,
            previous,
        };
        announce(&*self.server, ServerMessage::new_record(&diff)).await;
    }

    /// Every submitted record needs a validation replay, and the top record
    /// also needs a ghost replay.
    async fn fetch_replays(&mut self, login: &str, rank: usize) {
        let validation = match self.server.validation_replay(login).await {
            Ok(replay) => Some(replay),
            Err(fault) => {
                log::warn!("no validation replay for {}: {}", login, fault);
                None
            }
        };

        let ghost = if rank == 1 && self.replays.ghosts_readable(&*self.server).await {
            match self.server.ghost_replay(login).await {
                Ok(Ok(replay)) => Some(replay),
                Ok(Err(err)) => {
                    log::warn!("cannot read ghost replay of {}: {}", login, err);
                    None
                }
                Err(fault) => {
                    log::warn!("no ghost replay for {}: {}", login, fault);
                    None
                }
            }
        } else {
            None
        };

        self.store.attach_replays(login, validation, ghost);
    }
}
