use crate::constants::DEFAULT_MAX_RANK;
use crate::controller::Controller;
use crate::dedimania::*;
use crate::server::Value;

impl Controller {
    /// Handle the outcome of a request.
    ///
    /// Completions arrive in any order, and possibly after the session
    /// or the map changed, which is checked before anything is updated.
    pub async fn on_completion(&mut self, completion: Completion) {
        let Completion { ticket, outcome } = completion;

        match ticket.kind {
            RequestKind::OpenSession { attempt } => {
                let result = outcome.and_then(|reply| Ok(read_session(&reply)?));
                if self.session.on_opened(attempt, result) {
                    self.on_session_opened().await;
                }
            }

            RequestKind::CheckSession => {
                let session_id = ticket.session_id.as_deref().unwrap_or_default();
                let result = outcome.map(|reply| read_check(&reply));
                self.session.on_checked(session_id, result);
            }

            _ => match outcome {
                Ok(reply) => self.on_reply(&ticket, &reply),
                Err(err) => self.on_call_failed(&ticket, err),
            },
        }
    }

    /// Players that are already connected have to be announced to the new
    /// session, before the records of the current map are fetched.
    async fn on_session_opened(&mut self) {
        let session_id = match self.session.session_id() {
            Some(sid) => sid,
            None => return,
        };
        for (login, player) in self.players.iter() {
            let call = player_connect(
                session_id,
                login,
                &player.nick_name,
                &player.path,
                player.is_spectator,
            );
            self.post(RequestKind::PlayerConnect, &call);
        }
        self.fetch_records().await;
    }

    fn on_reply(&mut self, ticket: &Ticket, reply: &Value) {
        match ticket.kind {
            RequestKind::GetChallengeRecords => self.on_records_fetched(ticket, reply),
            RequestKind::PlayerConnect => match read_player_connect(reply) {
                Ok(player) => {
                    if player.banned {
                        log::info!("{} is banned from the ranking service", &player.login);
                    }
                    self.store.upsert_player(player);
                }
                Err(err) => log::warn!("incomplete player reply: {}", err),
            },
            kind => log::debug!("{:?} acknowledged", kind),
        }
    }

    fn on_records_fetched(&mut self, ticket: &Ticket, reply: &Value) {
        let map_uid = match &self.map {
            Some(map) => map.uid.clone(),
            None => return,
        };
        let is_current = ticket.map_uid.as_deref() == Some(&map_uid)
            && ticket.session_id.as_deref() == self.session.session_id();
        if !is_current {
            log::debug!("ignore records fetched for a previous map or session");
            return;
        }
        if self.store.is_loaded_for(&map_uid) {
            // Replacing the records would drop new records that are not submitted yet.
            log::debug!("ignore records that were already fetched");
            return;
        }

        match read_challenge_records(reply) {
            Ok(fetched) => {
                log::info!(
                    "fetched {} records, max rank {}",
                    fetched.records.len(),
                    fetched.server_max_rank
                );
                self.store.rebuild(
                    &map_uid,
                    fetched.server_max_rank,
                    fetched.records,
                    fetched.players,
                );
            }
            Err(err) => {
                log::warn!("incomplete records reply: {}; assume no records", err);
                self.store.rebuild(&map_uid, DEFAULT_MAX_RANK, vec![], vec![]);
            }
        }
    }

    /// Faults of session-scoped calls mean that the session is no longer valid.
    /// Other failures only lose the request.
    fn on_call_failed(&mut self, ticket: &Ticket, err: CallError) {
        match &ticket.session_id {
            Some(session_id) if err.is_fault() => {
                log::error!("{:?} failed: {}", ticket.kind, err);
                self.session.invalidate(session_id);
            }
            _ => log::warn!("{:?} failed: {}", ticket.kind, err),
        }
    }
}
