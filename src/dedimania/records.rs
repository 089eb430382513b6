use std::collections::HashMap;

use crate::constants::DEFAULT_MAX_RANK;

/// A record on the ranking service.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub login: String,

    /// Formatted nick name.
    pub nick_name: String,

    pub millis: i32,

    /// The record's position in the store, starting at 1.
    pub rank: usize,

    /// The race time at each checkpoint, including the finish line.
    pub checkpoints: Vec<i32>,

    /// `True` if this record was set on this server, and was not
    /// submitted yet.
    pub is_pending: bool,

    pub validation_replay: Option<Vec<u8>>,
    pub ghost_replay: Option<Vec<u8>>,
}

/// Ranking metadata of a player, as given by the ranking service.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePlayer {
    pub login: String,

    /// The number of records this player may see or set on a map.
    /// Overrides the server's limit if it is larger.
    pub max_rank: usize,

    pub banned: bool,
    pub options_enabled: bool,
    pub options: String,
}

impl RemotePlayer {
    pub fn with_max_rank(login: &str, max_rank: usize) -> Self {
        RemotePlayer {
            login: login.to_string(),
            max_rank,
            banned: false,
            options_enabled: false,
            options: String::new(),
        }
    }
}

/// A finished run that might enter the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub login: String,
    pub nick_name: String,
    pub millis: i32,
    pub checkpoints: Vec<i32>,
}

/// The best record of a player, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Best<'a> {
    /// The player has no record in the store.
    Null,
    Record(&'a Record),
}

impl<'a> Best<'a> {
    /// `True` if this is a record that is strictly faster than the given time.
    ///
    /// A `Null` record never beats any time.
    pub fn beats(&self, millis: i32) -> bool {
        match self {
            Best::Null => false,
            Best::Record(rec) => rec.millis < millis,
        }
    }

    pub fn record(&self) -> Option<&'a Record> {
        match *self {
            Best::Null => None,
            Best::Record(rec) => Some(rec),
        }
    }
}

/// A player's record that was replaced by a better one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Previous {
    pub rank: usize,
    pub millis: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The candidate entered the store at the given rank.
    Inserted {
        rank: usize,
        previous: Option<Previous>,
    },

    /// The candidate is not faster than the player's record, or
    /// would rank beyond the player's limit.
    NotImproved,
}

/// The records of the current map, ordered from best to worst.
///
/// Each login has at most one record, and records with equal times
/// are ordered by submission: the earlier one ranks higher.
#[derive(Debug)]
pub struct RecordStore {
    /// The map the records were fetched for, or `None` if they
    /// were not fetched yet.
    map_uid: Option<String>,

    server_max_rank: usize,

    records: Vec<Record>,

    /// Ranking metadata of players, by login.
    players: HashMap<String, RemotePlayer>,
}

impl Default for RecordStore {
    fn default() -> Self {
        RecordStore::new()
    }
}

impl RecordStore {
    pub fn new() -> Self {
        RecordStore {
            map_uid: None,
            server_max_rank: DEFAULT_MAX_RANK,
            records: Vec::new(),
            players: HashMap::new(),
        }
    }

    /// Replace all records with the ones fetched for the given map.
    pub fn rebuild(
        &mut self,
        map_uid: &str,
        server_max_rank: usize,
        mut records: Vec<Record>,
        players: Vec<RemotePlayer>,
    ) {
        records.sort_by_key(|rec| rec.millis); // stable
        let mut seen = std::collections::HashSet::new();
        records.retain(|rec| seen.insert(rec.login.clone()));

        self.map_uid = Some(map_uid.to_string());
        self.server_max_rank = server_max_rank;
        self.records = records;
        self.rerank();

        for player in players {
            self.merge_max_rank(player);
        }
    }

    /// Forget the records of the previous map. Player metadata is kept.
    pub fn clear(&mut self) {
        self.map_uid = None;
        self.server_max_rank = DEFAULT_MAX_RANK;
        self.records.clear();
    }

    /// `True` if records were fetched for the given map.
    pub fn is_loaded_for(&self, map_uid: &str) -> bool {
        self.map_uid.as_deref() == Some(map_uid)
    }

    pub fn map_uid(&self) -> Option<&str> {
        self.map_uid.as_deref()
    }

    pub fn server_max_rank(&self) -> usize {
        self.server_max_rank
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn player(&self, login: &str) -> Option<&RemotePlayer> {
        self.players.get(login)
    }

    /// The number of records a player may hold a rank in.
    pub fn effective_max_rank(&self, login: &str) -> usize {
        let player_max_rank = self.players.get(login).map(|p| p.max_rank).unwrap_or(0);
        self.server_max_rank.max(player_max_rank)
    }

    pub fn best(&self, login: &str) -> Best<'_> {
        match self.records.iter().find(|rec| rec.login == login) {
            Some(rec) => Best::Record(rec),
            None => Best::Null,
        }
    }

    /// Try to insert a new record, replacing the player's previous one.
    ///
    /// Records that are pushed beyond their own limit by the insertion
    /// are removed. The inserted record is pending submission.
    pub fn try_insert(&mut self, candidate: Candidate) -> InsertOutcome {
        let cap = self.effective_max_rank(&candidate.login);

        let mut insert_at = None;
        let mut previous = None;
        for (idx, rec) in self.records.iter().enumerate() {
            if insert_at.is_none() && idx + 1 > cap {
                return InsertOutcome::NotImproved;
            }
            if rec.login == candidate.login {
                if rec.millis <= candidate.millis {
                    return InsertOutcome::NotImproved;
                }
                previous = Some(idx);
            }
            if insert_at.is_none() && rec.millis > candidate.millis {
                insert_at = Some(idx);
            }
            if insert_at.is_some() && previous.is_some() {
                break;
            }
        }

        let at = match insert_at {
            Some(at) => at,
            None if self.records.len() >= cap => return InsertOutcome::NotImproved,
            None => self.records.len(),
        };

        let replaced = previous.map(|idx| Previous {
            rank: idx + 1,
            millis: self.records[idx].millis,
        });

        self.records.insert(
            at,
            Record {
                login: candidate.login,
                nick_name: candidate.nick_name,
                millis: candidate.millis,
                rank: at + 1,
                checkpoints: candidate.checkpoints,
                is_pending: true,
                validation_replay: None,
                ghost_replay: None,
            },
        );

        // The previous record is always at or after the insertion point.
        if let Some(idx) = previous {
            self.records.remove(idx + 1);
        }

        // Records that moved down by one rank
        let shifted_end = match previous {
            Some(idx) => idx + 1,
            None => self.records.len(),
        };
        // Every eviction moves the following records back up by one rank,
        // so each record is judged by the rank it ends up with.
        let mut idx = at + 1;
        let mut end = shifted_end;
        let mut nb_evicted = 0;
        while idx < end {
            let prev_rank = idx + nb_evicted;
            let new_rank = idx + 1;
            let max_rank = self.effective_max_rank(&self.records[idx].login);
            if new_rank > max_rank && prev_rank <= max_rank {
                let rec = self.records.remove(idx);
                log::debug!("evicted record of {} beyond rank {}", rec.login, max_rank);
                nb_evicted += 1;
                end -= 1;
            } else {
                idx += 1;
            }
        }

        self.rerank();

        InsertOutcome::Inserted {
            rank: at + 1,
            previous: replaced,
        }
    }

    /// Store the replays of a player's record.
    pub fn attach_replays(
        &mut self,
        login: &str,
        validation: Option<Vec<u8>>,
        ghost: Option<Vec<u8>>,
    ) {
        if let Some(rec) = self.records.iter_mut().find(|rec| rec.login == login) {
            if validation.is_some() {
                rec.validation_replay = validation;
            }
            if ghost.is_some() {
                rec.ghost_replay = ghost;
            }
        }
    }

    /// Records that were set on this server, in rank order.
    pub fn pending(&self) -> Vec<&Record> {
        self.records.iter().filter(|rec| rec.is_pending).collect()
    }

    pub fn clear_pending(&mut self) {
        for rec in self.records.iter_mut() {
            rec.is_pending = false;
        }
    }

    /// Insert or replace a player's ranking metadata.
    pub fn upsert_player(&mut self, player: RemotePlayer) {
        self.players.insert(player.login.clone(), player);
    }

    /// Update a player's max rank, and keep the rest of their metadata.
    fn merge_max_rank(&mut self, player: RemotePlayer) {
        match self.players.get_mut(&player.login) {
            Some(known) => known.max_rank = player.max_rank,
            None => {
                self.players.insert(player.login.clone(), player);
            }
        }
    }

    fn rerank(&mut self) {
        for (idx, rec) in self.records.iter_mut().enumerate() {
            rec.rank = idx + 1;
        }
    }
}
