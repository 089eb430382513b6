use crate::dedimania::Previous;

/// A player set a new record on the ranking service.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDiff {
    pub login: String,

    /// Formatted nick name.
    pub nick_name: String,

    pub millis: i32,

    pub new_rank: usize,

    /// The player's replaced record, or `None` if this is their first.
    pub previous: Option<Previous>,
}

impl RecordDiff {
    /// `True` if the player reached a better rank than before.
    /// A first record always counts as a better rank.
    pub fn gained_rank(&self) -> bool {
        match self.previous {
            Some(prev) => self.new_rank < prev.rank,
            None => true,
        }
    }

    /// The number of milliseconds gained over the previous record.
    pub fn millis_gained(&self) -> Option<i32> {
        self.previous.map(|prev| prev.millis - self.millis)
    }
}
