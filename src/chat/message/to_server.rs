use std::fmt::{Display, Formatter};

use crate::chat::message::{fmt_time, write_and_reset, write_highlighted, write_start_message};
use crate::event::RecordDiff;

/// Chat announcements from the controller to all players.
pub enum ServerMessage<'a> {
    /// A player reached a better rank on the ranking service.
    RecordGained {
        nick_name: &'a str,
        rank: usize,
        millis: i32,
        millis_gained: Option<i32>,
    },

    /// A player improved their record, but kept the same rank.
    RecordImproved {
        nick_name: &'a str,
        rank: usize,
        millis: i32,
        millis_gained: Option<i32>,
    },
}

impl<'a> ServerMessage<'a> {
    pub fn new_record(diff: &'a RecordDiff) -> Self {
        if diff.gained_rank() {
            ServerMessage::RecordGained {
                nick_name: &diff.nick_name,
                rank: diff.new_rank,
                millis: diff.millis,
                millis_gained: diff.millis_gained(),
            }
        } else {
            ServerMessage::RecordImproved {
                nick_name: &diff.nick_name,
                rank: diff.new_rank,
                millis: diff.millis,
                millis_gained: diff.millis_gained(),
            }
        }
    }
}

impl Display for ServerMessage<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use ServerMessage::*;

        write_start_message(f)?;

        let (verb, nick_name, rank, millis, millis_gained) = match self {
            RecordGained {
                nick_name,
                rank,
                millis,
                millis_gained,
            } => ("gained", nick_name, rank, millis, millis_gained),
            RecordImproved {
                nick_name,
                rank,
                millis,
                millis_gained,
            } => ("improved", nick_name, rank, millis, millis_gained),
        };

        write_and_reset(f, nick_name)?;
        write!(f, " {} the ", verb)?;
        write_highlighted(f, format!("{}.", rank))?;
        write!(f, " Dedimania record! ")?;
        write_highlighted(f, fmt_time(*millis as usize))?;
        if let Some(gained) = millis_gained {
            write!(f, " (-{})", fmt_time(*gained as usize))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedimania::Previous;
    use crate::server::GameString;

    fn plain(msg: &ServerMessage) -> String {
        GameString::from(msg.to_string()).plain()
    }

    #[test]
    fn first_record() {
        let diff = RecordDiff {
            login: "tim".to_string(),
            nick_name: "Tim".to_string(),
            millis: 48_051,
            new_rank: 3,
            previous: None,
        };
        let msg = ServerMessage::new_record(&diff);
        assert_eq!(
            "🔊 Tim gained the 3. Dedimania record! 00:48:051",
            plain(&msg)
        );
    }

    #[test]
    fn improved_record() {
        let diff = RecordDiff {
            login: "tim".to_string(),
            nick_name: "Tim".to_string(),
            millis: 48_051,
            new_rank: 1,
            previous: Some(Previous {
                rank: 1,
                millis: 48_351,
            }),
        };
        let msg = ServerMessage::new_record(&diff);
        assert!(matches!(msg, ServerMessage::RecordImproved { .. }));
        assert_eq!(
            "🔊 Tim improved the 1. Dedimania record! 00:48:051 (-00:00:300)",
            plain(&msg)
        );
    }
}
