use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteQueryResult;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }
}

/// A play about to be recorded; `play_id` is assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMediaPlay {
    pub user_id: String,
    pub video_id: String,
    pub title: String,
    /// Length in seconds.
    pub duration: i64,
    pub played_on: DateTime<Utc>,
}

/// Polarity of a vote. Stored as `1` / `-1`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "i8", into = "i8")]
pub enum Vote {
    Up,
    Down,
}

impl Vote {
    pub fn as_i8(self) -> i8 {
        match self {
            Vote::Up => 1,
            Vote::Down => -1,
        }
    }
}

impl From<Vote> for i8 {
    fn from(v: Vote) -> Self {
        v.as_i8()
    }
}

impl TryFrom<i8> for Vote {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Vote::Up),
            -1 => Ok(Vote::Down),
            other => Err(format!("vote must be 1 or -1, got {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaVote {
    /// The voter.
    pub user_id: String,
    pub play_id: i64,
    pub vote: Vote,
}

/// Outcome of a single write statement.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct WriteResult {
    /// Rowid of the inserted (or replacing) row; `None` when nothing changed.
    pub inserted_id: Option<i64>,
    pub rows_changed: u64,
}

impl From<SqliteQueryResult> for WriteResult {
    fn from(res: SqliteQueryResult) -> Self {
        let rows_changed = res.rows_affected();
        Self {
            inserted_id: (rows_changed > 0).then(|| res.last_insert_rowid()),
            rows_changed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteTally {
    pub positive: i64,
    pub negative: i64,
}

impl VoteTally {
    /// Build a tally from `(vote, count)` rows as returned by a `GROUP BY vote`
    /// query. Rows may come back in any order.
    pub fn from_grouped_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (i64, i64)>,
    {
        rows.into_iter()
            .fold(VoteTally::default(), |mut tally, (vote, count)| {
                match vote {
                    1 => tally.positive = count,
                    -1 => tally.negative = count,
                    other => warn!(vote = other, count, "ignoring unexpected vote value"),
                }
                tally
            })
    }

    pub fn score(&self) -> i64 {
        self.positive - self.negative
    }

    pub fn total(&self) -> i64 {
        self.positive + self.negative
    }
}

/// Everything the bot reports about one user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStats {
    pub user_id: String,
    pub plays: i64,
    /// Votes received on the user's own plays.
    pub incoming: VoteTally,
    /// Votes the user has cast.
    pub outgoing: VoteTally,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_ignores_row_order() {
        let a = VoteTally::from_grouped_rows([(-1, 3), (1, 5)]);
        let b = VoteTally::from_grouped_rows([(1, 5), (-1, 3)]);
        assert_eq!(a, b);
        assert_eq!(
            a,
            VoteTally {
                positive: 5,
                negative: 3
            }
        );
        assert_eq!(a.score(), 2);
        assert_eq!(a.total(), 8);
    }

    #[test]
    fn tally_handles_missing_groups() {
        assert_eq!(VoteTally::from_grouped_rows(Vec::new()), VoteTally::default());
        assert_eq!(
            VoteTally::from_grouped_rows([(-1, 1)]),
            VoteTally {
                positive: 0,
                negative: 1
            }
        );
        assert_eq!(
            VoteTally::from_grouped_rows([(0, 9), (1, 2)]),
            VoteTally {
                positive: 2,
                negative: 0
            }
        );
    }

    #[test]
    fn vote_serializes_as_signed_unit() {
        assert_eq!(serde_json::to_string(&Vote::Down).unwrap(), "-1");
        assert_eq!(serde_json::from_str::<Vote>("1").unwrap(), Vote::Up);
        assert!(serde_json::from_str::<Vote>("2").is_err());
    }
}
