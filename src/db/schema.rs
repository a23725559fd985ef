//! SQL for the vote store: the bootstrap DDL and the six statements the
//! gateway prepares once the store is open.

pub const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL
)
"#;

pub const CREATE_MEDIA_PLAYS: &str = r#"
CREATE TABLE IF NOT EXISTS media_plays (
    play_id INTEGER PRIMARY KEY,
    user_id TEXT NOT NULL,
    video_id TEXT NOT NULL,
    title TEXT NOT NULL,
    duration INTEGER NOT NULL, -- seconds
    played_on DATETIME NOT NULL
)
"#;

pub const CREATE_MEDIA_VOTES: &str = r#"
CREATE TABLE IF NOT EXISTS media_votes (
    user_id TEXT NOT NULL,
    play_id INTEGER NOT NULL,
    vote TINYINT NOT NULL CHECK (vote IN (1, -1)),
    voted_on DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (user_id, play_id),
    FOREIGN KEY (user_id) REFERENCES users(id),
    FOREIGN KEY (play_id) REFERENCES media_plays(play_id)
)
"#;

/// Bootstrap order matters: later tables reference earlier ones.
pub const SQLITE_INIT: [&str; 3] = [CREATE_USERS, CREATE_MEDIA_PLAYS, CREATE_MEDIA_VOTES];

/// Votes received on plays owned by `?`, one row per polarity.
pub const SELECT_INCOMING_VOTES: &str = r#"
SELECT v.vote AS vote, COUNT(*) AS count
FROM media_votes v
JOIN media_plays p ON p.play_id = v.play_id
WHERE p.user_id = ?
GROUP BY v.vote
"#;

pub const SELECT_PLAY_COUNT: &str = "SELECT COUNT(*) AS count FROM media_plays WHERE user_id = ?";

/// Votes cast by `?`, one row per polarity.
pub const SELECT_OUTGOING_VOTES: &str = r#"
SELECT vote, COUNT(*) AS count
FROM media_votes
WHERE user_id = ?
GROUP BY vote
"#;

pub const INSERT_MEDIA_PLAY: &str = r#"
INSERT INTO media_plays (video_id, user_id, title, duration, played_on)
VALUES (?, ?, ?, ?, ?)
"#;

pub const UPSERT_MEDIA_VOTE: &str =
    "INSERT OR REPLACE INTO media_votes (play_id, user_id, vote) VALUES (?, ?, ?)";

pub const UPSERT_USER: &str = "INSERT OR REPLACE INTO users (id, username) VALUES (?, ?)";

pub const PREPARED_STATEMENTS: [&str; 6] = [
    SELECT_INCOMING_VOTES,
    SELECT_PLAY_COUNT,
    SELECT_OUTGOING_VOTES,
    INSERT_MEDIA_PLAY,
    UPSERT_MEDIA_VOTE,
    UPSERT_USER,
];
