use crate::db::models::{MediaVote, NewMediaPlay, User, UserStats, VoteTally, WriteResult};
use crate::db::schema::{
    INSERT_MEDIA_PLAY, PREPARED_STATEMENTS, SELECT_INCOMING_VOTES, SELECT_OUTGOING_VOTES,
    SELECT_PLAY_COUNT, SQLITE_INIT, UPSERT_MEDIA_VOTE, UPSERT_USER,
};
use crate::error::TallyError;
use futures::future::{BoxFuture, FutureExt, Shared};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Executor, Pool, Sqlite};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

pub type SqlitePool = Pool<Sqlite>;

type InitFuture = Shared<BoxFuture<'static, Result<SqlitePool, Arc<sqlx::Error>>>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayOptions {
    /// Have SQLite enforce the declared `FOREIGN KEY` constraints.
    pub enforce_foreign_keys: bool,
}

/// Persistence gateway for plays, votes and users.
///
/// Construction is cheap and never touches the disk. The store is opened (or
/// created and bootstrapped) by the first operation that needs it; every
/// clone of a gateway joins that same one-shot initialization, whose outcome
/// is kept for the gateway's lifetime.
///
/// Reads never fail: storage errors are logged and a zero value is returned.
/// Writes return the storage error to the caller.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    path: PathBuf,
    ready: InitFuture,
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, TallyError> {
        Self::with_options(path, GatewayOptions::default())
    }

    pub fn with_options(path: impl AsRef<Path>, options: GatewayOptions) -> Result<Self, TallyError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() || path.to_str().is_none() {
            return Err(TallyError::InvalidPath(path.display().to_string()));
        }
        let path = path.to_path_buf();
        info!(path = %path.display(), ?options, "vote store gateway created");

        let ready = open_store(path.clone(), options).boxed().shared();
        Ok(Self {
            inner: Arc::new(GatewayInner { path, ready }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// True when both handles share one store and one initialization.
    pub fn same_instance(&self, other: &Gateway) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Wait for the store to be opened and its schema to exist.
    pub async fn ready(&self) -> Result<(), TallyError> {
        self.pool().await.map(|_| ())
    }

    /// Close the store handle. Later reads degrade to zero values and later
    /// writes fail.
    pub async fn close(&self) -> Result<(), TallyError> {
        let pool = self.pool().await?;
        pool.close().await;
        info!(path = %self.inner.path.display(), "vote store closed");
        Ok(())
    }

    async fn pool(&self) -> Result<SqlitePool, TallyError> {
        self.inner.ready.clone().await.map_err(TallyError::Init)
    }

    /// Votes received on plays owned by `user_id`.
    pub async fn incoming_votes_for_user(&self, user_id: &str) -> VoteTally {
        debug!(user_id, "querying incoming votes");
        match self.fetch_tally(SELECT_INCOMING_VOTES, user_id).await {
            Ok(tally) => {
                debug!(user_id, positive = tally.positive, negative = tally.negative, "incoming votes");
                tally
            }
            Err(e) => {
                error!(user_id, error = %e, "failed to query incoming votes");
                VoteTally::default()
            }
        }
    }

    /// Votes cast by `user_id` on any play.
    pub async fn votes_cast_by_user(&self, user_id: &str) -> VoteTally {
        debug!(user_id, "querying votes cast");
        match self.fetch_tally(SELECT_OUTGOING_VOTES, user_id).await {
            Ok(tally) => {
                debug!(user_id, positive = tally.positive, negative = tally.negative, "votes cast");
                tally
            }
            Err(e) => {
                error!(user_id, error = %e, "failed to query votes cast");
                VoteTally::default()
            }
        }
    }

    pub async fn plays_by_user(&self, user_id: &str) -> i64 {
        debug!(user_id, "querying play count");
        let res = async {
            let pool = self.pool().await?;
            let rec: (i64,) = sqlx::query_as(SELECT_PLAY_COUNT)
                .bind(user_id)
                .fetch_one(&pool)
                .await?;
            Ok::<_, TallyError>(rec.0)
        }
        .await;

        match res {
            Ok(count) => {
                debug!(user_id, count, "play count");
                count
            }
            Err(e) => {
                error!(user_id, error = %e, "failed to query play count");
                0
            }
        }
    }

    pub async fn user_stats(&self, user_id: &str) -> UserStats {
        let (plays, incoming, outgoing) = futures::join!(
            self.plays_by_user(user_id),
            self.incoming_votes_for_user(user_id),
            self.votes_cast_by_user(user_id),
        );
        UserStats {
            user_id: user_id.to_string(),
            plays,
            incoming,
            outgoing,
        }
    }

    async fn fetch_tally(&self, sql: &'static str, user_id: &str) -> Result<VoteTally, TallyError> {
        let pool = self.pool().await?;
        let rows: Vec<(i64, i64)> = sqlx::query_as(sql).bind(user_id).fetch_all(&pool).await?;
        Ok(VoteTally::from_grouped_rows(rows))
    }

    /// Record one play. `inserted_id` of the result is the new `play_id`.
    pub async fn insert_media_play(&self, play: &NewMediaPlay) -> Result<WriteResult, TallyError> {
        debug!(user_id = %play.user_id, video_id = %play.video_id, "inserting media play");
        let res = async {
            let pool = self.pool().await?;
            let res = sqlx::query(INSERT_MEDIA_PLAY)
                .bind(&play.video_id)
                .bind(&play.user_id)
                .bind(&play.title)
                .bind(play.duration)
                .bind(play.played_on)
                .execute(&pool)
                .await?;
            Ok::<_, TallyError>(WriteResult::from(res))
        }
        .await
        .inspect_err(|e| {
            error!(user_id = %play.user_id, video_id = %play.video_id, error = %e, "failed to insert media play");
        })?;

        debug!(user_id = %play.user_id, play_id = ?res.inserted_id, "media play inserted");
        Ok(res)
    }

    /// Insert or replace the vote of `vote.user_id` on `vote.play_id`.
    pub async fn upsert_media_vote(&self, vote: &MediaVote) -> Result<WriteResult, TallyError> {
        debug!(user_id = %vote.user_id, play_id = vote.play_id, vote = vote.vote.as_i8(), "upserting media vote");
        let res = async {
            let pool = self.pool().await?;
            let res = sqlx::query(UPSERT_MEDIA_VOTE)
                .bind(vote.play_id)
                .bind(&vote.user_id)
                .bind(i32::from(vote.vote.as_i8()))
                .execute(&pool)
                .await?;
            Ok::<_, TallyError>(WriteResult::from(res))
        }
        .await
        .inspect_err(|e| {
            error!(user_id = %vote.user_id, play_id = vote.play_id, error = %e, "failed to upsert media vote");
        })?;

        debug!(user_id = %vote.user_id, play_id = vote.play_id, rows = res.rows_changed, "media vote upserted");
        Ok(res)
    }

    /// Insert or replace a user; the latest username wins.
    pub async fn upsert_user(&self, user: &User) -> Result<WriteResult, TallyError> {
        debug!(user_id = %user.id, username = %user.username, "upserting user");
        let res = async {
            let pool = self.pool().await?;
            let res = sqlx::query(UPSERT_USER)
                .bind(&user.id)
                .bind(&user.username)
                .execute(&pool)
                .await?;
            Ok::<_, TallyError>(WriteResult::from(res))
        }
        .await
        .inspect_err(|e| {
            error!(user_id = %user.id, error = %e, "failed to upsert user");
        })?;

        debug!(user_id = %user.id, rows = res.rows_changed, "user upserted");
        Ok(res)
    }
}

/// Open the store at `path`, creating and bootstrapping it when it cannot be
/// opened as-is, then warm the statement cache.
async fn open_store(path: PathBuf, options: GatewayOptions) -> Result<SqlitePool, Arc<sqlx::Error>> {
    let connect_opts = SqliteConnectOptions::new()
        .filename(&path)
        .read_only(false)
        .foreign_keys(options.enforce_foreign_keys);

    let pool = match single_connection_pool()
        .connect_with(connect_opts.clone().create_if_missing(false))
        .await
    {
        Ok(pool) => {
            info!(path = %path.display(), "opened existing vote store");
            pool
        }
        Err(e) => {
            info!(path = %path.display(), reason = %e, "vote store not found; creating");
            let pool = single_connection_pool()
                .connect_with(connect_opts.create_if_missing(true))
                .await
                .inspect_err(|e| error!(path = %path.display(), error = %e, "failed to create vote store"))?;
            init_schema(&pool)
                .await
                .inspect_err(|e| error!(path = %path.display(), error = %e, "failed to create schema"))?;
            pool
        }
    };

    prepare_statements(&pool)
        .await
        .inspect_err(|e| error!(path = %path.display(), error = %e, "failed to prepare statements"))?;
    Ok(pool)
}

// One long-lived connection, so statements prepared on it stay cached.
fn single_connection_pool() -> SqlitePoolOptions {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
}

/// Run the bootstrap DDL one statement at a time, each awaited before the next.
async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for stmt in SQLITE_INIT {
        sqlx::query(stmt).execute(pool).await?;
    }
    info!(tables = SQLITE_INIT.len(), "vote store schema created");
    Ok(())
}

async fn prepare_statements(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    for sql in PREPARED_STATEMENTS {
        (&mut *conn).prepare(sql).await?;
    }
    debug!(count = PREPARED_STATEMENTS.len(), "statements prepared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(Gateway::new(""), Err(TallyError::InvalidPath(_))));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_path_is_rejected_at_construction() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = OsStr::from_bytes(b"/tmp/playtally-\xff.sqlite");
        let err = Gateway::new(path).expect_err("non-UTF-8 path must be rejected");
        assert!(matches!(err, TallyError::InvalidPath(_)));
        assert!(err.as_sqlx().is_none());
    }

    #[test]
    fn utf8_path_is_accepted_without_touching_disk() {
        let path = std::env::temp_dir().join("playtally-never-opened/store.sqlite");
        let gateway = Gateway::new(&path).expect("valid path");
        assert_eq!(gateway.path(), path.as_path());
        assert!(!path.exists());
    }
}
