//! Builder for creating and configuring Tracker instances.

use std::path::{Path, PathBuf};

use tokio::task;

use super::{Tracker, DEFAULT_INVITE_BASE_URL};
use crate::{
    db::Database,
    error::{Result, TrackerError},
    models::UserId,
    realtime::{ChangeFeed, DEFAULT_FEED_CAPACITY},
};

/// Builder for creating and configuring Tracker instances.
#[derive(Debug, Clone)]
pub struct TrackerBuilder {
    database_path: Option<PathBuf>,
    user: Option<UserId>,
    invite_base_url: Option<String>,
    feed_capacity: usize,
    feed: Option<ChangeFeed>,
}

impl TrackerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            database_path: None,
            user: None,
            invite_base_url: None,
            feed_capacity: DEFAULT_FEED_CAPACITY,
            feed: None,
        }
    }

    /// Sets a custom database file path.
    ///
    /// If not specified, uses XDG Base Directory specification:
    /// `$XDG_DATA_HOME/steptags/steptags.db` or
    /// `~/.local/share/steptags/steptags.db`
    pub fn with_database_path<P: AsRef<Path>>(mut self, path: Option<P>) -> Self {
        if let Some(path) = path {
            self.database_path = Some(path.as_ref().to_path_buf());
        }
        self
    }

    /// Sets the user the tracker acts as. Every operation except
    /// construction needs one.
    pub fn with_user<U: Into<UserId>>(mut self, user: Option<U>) -> Self {
        if let Some(user) = user {
            self.user = Some(user.into());
        }
        self
    }

    /// Base URL invite links point at.
    pub fn with_invite_base_url(mut self, url: impl Into<String>) -> Self {
        self.invite_base_url = Some(url.into());
        self
    }

    /// Events each subscriber may fall behind by before it is told to
    /// reload.
    pub fn with_feed_capacity(mut self, capacity: usize) -> Self {
        self.feed_capacity = capacity;
        self
    }

    /// Publish on an existing feed instead of a new one.
    pub fn with_feed(mut self, feed: ChangeFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Builds the configured tracker instance.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::FileSystem` if the database directory cannot
    /// be created.
    /// Returns `TrackerError::Database` if database initialization fails.
    pub async fn build(self) -> Result<Tracker> {
        let db_path = if let Some(path) = self.database_path {
            path
        } else {
            Self::default_database_path()?
        };

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| TrackerError::FileSystem {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let db_path_clone = db_path.clone();
        task::spawn_blocking(move || {
            let _db = Database::new(&db_path_clone)?;
            Ok::<(), TrackerError>(())
        })
        .await
        .map_err(|e| TrackerError::Configuration {
            message: format!("Task join error: {e}"),
        })??;
        log::debug!("Tracker database ready at {}", db_path.display());

        let feed = self
            .feed
            .unwrap_or_else(|| ChangeFeed::new(self.feed_capacity));
        let invite_base_url = self
            .invite_base_url
            .unwrap_or_else(|| DEFAULT_INVITE_BASE_URL.to_string());
        Ok(Tracker::new(db_path, self.user, feed, invite_base_url))
    }

    /// Returns the default database path following XDG Base Directory
    /// specification.
    fn default_database_path() -> Result<PathBuf> {
        xdg::BaseDirectories::with_prefix("steptags")
            .place_data_file("steptags.db")
            .map_err(|e| TrackerError::XdgDirectory(e.to_string()))
    }
}

impl Default for TrackerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
