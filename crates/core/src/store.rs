//! Durable game state storage.

use std::sync::Arc;
use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::outcome::TransitionError;
use crate::state::GameState;

/// File name of the persisted state inside the store directory.
pub const STATE_FILE: &str = "state.json";

struct Inner {
    path: PathBuf,
    state: Mutex<GameState>,
}

/// Shared handle to the persisted game state.
///
/// Clones share one in-memory image and one backing file. All mutation
/// goes through [`StateStore::apply`], which keeps the two in step.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<Inner>,
}

impl StateStore {
    /// Opens the store rooted at `dir`, restoring any persisted state.
    ///
    /// A missing file starts fresh. An unreadable one is left on disk
    /// and play starts from defaults; the next accepted transition
    /// overwrites it.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let path = dir.into().join(STATE_FILE);
        let state = match read_state(&path) {
            Ok(Some(state)) => {
                debug!(path = %path.display(), "restored persisted state");
                state
            }
            Ok(None) => GameState::default(),
            Err(err) => {
                warn!("failed to restore state from {}: {err:#}", path.display());
                GameState::default()
            }
        };
        Self {
            inner: Arc::new(Inner {
                path,
                state: Mutex::new(state),
            }),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Snapshot of the current state.
    pub fn get(&self) -> GameState {
        self.inner.state.lock().clone()
    }

    /// Runs `transition` against a working copy, then commits and
    /// persists it if the transition accepted.
    ///
    /// A rejected transition leaves both memory and file untouched. When
    /// only the file write fails the in-memory commit still happens and
    /// the returned flag is false, so callers can tell the player the
    /// session is running unsaved.
    pub fn apply<T, F>(&self, transition: F) -> Result<(T, bool), TransitionError>
    where
        F: FnOnce(&mut GameState) -> Result<T, TransitionError>,
    {
        let mut guard = self.inner.state.lock();
        let mut working = guard.clone();
        let value = transition(&mut working)?;
        let persisted = match write_state(&self.inner.path, &working) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    "failed to persist state to {}: {err:#}",
                    self.inner.path.display()
                );
                false
            }
        };
        *guard = working;
        Ok((value, persisted))
    }

    /// Re-derives the claimed-today flag from the last claim date.
    ///
    /// Returns true only when the flag flipped from claimed back to
    /// claimable, which is what a calendar-day rollover looks like. The
    /// resync is persisted best-effort.
    pub fn refresh_daily_flag(&self, today: NaiveDate) -> bool {
        let mut guard = self.inner.state.lock();
        let claimed = guard.claimed_today(today);
        if guard.daily_reward_claimed == claimed {
            return false;
        }
        let was_claimed = guard.daily_reward_claimed;
        guard.daily_reward_claimed = claimed;
        if let Err(err) = write_state(&self.inner.path, &guard) {
            warn!(
                "failed to persist state to {}: {err:#}",
                self.inner.path.display()
            );
        }
        was_claimed && !claimed
    }

    /// Deletes the persisted file and resets memory to defaults.
    pub fn reset(&self) -> Result<()> {
        let mut guard = self.inner.state.lock();
        if self.inner.path.exists() {
            fs::remove_file(&self.inner.path)
                .with_context(|| format!("failed to remove {}", self.inner.path.display()))?;
        }
        *guard = GameState::default();
        debug!("state reset to defaults");
        Ok(())
    }
}

fn read_state(path: &Path) -> Result<Option<GameState>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let state = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(state))
}

fn write_state(path: &Path, state: &GameState) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let serialised = serde_json::to_vec_pretty(state)?;
    fs::write(path, serialised).with_context(|| format!("failed to write {}", path.display()))
}
