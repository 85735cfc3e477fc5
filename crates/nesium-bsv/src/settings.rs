use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::port::SettingsStore;

/// File extension of movie containers.
pub const MOVIE_EXTENSION: &str = "bsv";

/// In-memory [`SettingsStore`] for frontends without a settings layer of
/// their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovieSettings {
    pub state_slot: i32,
    pub rewind_granularity: u32,
}

impl Default for MovieSettings {
    fn default() -> Self {
        Self {
            state_slot: 0,
            rewind_granularity: 1,
        }
    }
}

impl SettingsStore for MovieSettings {
    fn state_slot(&self) -> i32 {
        self.state_slot
    }

    fn set_rewind_granularity(&mut self, granularity: u32) {
        self.rewind_granularity = granularity;
    }
}

/// Composes the recording path for a save-state slot.
///
/// Positive slots are appended to `base` verbatim (`movie` + slot 3 →
/// `movie3.bsv`); slot 0 and negative slots use `base` alone.
pub fn slot_movie_path(base: &Path, slot: i32) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    if slot > 0 {
        name.push(slot.to_string());
    }
    name.push(".");
    name.push(MOVIE_EXTENSION);
    PathBuf::from(name)
}
