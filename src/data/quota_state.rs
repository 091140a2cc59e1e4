use {
    std::{
        fs, io,
        path::{Path, PathBuf},
    },
    strum_macros::Display,
    thiserror::Error,
};

#[cfg(debug_assertions)]
use crate::config::DF;

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("failed to read quota file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write quota file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file exists but its first line is not a decimal integer.
    /// Fix or delete the file; we never silently reset to the monthly cap.
    #[error("quota file {} does not hold an integer (first line: {content:?})", path.display())]
    Corrupt { path: PathBuf, content: String },
}

/// Where the starting value of the counter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum QuotaOrigin {
    #[strum(to_string = "command-line override")]
    Override,
    #[strum(to_string = "quota file")]
    Disk,
    #[strum(to_string = "monthly cap default")]
    Default,
}

/// Calls left before the monthly quota window resets, mirrored to a one-line text file.
///
/// Single process only: the file is not locked. If several pollers ever share a quota,
/// this is the place to add an advisory lock or move the counter into the SQLite store.
#[derive(Debug)]
pub struct QuotaState {
    remaining_calls: i64,
    storage_path: PathBuf,
    origin: QuotaOrigin,
}

impl QuotaState {
    /// Priority: `override_calls` > value on disk > `monthly_cap`.
    ///
    /// Override and default values are written straight back so the file matches memory.
    /// A value read from disk is already current and the file is left untouched.
    pub fn initialize(
        override_calls: Option<i64>,
        storage_path: impl Into<PathBuf>,
        monthly_cap: i64,
    ) -> Result<Self, QuotaError> {
        let storage_path = storage_path.into();

        let (remaining_calls, origin) = match override_calls {
            Some(calls) => (calls, QuotaOrigin::Override),
            None if storage_path.exists() => {
                (Self::read_from_disk(&storage_path)?, QuotaOrigin::Disk)
            }
            None => (monthly_cap, QuotaOrigin::Default),
        };

        let state = Self {
            remaining_calls,
            storage_path,
            origin,
        };

        if origin != QuotaOrigin::Disk {
            state.persist()?;
        }

        log::info!(
            "Quota: {} calls remaining this month (from {}, file {})",
            state.remaining_calls,
            state.origin,
            state.storage_path.display()
        );

        Ok(state)
    }

    fn read_from_disk(path: &Path) -> Result<i64, QuotaError> {
        let content = fs::read_to_string(path).map_err(|source| QuotaError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let first_line = content.lines().next().unwrap_or("");
        first_line
            .trim()
            .parse::<i64>()
            .map_err(|_| QuotaError::Corrupt {
                path: path.to_path_buf(),
                content: first_line.to_string(),
            })
    }

    /// One call spent. No floor: the counter goes negative if the caller overspends.
    pub fn decrement(&mut self) {
        self.remaining_calls -= 1;
    }

    /// Overwrite the file with the current value.
    pub fn persist(&self) -> Result<(), QuotaError> {
        if !self.storage_path.exists() {
            log::info!(
                "Persistent tracker for remaining calls does not exist. Creating at {}",
                self.storage_path.display()
            );
        }

        fs::write(&self.storage_path, self.remaining_calls.to_string()).map_err(|source| {
            QuotaError::Write {
                path: self.storage_path.clone(),
                source,
            }
        })?;

        #[cfg(debug_assertions)]
        if DF.log_quota_writes {
            log::debug!(
                "Quota: wrote {} to {}",
                self.remaining_calls,
                self.storage_path.display()
            );
        }

        Ok(())
    }

    pub fn current(&self) -> i64 {
        self.remaining_calls
    }

    pub fn origin(&self) -> QuotaOrigin {
        self.origin
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }
}
