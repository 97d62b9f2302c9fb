// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Advisory file locking for the shared report file.
//!
//! Grounded on the same `flock`-around-a-descriptor idiom as
//! `ddtelemetry::ipc::platform::unix::locks::FLock`, adapted to guard a
//! single already-open file handle for the duration of a header or event
//! write rather than owning the file for the life of the lock.

use nix::fcntl::{flock, FlockArg};
use std::fs::File;
use std::os::unix::io::AsRawFd;

/// Holds an exclusive advisory lock (`flock(2)`, `LOCK_EX`) on `file` for
/// the lifetime of the guard; released on drop.
pub struct ExclusiveLock<'a> {
    file: &'a File,
}

impl<'a> ExclusiveLock<'a> {
    /// Blocks until the exclusive lock on `file` is acquired.
    pub fn acquire(file: &'a File) -> std::io::Result<Self> {
        flock(file.as_raw_fd(), FlockArg::LockExclusive)?;
        Ok(Self { file })
    }
}

impl Drop for ExclusiveLock<'_> {
    fn drop(&mut self) {
        let _ = flock(self.file.as_raw_fd(), FlockArg::Unlock);
    }
}

/// Probes whether the report file at `path` already exists. The first
/// process to observe its absence becomes the **root process** and is
/// responsible for writing the header and footer.
///
/// This is a filesystem race, not a lock acquisition: two processes may
/// both observe "missing" and both attempt to create the file, in which
/// case whichever wins the subsequent `File::create` is root in practice.
/// A safer alternative would lock a well-known coordination file first;
/// behavior is retained here for compatibility with the reference
/// implementation.
pub fn report_file_missing(path: &str) -> bool {
    std::fs::metadata(path).is_err()
}
