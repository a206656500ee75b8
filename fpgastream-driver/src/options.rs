//! Driver options: stream-path roles and their device paths.

use std::path::{Path, PathBuf};

/// Name this driver registers under.
pub const DRIVER_NAME: &str = "xillybus";

/// The role a named stream plays for the device.
///
/// A Xillybus-style device exposes one character device per role; the
/// driver is configured with a path for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamRole {
    /// Register/configuration access stream.
    Config,
    /// Asynchronous signaling stream.
    Signal,
    /// Device-to-host data stream.
    Read,
    /// Host-to-device data stream.
    Write,
}

impl StreamRole {
    /// All roles, in option order.
    pub const ALL: [StreamRole; 4] = [
        StreamRole::Config,
        StreamRole::Signal,
        StreamRole::Read,
        StreamRole::Write,
    ];

    /// Returns the option name for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamRole::Config => "config",
            StreamRole::Signal => "signal",
            StreamRole::Read => "read",
            StreamRole::Write => "write",
        }
    }
}

impl std::fmt::Display for StreamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device paths for the four stream roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPaths {
    config: PathBuf,
    signal: PathBuf,
    read: PathBuf,
    write: PathBuf,
}

impl StreamPaths {
    /// Returns the path configured for `role`.
    #[must_use]
    pub fn get(&self, role: StreamRole) -> &Path {
        match role {
            StreamRole::Config => &self.config,
            StreamRole::Signal => &self.signal,
            StreamRole::Read => &self.read,
            StreamRole::Write => &self.write,
        }
    }

    /// Sets the path for `role`.
    pub fn set(&mut self, role: StreamRole, path: impl Into<PathBuf>) {
        let path = path.into();
        match role {
            StreamRole::Config => self.config = path,
            StreamRole::Signal => self.signal = path,
            StreamRole::Read => self.read = path,
            StreamRole::Write => self.write = path,
        }
    }
}

impl Default for StreamPaths {
    fn default() -> Self {
        Self {
            config: PathBuf::from("/dev/xillybus_cmd_32"),
            signal: PathBuf::from("/dev/xillybus_signal_8"),
            read: PathBuf::from("/dev/xillybus_data_read_32"),
            write: PathBuf::from("/dev/xillybus_data_write_32"),
        }
    }
}
