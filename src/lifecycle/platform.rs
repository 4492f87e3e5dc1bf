//! Host platform detection for the lifecycle probe.

use std::fmt;

use serde::{Serialize, Serializer};

/// Operating system family, as far as service management is concerned.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Platform {
    /// Linux with `systemctl`.
    Linux,
    /// macOS with Homebrew services.
    MacOs,
    /// Windows with `net start`.
    Windows,
    /// Anything else, keyed by the raw OS identifier.
    Other(String),
}

impl Platform {
    /// Platform of the running process.
    #[must_use]
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a Rust OS identifier (`std::env::consts::OS`) to a platform.
    #[must_use]
    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" => Self::Linux,
            "macos" => Self::MacOs,
            "windows" => Self::Windows,
            other => Self::Other(other.to_string()),
        }
    }

    /// Conventional system name reported to the UI (`Linux`, `Darwin`, `Windows`).
    #[must_use]
    pub fn system_name(&self) -> &str {
        match self {
            Self::Linux => "Linux",
            Self::MacOs => "Darwin",
            Self::Windows => "Windows",
            Self::Other(name) => name,
        }
    }

    /// Program used to locate an executable on `PATH`.
    #[must_use]
    pub const fn lookup_program(&self) -> &'static str {
        match self {
            Self::Windows => "where",
            _ => "which",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.system_name())
    }
}

impl Serialize for Platform {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.system_name())
    }
}
