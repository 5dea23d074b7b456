/// Host platform detection
use crate::cli::ParseMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Darwin,
    Other,
}

impl Platform {
    /// Detect the platform this binary was built for
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" => Platform::Linux,
            "macos" => Platform::Darwin,
            _ => Platform::Other,
        }
    }

    /// Suffix of the Istio release archive published for this platform
    pub fn release_os(&self) -> &'static str {
        match self {
            Platform::Darwin => "osx",
            Platform::Linux | Platform::Other => "linux-amd64",
        }
    }

    /// Only GNU getopt understands long options
    pub fn parse_mode(&self) -> ParseMode {
        match self {
            Platform::Linux => ParseMode::Gnu,
            Platform::Darwin | Platform::Other => ParseMode::Bsd,
        }
    }
}
