//! Encoder-side compression parameters.
//!
//! The LZSS match finder is tuned by a sliding-window size and a lookahead
//! limit. Both live in a [`CompressionProfile`] that the caller threads
//! through the encode path; the decoder never needs them, because offsets
//! and lengths are transmitted explicitly per match.

use std::fmt;
use std::str::FromStr;

/// Minimum back-reference length; shorter matches are emitted as literals.
pub const MIN_MATCH: usize = 3;

/// Smallest supported sliding window (4 KiB).
pub const WINDOW_MIN: usize = 4 * 1024;

/// Largest supported sliding window (8 MiB).
pub const WINDOW_MAX: usize = 8 * 1024 * 1024;

/// Smallest supported lookahead.
pub const LOOKAHEAD_MIN: usize = 18;

/// Largest supported lookahead; also the maximum encodable match length.
pub const LOOKAHEAD_MAX: usize = 255;

/// Window size and lookahead for one encode run.
///
/// Values outside the supported ranges normalise silently: an unsupported
/// window reverts to 4 KiB, a lookahead clamps to [18, 255].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionProfile {
    window_size: usize,
    lookahead: usize,
}

impl CompressionProfile {
    /// 4 KiB window, lookahead 18.
    pub const FASTEST: Self = Self {
        window_size: 4 * 1024,
        lookahead: 18,
    };

    /// 32 KiB window, lookahead 32.
    pub const FAST: Self = Self {
        window_size: 32 * 1024,
        lookahead: 32,
    };

    /// 256 KiB window, lookahead 64.
    pub const BALANCED: Self = Self {
        window_size: 256 * 1024,
        lookahead: 64,
    };

    /// 1 MiB window, lookahead 128.
    pub const SLOW: Self = Self {
        window_size: 1024 * 1024,
        lookahead: 128,
    };

    /// 8 MiB window, lookahead 255.
    pub const ARCHIVE: Self = Self {
        window_size: 8 * 1024 * 1024,
        lookahead: 255,
    };

    /// Create a profile, normalising both parameters.
    pub fn new(window_size: usize, lookahead: usize) -> Self {
        let mut profile = Self::FASTEST;
        profile.set_window_size(window_size);
        profile.set_lookahead(lookahead);
        profile
    }

    /// Assign a new window size.
    ///
    /// Supported range is 4 KiB to 8 MiB in multiples of 4; anything else
    /// reverts to 4 KiB.
    pub fn set_window_size(&mut self, window_size: usize) {
        if window_size % 4 != 0 || !(WINDOW_MIN..=WINDOW_MAX).contains(&window_size) {
            self.window_size = WINDOW_MIN;
            return;
        }
        self.window_size = window_size;
    }

    /// The sliding-window size in bytes.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Assign a new lookahead, clamped to [18, 255].
    pub fn set_lookahead(&mut self, lookahead: usize) {
        self.lookahead = lookahead.clamp(LOOKAHEAD_MIN, LOOKAHEAD_MAX);
    }

    /// The maximum match length considered at each position.
    pub fn lookahead(&self) -> usize {
        self.lookahead
    }

    /// The preset name, if this profile matches one.
    pub fn preset_name(&self) -> Option<&'static str> {
        match *self {
            Self::FASTEST => Some("fastest"),
            Self::FAST => Some("fast"),
            Self::BALANCED => Some("balanced"),
            Self::SLOW => Some("slow"),
            Self::ARCHIVE => Some("archive"),
            _ => None,
        }
    }
}

impl Default for CompressionProfile {
    fn default() -> Self {
        Self::FASTEST
    }
}

impl fmt::Display for CompressionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.preset_name() {
            Some(name) => write!(f, "{name}"),
            None => write!(
                f,
                "custom (window {} bytes, lookahead {})",
                self.window_size, self.lookahead
            ),
        }
    }
}

impl FromStr for CompressionProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fastest" => Ok(Self::FASTEST),
            "fast" => Ok(Self::FAST),
            "balanced" => Ok(Self::BALANCED),
            "slow" => Ok(Self::SLOW),
            "archive" => Ok(Self::ARCHIVE),
            other => Err(format!("compression mode '{other}' does not exist")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(CompressionProfile::FASTEST.window_size(), 4096);
        assert_eq!(CompressionProfile::FASTEST.lookahead(), 18);
        assert_eq!(CompressionProfile::ARCHIVE.window_size(), 8 * 1024 * 1024);
        assert_eq!(CompressionProfile::ARCHIVE.lookahead(), 255);
    }

    #[test]
    fn test_window_normalises_silently() {
        let mut profile = CompressionProfile::BALANCED;
        profile.set_window_size(4095); // below range
        assert_eq!(profile.window_size(), WINDOW_MIN);

        profile.set_window_size(WINDOW_MAX + 4);
        assert_eq!(profile.window_size(), WINDOW_MIN);

        profile.set_window_size(8190); // not a multiple of 4
        assert_eq!(profile.window_size(), WINDOW_MIN);

        profile.set_window_size(8192);
        assert_eq!(profile.window_size(), 8192);
    }

    #[test]
    fn test_lookahead_clamps() {
        let mut profile = CompressionProfile::default();
        profile.set_lookahead(1);
        assert_eq!(profile.lookahead(), LOOKAHEAD_MIN);
        profile.set_lookahead(4000);
        assert_eq!(profile.lookahead(), LOOKAHEAD_MAX);
        profile.set_lookahead(100);
        assert_eq!(profile.lookahead(), 100);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "balanced".parse::<CompressionProfile>().unwrap(),
            CompressionProfile::BALANCED
        );
        assert!("best".parse::<CompressionProfile>().is_err());
    }
}
