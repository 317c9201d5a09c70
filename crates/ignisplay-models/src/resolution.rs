use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Playback resolution ceilings, lowest first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResolutionTier {
    #[serde(rename = "480p")]
    Sd480,
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    FullHd1080,
}

/// The tier every identity may play, subscribed or not
pub const FREE_RESOLUTION: ResolutionTier = ResolutionTier::Sd480;

impl ResolutionTier {
    pub const ALL: [ResolutionTier; 3] = [ResolutionTier::Sd480, ResolutionTier::Hd720, ResolutionTier::FullHd1080];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionTier::Sd480 => "480p",
            ResolutionTier::Hd720 => "720p",
            ResolutionTier::FullHd1080 => "1080p",
        }
    }

    pub fn is_premium(&self) -> bool {
        *self != FREE_RESOLUTION
    }
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResolutionTier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Invalid resolution: {}. Use '480p', '720p', or '1080p'", s))
    }
}
