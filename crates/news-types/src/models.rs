use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed set of reactions a user may attach to a post.
///
/// Stored and sent over the wire by name (`"Fire"`), rendered by symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Emoji {
    Good,
    Bad,
    Shame,
    Like,
    Fire,
}

impl Emoji {
    pub const ALL: [Emoji; 5] = [Emoji::Good, Emoji::Bad, Emoji::Shame, Emoji::Like, Emoji::Fire];

    pub fn name(self) -> &'static str {
        match self {
            Emoji::Good => "Good",
            Emoji::Bad => "Bad",
            Emoji::Shame => "Shame",
            Emoji::Like => "Like",
            Emoji::Fire => "Fire",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Emoji::Good => "\u{1F44D}",
            Emoji::Bad => "\u{1F44E}",
            Emoji::Shame => "\u{1F926}\u{1F3FB}\u{200D}\u{2642}",
            Emoji::Like => "\u{2764}\u{FE0F}",
            Emoji::Fire => "\u{1F525}",
        }
    }
}

impl fmt::Display for Emoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown emoji '{0}'")]
pub struct UnknownEmoji(pub String);

impl FromStr for Emoji {
    type Err = UnknownEmoji;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emoji::ALL
            .into_iter()
            .find(|e| e.name() == s)
            .ok_or_else(|| UnknownEmoji(s.to_string()))
    }
}
