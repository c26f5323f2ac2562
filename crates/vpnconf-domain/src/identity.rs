use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Numeric account identity used for ownership and ACL checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(u32);

impl Principal {
    #[must_use]
    pub const fn new(uid: u32) -> Self {
        Self(uid)
    }

    #[must_use]
    pub const fn uid(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Principal {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(Self)
    }
}

impl From<u32> for Principal {
    fn from(uid: u32) -> Self {
        Self(uid)
    }
}
