use crate::error::WildflyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 服务器管理模型的版本，不是产品版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
}

impl ServerVersion {
    pub const VERSION_1_7_0: ServerVersion = ServerVersion::new(1, 7, 0);
    pub const VERSION_2_0_0: ServerVersion = ServerVersion::new(2, 0, 0);
    pub const VERSION_4_0_0: ServerVersion = ServerVersion::new(4, 0, 0);
    pub const VERSION_5_0_0: ServerVersion = ServerVersion::new(5, 0, 0);

    pub const fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self { major, minor, micro }
    }

    pub fn less_than(&self, other: ServerVersion) -> bool {
        *self < other
    }

    pub fn greater_than_or_equal(&self, other: ServerVersion) -> bool {
        *self >= other
    }

    pub fn in_range(&self, from_inclusive: ServerVersion, to_exclusive: ServerVersion) -> bool {
        *self >= from_inclusive && *self < to_exclusive
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
    }
}

impl FromStr for ServerVersion {
    type Err = WildflyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(WildflyError::Parse(format!("Invalid server version '{}'", s)));
        }
        let mut numbers = [0u32; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| WildflyError::Parse(format!("Invalid server version '{}'", s)))?;
        }
        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}
