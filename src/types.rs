use crate::consts::{
    DEFAULT_PRIORITY, DMX_UNIVERSE_SIZE, PRIORITY_HIGHEST, UNIVERSE_HIGHEST, UNIVERSE_LOWEST,
};
use core::net::Ipv4Addr;

/// One universe worth of channel data, start code excluded.
pub type DmxData = heapless::Vec<u8, DMX_UNIVERSE_SIZE>;

#[derive(Debug)]
pub struct DeserializationError;

impl core::fmt::Display for DeserializationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "There was a deserialization error.")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DeserializationError {}

/// A sACN universe number between 1 and 63999.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Universe(u16);

impl Universe {
    pub fn new(universe: u16) -> Result<Self, DeserializationError> {
        if !(UNIVERSE_LOWEST..=UNIVERSE_HIGHEST).contains(&universe) {
            return Err(DeserializationError);
        }

        Ok(Self(universe))
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// The multicast group data for this universe is sent to.
    /// The universe number becomes the low two octets of 239.255.0.0.
    pub fn multicast_addr(&self) -> Ipv4Addr {
        let [high, low] = self.0.to_be_bytes();
        Ipv4Addr::new(239, 255, high, low)
    }
}

impl TryFrom<u16> for Universe {
    type Error = DeserializationError;

    fn try_from(universe: u16) -> Result<Self, Self::Error> {
        Self::new(universe)
    }
}

impl From<Universe> for u16 {
    fn from(universe: Universe) -> Self {
        universe.0
    }
}

impl core::fmt::Display for Universe {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A packet priority between 0 and 200. Higher priorities win the merge.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Priority(u8);

impl Priority {
    pub fn new(priority: u8) -> Result<Self, DeserializationError> {
        if priority > PRIORITY_HIGHEST {
            return Err(DeserializationError);
        }

        Ok(Self(priority))
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(DEFAULT_PRIORITY)
    }
}

impl TryFrom<u8> for Priority {
    type Error = DeserializationError;

    fn try_from(priority: u8) -> Result<Self, Self::Error> {
        Self::new(priority)
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.0
    }
}

impl core::fmt::Display for Priority {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How concurrent sources inside the winning priority tier are combined.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MergeMode {
    /// Highest takes precedence. Every channel becomes the largest proposed value.
    #[default]
    Htp,
    /// Latest takes precedence. The most recently heard source wins the whole frame.
    Ltp,
}

impl core::fmt::Display for MergeMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MergeMode::Htp => write!(f, "HTP"),
            MergeMode::Ltp => write!(f, "LTP"),
        }
    }
}

/// What happens to a universe once its last source disappeared.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SourceLossPolicy {
    /// Keep transmitting the last merged frame.
    #[default]
    HoldLast,
    /// Push a single all-zero frame.
    Blank,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// All universe slots are taken.
    TooManyUniverses,
    /// The universe was already registered.
    DuplicateUniverse,
    /// All input port slots are taken.
    TooManyInputPorts,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::TooManyUniverses => write!(f, "all universe slots are taken"),
            ConfigError::DuplicateUniverse => write!(f, "the universe was already registered"),
            ConfigError::TooManyInputPorts => write!(f, "all input port slots are taken"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universe_bounds() {
        assert!(Universe::new(0).is_err());
        assert_eq!(Universe::new(1).unwrap().as_u16(), 1);
        assert_eq!(Universe::new(63999).unwrap().as_u16(), 63999);
        assert!(Universe::new(64000).is_err());
    }

    #[test]
    fn test_universe_multicast_addr() {
        let low = Universe::new(1).unwrap();
        assert_eq!(low.multicast_addr(), Ipv4Addr::new(239, 255, 0, 1));

        let carry = Universe::new(256).unwrap();
        assert_eq!(carry.multicast_addr(), Ipv4Addr::new(239, 255, 1, 0));

        let highest = Universe::new(63999).unwrap();
        assert_eq!(highest.multicast_addr(), Ipv4Addr::new(239, 255, 249, 255));
    }

    #[test]
    fn test_priority_bounds() {
        assert_eq!(Priority::new(0).unwrap().as_u8(), 0);
        assert_eq!(Priority::new(200).unwrap().as_u8(), 200);
        assert!(Priority::new(201).is_err());
        assert_eq!(Priority::default().as_u8(), 100);
    }
}
