//! Record attribute table and comparison semantics

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Attributes of a catalog record
///
/// The first [`Attribute::LOADED`] variants are the romlist columns, in file
/// order. The remainder are mutable or merged-in at load time and never
/// appear in the raw source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Name,
    Title,
    Emulator,
    CloneOf,
    Year,
    Manufacturer,
    Category,
    Players,
    Rotation,
    Control,
    Status,
    DisplayCount,
    DisplayType,
    AltRomname,
    AltTitle,
    Extra,
    Buttons,
    Favourite,
    Tags,
    PlayedCount,
    PlayedTime,
    PlayedLast,
    Score,
    Available,
    Shuffle,
}

/// Number of attributes a record stores
pub const ATTRIBUTE_COUNT: usize = Attribute::ALL.len();

impl Attribute {
    /// All attributes, in storage order
    pub const ALL: &'static [Attribute] = &[
        Attribute::Name,
        Attribute::Title,
        Attribute::Emulator,
        Attribute::CloneOf,
        Attribute::Year,
        Attribute::Manufacturer,
        Attribute::Category,
        Attribute::Players,
        Attribute::Rotation,
        Attribute::Control,
        Attribute::Status,
        Attribute::DisplayCount,
        Attribute::DisplayType,
        Attribute::AltRomname,
        Attribute::AltTitle,
        Attribute::Extra,
        Attribute::Buttons,
        Attribute::Favourite,
        Attribute::Tags,
        Attribute::PlayedCount,
        Attribute::PlayedTime,
        Attribute::PlayedLast,
        Attribute::Score,
        Attribute::Available,
        Attribute::Shuffle,
    ];

    /// The attributes loaded from a romlist row, in column order
    pub const LOADED: &'static [Attribute] = &[
        Attribute::Name,
        Attribute::Title,
        Attribute::Emulator,
        Attribute::CloneOf,
        Attribute::Year,
        Attribute::Manufacturer,
        Attribute::Category,
        Attribute::Players,
        Attribute::Rotation,
        Attribute::Control,
        Attribute::Status,
        Attribute::DisplayCount,
        Attribute::DisplayType,
        Attribute::AltRomname,
        Attribute::AltTitle,
        Attribute::Extra,
        Attribute::Buttons,
    ];

    /// Get the string representation of the attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Name => "Name",
            Attribute::Title => "Title",
            Attribute::Emulator => "Emulator",
            Attribute::CloneOf => "CloneOf",
            Attribute::Year => "Year",
            Attribute::Manufacturer => "Manufacturer",
            Attribute::Category => "Category",
            Attribute::Players => "Players",
            Attribute::Rotation => "Rotation",
            Attribute::Control => "Control",
            Attribute::Status => "Status",
            Attribute::DisplayCount => "DisplayCount",
            Attribute::DisplayType => "DisplayType",
            Attribute::AltRomname => "AltRomname",
            Attribute::AltTitle => "AltTitle",
            Attribute::Extra => "Extra",
            Attribute::Buttons => "Buttons",
            Attribute::Favourite => "Favourite",
            Attribute::Tags => "Tags",
            Attribute::PlayedCount => "PlayedCount",
            Attribute::PlayedTime => "PlayedTime",
            Attribute::PlayedLast => "PlayedLast",
            Attribute::Score => "Score",
            Attribute::Available => "Available",
            Attribute::Shuffle => "Shuffle",
        }
    }

    /// Storage slot of this attribute within a record
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Whether comparisons on this attribute are numeric (floating-point).
    ///
    /// `Year` is not listed here: it compares with [`year_to_int`] semantics.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Attribute::Players
                | Attribute::DisplayCount
                | Attribute::Buttons
                | Attribute::PlayedCount
                | Attribute::PlayedTime
                | Attribute::PlayedLast
                | Attribute::Score
                | Attribute::Shuffle
        )
    }

    /// Whether this attribute belongs to the play-statistics family
    pub fn is_stat(&self) -> bool {
        matches!(
            self,
            Attribute::PlayedCount
                | Attribute::PlayedTime
                | Attribute::PlayedLast
                | Attribute::Score
        )
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Attribute {
    type Err = UnknownAttribute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::ALL
            .iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| UnknownAttribute(s.to_string()))
    }
}

impl Serialize for Attribute {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Attribute {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error returned when an attribute name is not in the fixed table
#[derive(Debug, Error)]
#[error("unknown attribute: '{0}'")]
pub struct UnknownAttribute(pub String);

/// Parse a year string into a comparable integer.
///
/// Strings shorter than four characters are unspecified and compare as zero.
/// Within the first four characters, non-digits act as wildcards filling the
/// remaining decimal places with zero: `"198?"` is 1980, `"19??"` is 1900.
pub fn year_to_int(s: &str) -> i32 {
    let s = s.trim();
    if s.chars().count() < 4 {
        return 0;
    }

    let mut value = 0i32;
    for c in s.chars().take(4) {
        value = value * 10 + c.to_digit(10).map(|d| d as i32).unwrap_or(0);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_parsing() {
        assert_eq!(year_to_int("19??"), 1900);
        assert_eq!(year_to_int("198?"), 1980);
        assert_eq!(year_to_int("1980"), 1980);
        assert_eq!(year_to_int("19"), 0);
        assert_eq!(year_to_int(""), 0);
        assert_eq!(year_to_int("  1984  "), 1984);
        assert_eq!(year_to_int("19645"), 1964);
    }

    #[test]
    fn test_attribute_roundtrip() {
        for attr in Attribute::ALL {
            let parsed: Attribute = attr.as_str().parse().unwrap();
            assert_eq!(parsed, *attr);
        }
    }

    #[test]
    fn test_attribute_parse_case_insensitive() {
        assert_eq!("cloneof".parse::<Attribute>().unwrap(), Attribute::CloneOf);
        assert_eq!("TITLE".parse::<Attribute>().unwrap(), Attribute::Title);
    }

    #[test]
    fn test_attribute_parse_unknown() {
        assert!("Nonsense".parse::<Attribute>().is_err());
    }

    #[test]
    fn test_storage_order_matches_index() {
        for (i, attr) in Attribute::ALL.iter().enumerate() {
            assert_eq!(attr.index(), i);
        }
    }

    #[test]
    fn test_loaded_is_prefix_of_all() {
        assert_eq!(
            &Attribute::ALL[..Attribute::LOADED.len()],
            Attribute::LOADED
        );
    }

    #[test]
    fn test_numeric_flags() {
        assert!(Attribute::PlayedCount.is_numeric());
        assert!(!Attribute::Year.is_numeric());
        assert!(!Attribute::Title.is_numeric());
        assert!(Attribute::Score.is_stat());
        assert!(!Attribute::Favourite.is_stat());
    }
}
