//! # Animal identifiers
//!
//! Animals are keyed by a human-readable `animal_id` of the form `A<n>`,
//! e.g. `A1` or `A42`. New ids are handed out by taking the greatest stored
//! id and adding one.

use std::fmt;
use std::str::FromStr;

/// Field every animal record is keyed by.
pub const ANIMAL_ID_FIELD: &str = "animal_id";

const PREFIX: char = 'A';

/// A parsed `animal_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnimalId(u64);

impl AnimalId {
    /// The id handed out when the collection holds nothing usable.
    pub const FIRST: AnimalId = AnimalId(1);

    pub fn new(number: u64) -> Self {
        Self(number)
    }

    pub fn number(&self) -> u64 {
        self.0
    }

    /// The id following this one, or `None` if the counter would overflow.
    pub fn next(&self) -> Option<AnimalId> {
        self.0.checked_add(1).map(AnimalId)
    }
}

impl fmt::Display for AnimalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PREFIX, self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed animal_id {0:?}")]
pub struct ParseAnimalIdError(String);

impl FromStr for AnimalId {
    type Err = ParseAnimalIdError;

    /// Accepts any single leading ASCII letter followed by decimal digits.
    /// Formatting always writes the `A` prefix back.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseAnimalIdError(s.to_string());

        let mut chars = s.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() => {}
            _ => return Err(malformed()),
        }

        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        digits.parse::<u64>().map(AnimalId).map_err(|_| malformed())
    }
}
