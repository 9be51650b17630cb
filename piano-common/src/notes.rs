//! Note catalogue
//!
//! The puzzle piano has 25 keys. Each key has a fixed index that feeds the
//! tuning oracle and names the pre-rendered audio files, so the order of
//! [`NOTE_NAMES`] must never change: reordering it silently retunes every
//! session and breaks the mapping to rendered assets.

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Number of keys on the puzzle piano
pub const NOTE_COUNT: usize = 25;

/// Note identifiers in index order
pub const NOTE_NAMES: [&str; NOTE_COUNT] = [
    "C#5", "D#5", "F#5", "G#5", "A#5", "C4", "C#4", "D4", "D#4", "E4", "F4", "F#4", "G4", "G#4",
    "A4", "A#4", "B4", "C5", "D5", "E5", "F5", "G5", "A5", "B5", "C6",
];

/// One key of the puzzle piano, identified by its fixed index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Note(u8);

impl Note {
    /// Look up a note by identifier (e.g. `"C#4"`)
    pub fn from_name(name: &str) -> Result<Self> {
        NOTE_NAMES
            .iter()
            .position(|candidate| *candidate == name)
            .map(|index| Note(index as u8))
            .ok_or_else(|| Error::InvalidNote(name.to_string()))
    }

    /// Look up a note by index (0..25)
    pub fn from_index(index: usize) -> Option<Self> {
        (index < NOTE_COUNT).then_some(Note(index as u8))
    }

    /// Index of this note in the catalogue
    pub fn index(self) -> u32 {
        u32::from(self.0)
    }

    /// Identifier of this note
    pub fn name(self) -> &'static str {
        NOTE_NAMES[self.0 as usize]
    }

    /// All notes in index order
    pub fn all() -> impl Iterator<Item = Note> {
        (0..NOTE_COUNT as u8).map(Note)
    }

    /// Check the shape of a note identifier: letter A-G, optional sharp,
    /// octave 4-6. Passing this check does not mean the note exists
    /// (`"B#6"` is well-formed but not on the piano).
    pub fn is_well_formed(name: &str) -> bool {
        let bytes = name.as_bytes();
        let (letter, rest) = match bytes.split_first() {
            Some((letter, rest)) => (*letter, rest),
            None => return false,
        };
        if !(b'A'..=b'G').contains(&letter) {
            return false;
        }
        let octave = match rest {
            [b'#', octave] => *octave,
            [octave] => *octave,
            _ => return false,
        };
        (b'4'..=b'6').contains(&octave)
    }
}

impl FromStr for Note {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Note::from_name(s)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_order_is_fixed() {
        assert_eq!(Note::from_name("C#5").unwrap().index(), 0);
        assert_eq!(Note::from_name("A#5").unwrap().index(), 4);
        assert_eq!(Note::from_name("C4").unwrap().index(), 5);
        assert_eq!(Note::from_name("A4").unwrap().index(), 14);
        assert_eq!(Note::from_name("C6").unwrap().index(), 24);
    }

    #[test]
    fn test_names_are_unique() {
        let mut names = NOTE_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), NOTE_COUNT);
    }

    #[test]
    fn test_unknown_note_rejected() {
        assert!(matches!(Note::from_name("H4"), Err(Error::InvalidNote(_))));
        assert!(matches!(Note::from_name("C7"), Err(Error::InvalidNote(_))));
        assert!(matches!(Note::from_name(""), Err(Error::InvalidNote(_))));
        assert!(matches!("c4".parse::<Note>(), Err(Error::InvalidNote(_))));
    }

    #[test]
    fn test_all_round_trips_through_names() {
        for note in Note::all() {
            assert_eq!(Note::from_name(note.name()).unwrap(), note);
            assert_eq!(Note::from_index(note.index() as usize), Some(note));
        }
        assert_eq!(Note::all().count(), NOTE_COUNT);
        assert_eq!(Note::from_index(NOTE_COUNT), None);
    }

    #[test]
    fn test_well_formed_identifiers() {
        assert!(Note::is_well_formed("C4"));
        assert!(Note::is_well_formed("F#5"));
        assert!(Note::is_well_formed("B#6"));
        assert!(!Note::is_well_formed("C3"));
        assert!(!Note::is_well_formed("H4"));
        assert!(!Note::is_well_formed("C##4"));
        assert!(!Note::is_well_formed("Cb4"));
        assert!(!Note::is_well_formed("C4 "));
        assert!(!Note::is_well_formed(""));
    }
}
