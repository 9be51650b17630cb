//! Deterministic tuning oracle
//!
//! Maps a (session seed, note) pair to the detuning level that session hears
//! on that key. Nothing is stored: the level is recomputed from the secret
//! seeds every time it is needed, both when picking the audio file to stream
//! and when judging a submission, so the two can never disagree.
//!
//! # Algorithm
//!
//! 1. Generator words: `[seed + s0, seed + s1, note + s2, note + s3]`
//!    (wrapping 32-bit additions, `s*` from the secret state)
//! 2. Discard the first 200 float draws
//! 3. Level = `floor(next_f64() * 21)`

use std::fmt;

use crate::notes::Note;
use crate::xorshift::XorShift128Plus;
use crate::Result;

/// Draws discarded before the level draw
pub const WARMUP_DRAWS: usize = 200;

/// Number of discrete tuning levels (0..=20)
pub const LEVEL_COUNT: u8 = 21;

/// Physical offset units between adjacent levels
pub const LEVEL_STEP: i32 = 5;

/// Physical offset of level 0
pub const LEVEL_BASE_OFFSET: i32 = -50;

/// Fixed pitch bias applied when rendering every level, in cents
const RENDER_BIAS_CENTS: f64 = -12.0;

/// One of the 21 discrete detuning buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TuningLevel(u8);

impl TuningLevel {
    /// Wrap a raw level, returning `None` outside 0..=20
    pub fn new(level: u8) -> Option<Self> {
        (level < LEVEL_COUNT).then_some(TuningLevel(level))
    }

    /// All levels in ascending order
    pub fn all() -> impl Iterator<Item = TuningLevel> {
        (0..LEVEL_COUNT).map(TuningLevel)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Physical offset of this level: `level * 5 - 50`, range -50..=50
    pub fn offset(self) -> i32 {
        i32::from(self.0) * LEVEL_STEP + LEVEL_BASE_OFFSET
    }

    /// Sample-rate multiplier used to render this level from the clean
    /// recording: `2^((offset - 12) / 1200)`
    pub fn playback_rate(self) -> f64 {
        2f64.powf((f64::from(self.offset()) + RENDER_BIAS_CENTS) / 1200.0)
    }

    /// Stem of the rendered audio file for `note` at this level
    pub fn file_stem(self, note: Note) -> String {
        format!("{}-{}", note.name(), self.0)
    }
}

impl fmt::Display for TuningLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Oracle bound to the process's secret seeds
#[derive(Debug, Clone, Copy)]
pub struct TuningOracle {
    seeds: [u32; 4],
}

impl TuningOracle {
    pub fn new(seeds: [u32; 4]) -> Self {
        Self { seeds }
    }

    /// Target level for a note identifier, failing with `InvalidNote` for
    /// identifiers outside the catalogue
    pub fn tuning_for(&self, note: &str, session_seed: u32) -> Result<TuningLevel> {
        let note = Note::from_name(note)?;
        Ok(self.level(note, session_seed))
    }

    /// Target level for a resolved note
    pub fn level(&self, note: Note, session_seed: u32) -> TuningLevel {
        let mut rng = XorShift128Plus::from_words(self.generator_words(note, session_seed));
        rng.skip(WARMUP_DRAWS);

        let level = (rng.next_f64() * f64::from(LEVEL_COUNT)).floor() as u8;
        // next_f64 is below 1.0; clamp anyway
        TuningLevel(level.min(LEVEL_COUNT - 1))
    }

    fn generator_words(&self, note: Note, session_seed: u32) -> [u32; 4] {
        let index = note.index();
        [
            session_seed.wrapping_add(self.seeds[0]),
            session_seed.wrapping_add(self.seeds[1]),
            index.wrapping_add(self.seeds[2]),
            index.wrapping_add(self.seeds[3]),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    const SEEDS: [u32; 4] = [0x9e37_79b9, 0x7f4a_7c15, 0x85eb_ca6b, 0xc2b2_ae35];

    fn levels(oracle: &TuningOracle, session_seed: u32) -> Vec<u8> {
        Note::all()
            .map(|note| oracle.level(note, session_seed).value())
            .collect()
    }

    #[test]
    fn test_pinned_levels() {
        let oracle = TuningOracle::new(SEEDS);
        assert_eq!(
            levels(&oracle, 12345),
            vec![5, 10, 18, 6, 20, 20, 17, 18, 4, 0, 13, 7, 15, 6, 5, 19, 8, 4, 14, 1, 16, 7, 12, 15, 9]
        );
    }

    #[test]
    fn test_pinned_levels_with_wrapping_seed() {
        // 4_000_000_000 + seed word overflows 32 bits
        let oracle = TuningOracle::new(SEEDS);
        assert_eq!(
            levels(&oracle, 4_000_000_000),
            vec![11, 14, 12, 2, 5, 16, 2, 3, 0, 15, 17, 13, 10, 9, 4, 12, 17, 11, 5, 20, 19, 14, 3, 11, 10]
        );
    }

    #[test]
    fn test_pinned_levels_zero_secrets() {
        let oracle = TuningOracle::new([0; 4]);
        assert_eq!(
            levels(&oracle, 0),
            vec![0, 0, 5, 4, 9, 20, 16, 5, 7, 10, 8, 5, 2, 11, 12, 4, 16, 1, 20, 14, 14, 20, 1, 16, 12]
        );
    }

    #[test]
    fn test_repeated_calls_agree() {
        let oracle = TuningOracle::new(SEEDS);
        for seed in [0, 1, 99, u32::MAX] {
            for note in Note::all() {
                assert_eq!(oracle.level(note, seed), oracle.level(note, seed));
            }
        }
        let copy = TuningOracle::new(SEEDS);
        assert_eq!(levels(&oracle, 777), levels(&copy, 777));
    }

    #[test]
    fn test_levels_always_in_range() {
        let oracle = TuningOracle::new([u32::MAX, 3, u32::MAX - 7, 0]);
        for seed in (0..u32::MAX).step_by(97_000_013) {
            for note in Note::all() {
                assert!(oracle.level(note, seed).value() < LEVEL_COUNT);
            }
        }
    }

    #[test]
    fn test_generator_words_differ_per_note_and_seed() {
        let oracle = TuningOracle::new(SEEDS);
        let c4 = Note::from_name("C4").unwrap();
        let d4 = Note::from_name("D4").unwrap();
        assert_ne!(oracle.generator_words(c4, 1), oracle.generator_words(d4, 1));
        assert_ne!(oracle.generator_words(c4, 1), oracle.generator_words(c4, 2));
    }

    #[test]
    fn test_tuning_for_by_name() {
        let oracle = TuningOracle::new(SEEDS);
        let a4 = Note::from_name("A4").unwrap();
        assert_eq!(oracle.tuning_for("A4", 12345).unwrap(), oracle.level(a4, 12345));
        assert!(matches!(
            oracle.tuning_for("H4", 12345),
            Err(Error::InvalidNote(_))
        ));
    }

    #[test]
    fn test_level_offsets() {
        assert_eq!(TuningLevel::new(0).unwrap().offset(), -50);
        assert_eq!(TuningLevel::new(10).unwrap().offset(), 0);
        assert_eq!(TuningLevel::new(20).unwrap().offset(), 50);
        assert_eq!(TuningLevel::new(21), None);
        assert_eq!(TuningLevel::all().count(), 21);
    }

    #[test]
    fn test_playback_rate_and_file_stem() {
        let level = TuningLevel::new(10).unwrap();
        let rate = level.playback_rate();
        assert!((rate - 2f64.powf(-12.0 / 1200.0)).abs() < 1e-12);
        assert!(TuningLevel::new(20).unwrap().playback_rate() > rate);

        let note = Note::from_name("F#4").unwrap();
        assert_eq!(level.file_stem(note), "F#4-10");
    }
}
