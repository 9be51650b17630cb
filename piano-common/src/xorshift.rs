//! xorshift128+ pseudorandom generator
//!
//! Seeded from four 32-bit words, high word first: `s0 = w0:w1`,
//! `s1 = w2:w3`. Shift triple is (23, 18, 5). The float draw keeps the top
//! 52 bits of each output, so a given seed yields the same `[0, 1)` stream
//! as the audio assets were rendered against.
//!
//! Not cryptographically secure. Unpredictability of oracle answers comes
//! from the secret seeds mixed into the state, not from this generator.

use rand::RngCore;

/// 2^-52, scale for turning a 52-bit integer into a float in `[0, 1)`
const F64_SCALE: f64 = 1.0 / (1u64 << 52) as f64;

/// xorshift128+ generator state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorShift128Plus {
    s0: u64,
    s1: u64,
}

impl XorShift128Plus {
    /// Build a generator from four 32-bit seed words
    pub fn from_words(words: [u32; 4]) -> Self {
        Self {
            s0: (u64::from(words[0]) << 32) | u64::from(words[1]),
            s1: (u64::from(words[2]) << 32) | u64::from(words[3]),
        }
    }

    /// Advance the state and return the next 64-bit output
    pub fn step(&mut self) -> u64 {
        let mut x = self.s0;
        let y = self.s1;
        let out = x.wrapping_add(y);

        self.s0 = y;
        x ^= x << 23;
        self.s1 = x ^ y ^ (x >> 18) ^ (y >> 5);

        out
    }

    /// Next value in `[0, 1)` with 52 bits of precision
    pub fn next_f64(&mut self) -> f64 {
        (self.step() >> 12) as f64 * F64_SCALE
    }

    /// Discard `count` float draws
    pub fn skip(&mut self, count: usize) {
        for _ in 0..count {
            self.step();
        }
    }
}

impl RngCore for XorShift128Plus {
    fn next_u32(&mut self) -> u32 {
        (self.step() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.step()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.step().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
