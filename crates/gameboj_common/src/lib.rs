//! Hardware-agnostic helpers shared by the emulator crates: fixed-width
//! bit manipulation on words and an immutable bit vector used by the
//! display pipeline.

pub mod bit_vector;
pub mod bits;

pub use bit_vector::{BitVector, BitVectorBuilder};
