//! Raw-sequence handling ahead of the full alignment.
//!
//! Nucleotide samples are translated frame by frame until one of the
//! translations can be anchored onto the reference with exact-match probes.

mod anchor;
mod reading_frame;

pub use anchor::{roughly_align, Anchor, DEFAULT_PROBE_LENGTH};
pub use reading_frame::{translate_codon, OpenReadingFrame, ReadingFrameLocator};
