//! Speech synthesis engines.
//!
//! This module contains implementations of text-to-speech engines.
//!
//! # Available Engines
//!
//! - `concat` - concatenative synthesis from single-phoneme recordings

pub mod concat;
