//! Header decoding.

pub mod header;
