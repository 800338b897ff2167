#![allow(dead_code)]

pub mod config;
pub mod mock_bytescale;
pub mod mock_cartesia;
pub mod server;

use std::io::Cursor;

/// Samples of a mono 16-bit WAV file
pub fn wav_samples(bytes: &[u8]) -> Vec<i16> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).expect("valid WAV");
    reader.samples::<i16>().map(|s| s.expect("sample")).collect()
}

/// Number of entries left in a directory
pub fn entries(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map(Iterator::count).unwrap_or(0)
}
