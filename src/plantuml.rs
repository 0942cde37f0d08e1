//! URL encoding understood by PlantUML servers: raw DEFLATE at maximum
//! compression, then a 6-bit alphabet of `0-9A-Za-z-_`, three bytes to four
//! characters, zero-padded.

use std::io::Write;

use flate2::Compression;
use flate2::write::DeflateEncoder;

/// Encode diagram source into a PlantUML server path segment.
pub fn encode(source: &str) -> String {
    encode64(&deflate(source.as_bytes()))
}

/// Full image URL for `source` on the server at `server`.
pub fn url(server: &str, format: &str, source: &str) -> String {
    format!("{}/{}/{}", server.trim_end_matches('/'), format, encode(source))
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    // Writing into a Vec cannot fail
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}

fn encode6bit(b: u8) -> char {
    let b = b & 0x3F;
    match b {
        0..=9 => char::from(b'0' + b),
        10..=35 => char::from(b'A' + b - 10),
        36..=61 => char::from(b'a' + b - 36),
        62 => '-',
        _ => '_',
    }
}

fn append3bytes(out: &mut String, b1: u8, b2: u8, b3: u8) {
    let c1 = b1 >> 2;
    let c2 = ((b1 & 0x3) << 4) | (b2 >> 4);
    let c3 = ((b2 & 0xF) << 2) | (b3 >> 6);
    let c4 = b3 & 0x3F;
    out.push(encode6bit(c1));
    out.push(encode6bit(c2));
    out.push(encode6bit(c3));
    out.push(encode6bit(c4));
}

fn encode64(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        match *chunk {
            [b1, b2, b3] => append3bytes(&mut out, b1, b2, b3),
            [b1, b2] => append3bytes(&mut out, b1, b2, 0),
            [b1] => append3bytes(&mut out, b1, 0, 0),
            _ => {}
        }
    }
    out
}
