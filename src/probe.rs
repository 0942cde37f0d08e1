//! Pixel dimensions from raw PNG or JPEG bytes, without decoding the image.

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";
const MIN_LEN: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Read width and height from a PNG or JPEG header.
///
/// Returns `None` for buffers shorter than 24 bytes, for other formats and
/// for JPEG streams that end before a frame header.
pub fn probe(bytes: &[u8]) -> Option<Dimensions> {
    if bytes.len() < MIN_LEN {
        return None;
    }
    if bytes.starts_with(PNG_SIGNATURE) {
        return png(bytes);
    }
    if bytes.starts_with(&[0xFF, 0xD8]) {
        return jpeg(bytes);
    }
    None
}

fn png(bytes: &[u8]) -> Option<Dimensions> {
    // IHDR is always the first chunk: width and height follow its type tag.
    Some(Dimensions {
        width: be_u32(bytes, 16)?,
        height: be_u32(bytes, 20)?,
    })
}

fn jpeg(bytes: &[u8]) -> Option<Dimensions> {
    let mut i = 2;
    loop {
        if *bytes.get(i)? != 0xFF {
            return None;
        }
        // Markers may be preceded by any number of fill bytes
        while *bytes.get(i)? == 0xFF {
            i += 1;
        }
        let marker = *bytes.get(i)?;
        i += 1;

        match marker {
            // Standalone markers carry no length
            0x01 | 0xD0..=0xD8 => continue,
            // End of image or start of scan before any frame header
            0xD9 | 0xDA => return None,
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                // length(2) precision(1) height(2) width(2)
                let height = be_u16(bytes, i + 3)?;
                let width = be_u16(bytes, i + 5)?;
                return Some(Dimensions {
                    width: u32::from(width),
                    height: u32::from(height),
                });
            }
            _ => {
                let length = usize::from(be_u16(bytes, i)?);
                if length < 2 {
                    return None;
                }
                i += length;
            }
        }
    }
}

fn be_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let slice = bytes.get(at..at + 2)?;
    Some(u16::from_be_bytes([slice[0], slice[1]]))
}

fn be_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let slice = bytes.get(at..at + 4)?;
    Some(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Signature plus an IHDR chunk header; enough for the probe.
    fn png_header(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
        bytes
    }

    fn jpeg_with_frame(frame_marker: u8, width: u16, height: u16) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8];
        // APP0 segment
        bytes.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
        bytes.extend_from_slice(b"JFIF\0");
        bytes.extend_from_slice(&[1, 1, 0, 0, 1, 0, 1, 0, 0]);
        // DHT segment, shares the SOF range but is not a frame
        bytes.extend_from_slice(&[0xFF, 0xC4, 0x00, 0x05, 0x00, 0x00, 0x00]);
        bytes.extend_from_slice(&[0xFF, frame_marker, 0x00, 0x11, 0x08]);
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&[0x03; 10]);
        bytes
    }

    #[test]
    fn png_dimensions() {
        assert_eq!(
            probe(&png_header(320, 180)),
            Some(Dimensions {
                width: 320,
                height: 180
            })
        );
    }

    #[test]
    fn short_buffers_are_rejected() {
        let header = png_header(320, 180);
        assert_eq!(probe(&header[..23]), None);
        assert_eq!(probe(&[]), None);
    }

    #[test]
    fn jpeg_skips_non_frame_markers() {
        assert_eq!(
            probe(&jpeg_with_frame(0xC0, 640, 480)),
            Some(Dimensions {
                width: 640,
                height: 480
            })
        );
        assert_eq!(
            probe(&jpeg_with_frame(0xC2, 17, 9)),
            Some(Dimensions {
                width: 17,
                height: 9
            })
        );
    }

    #[test]
    fn truncated_jpeg_is_none() {
        let bytes = jpeg_with_frame(0xC0, 640, 480);
        assert_eq!(probe(&bytes[..30]), None);
    }

    #[test]
    fn unknown_format_is_none() {
        assert_eq!(probe(b"GIF89a and some more padding bytes"), None);
    }
}
