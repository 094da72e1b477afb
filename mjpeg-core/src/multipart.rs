//! multipart/x-mixed-replace framing for JPEG frames
//!
//! Each part goes out as three writes: the boundary line, the header block and
//! the raw payload. There is no closing delimiter; the next part's boundary
//! terminates the previous payload.
use core::fmt::Write as FmtWrite;
use heapless::String;
use thiserror::Error;

pub const BOUNDARY: &str = "frame";

/// Boundary line emitted before every part, including the first
pub const PART_BOUNDARY: &[u8] = b"\r\n--frame\r\n";

pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

pub const PART_CONTENT_TYPE: &str = "image/jpeg";

/// Stack buffer for one header block. The largest block the encoder can
/// produce (every diagnostic header, all counters at u64::MAX) stays under it.
pub const HEADER_CAPACITY: usize = 192;

pub type PartHeader = String<HEADER_CAPACITY>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("part header exceeds {} bytes", HEADER_CAPACITY)]
    HeaderOverflow,
}

/// Optional per-part diagnostic headers
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartDiagnostics {
    pub frame_number: Option<u64>,
    pub timestamp_ms: Option<u64>,
    pub fps: Option<f32>,
}

impl PartDiagnostics {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Format the header block for a payload of `payload_len` bytes
pub fn encode_header(
    payload_len: usize,
    diagnostics: &PartDiagnostics,
) -> Result<PartHeader, EncodeError> {
    encode_into::<HEADER_CAPACITY>(payload_len, diagnostics)
}

fn encode_into<const N: usize>(
    payload_len: usize,
    diagnostics: &PartDiagnostics,
) -> Result<String<N>, EncodeError> {
    let mut header = String::new();
    write_header(&mut header, payload_len, diagnostics).map_err(|_| EncodeError::HeaderOverflow)?;
    Ok(header)
}

fn write_header<const N: usize>(
    out: &mut String<N>,
    payload_len: usize,
    diagnostics: &PartDiagnostics,
) -> core::fmt::Result {
    write!(out, "Content-Type: {}\r\n", PART_CONTENT_TYPE)?;
    write!(out, "Content-Length: {}\r\n", payload_len)?;
    if let Some(number) = diagnostics.frame_number {
        write!(out, "X-Frame-Number: {}\r\n", number)?;
    }
    if let Some(ms) = diagnostics.timestamp_ms {
        write!(out, "X-Timestamp: {}\r\n", ms)?;
    }
    if let Some(fps) = diagnostics.fps {
        write!(out, "X-FPS: {:.1}\r\n", fps)?;
    }
    out.push_str("\r\n").map_err(|_| core::fmt::Error)
}

/// One encoded part, borrowing the payload from the frame buffer
#[derive(Debug)]
pub struct MultipartPart<'a> {
    header: PartHeader,
    payload: &'a [u8],
}

impl<'a> MultipartPart<'a> {
    pub fn encode(payload: &'a [u8], diagnostics: &PartDiagnostics) -> Result<Self, EncodeError> {
        Ok(Self {
            header: encode_header(payload.len(), diagnostics)?,
            payload,
        })
    }

    pub fn boundary(&self) -> &'static [u8] {
        PART_BOUNDARY
    }

    pub fn header(&self) -> &[u8] {
        self.header.as_bytes()
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// The three wire segments in transmission order
    pub fn segments(&self) -> [&[u8]; 3] {
        [self.boundary(), self.header(), self.payload]
    }

    pub fn wire_len(&self) -> usize {
        PART_BOUNDARY.len() + self.header.len() + self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_minimal_header_bytes() {
        let header = encode_header(1000, &PartDiagnostics::none()).unwrap();
        assert_eq!(
            header.as_str(),
            "Content-Type: image/jpeg\r\nContent-Length: 1000\r\n\r\n"
        );
    }

    #[test]
    fn test_diagnostic_headers_in_order() {
        let diagnostics = PartDiagnostics {
            frame_number: Some(7),
            timestamp_ms: Some(123_456),
            fps: Some(24.96),
        };
        let header = encode_header(42, &diagnostics).unwrap();
        assert_eq!(
            header.as_str(),
            "Content-Type: image/jpeg\r\n\
             Content-Length: 42\r\n\
             X-Frame-Number: 7\r\n\
             X-Timestamp: 123456\r\n\
             X-FPS: 25.0\r\n\
             \r\n"
        );
    }

    #[test]
    fn test_worst_case_header_fits() {
        let diagnostics = PartDiagnostics {
            frame_number: Some(u64::MAX),
            timestamp_ms: Some(u64::MAX),
            fps: Some(f32::MAX),
        };
        let header = encode_header(usize::MAX, &diagnostics).unwrap();
        assert!(header.len() <= HEADER_CAPACITY);
    }

    #[test]
    fn test_undersized_buffer_reports_overflow() {
        let diagnostics = PartDiagnostics {
            frame_number: Some(1),
            ..PartDiagnostics::none()
        };
        assert_eq!(
            encode_into::<32>(1000, &diagnostics),
            Err(EncodeError::HeaderOverflow)
        );
    }

    #[test]
    fn test_boundary_precedes_first_part() {
        let payload = [0xFFu8, 0xD8, 0xFF, 0xD9];
        let part = MultipartPart::encode(&payload, &PartDiagnostics::none()).unwrap();
        let [boundary, header, body] = part.segments();

        assert_eq!(boundary, b"\r\n--frame\r\n");
        assert!(header.ends_with(b"\r\n\r\n"));
        assert_eq!(body, &payload);
        assert_eq!(part.wire_len(), boundary.len() + header.len() + 4);
    }

    #[test]
    fn test_content_type_matches_boundary() {
        assert!(STREAM_CONTENT_TYPE.ends_with(&format!("boundary={}", BOUNDARY)));
        assert_eq!(PART_BOUNDARY, format!("\r\n--{}\r\n", BOUNDARY).as_bytes());
    }

    fn content_length(header: &[u8]) -> Option<usize> {
        let text = std::str::from_utf8(header).ok()?;
        text.lines()
            .find_map(|line| line.strip_prefix("Content-Length: "))
            .and_then(|value| value.trim().parse().ok())
    }

    proptest! {
        // Content-Length always equals the payload that follows the header
        #[test]
        fn prop_content_length_matches_payload(
            payload in proptest::collection::vec(any::<u8>(), 0..4096),
            frame_number in proptest::option::of(any::<u64>()),
            timestamp_ms in proptest::option::of(any::<u64>()),
        ) {
            let diagnostics = PartDiagnostics { frame_number, timestamp_ms, fps: None };
            let part = MultipartPart::encode(&payload, &diagnostics).unwrap();

            prop_assert_eq!(content_length(part.header()), Some(payload.len()));
            prop_assert_eq!(part.payload().len(), payload.len());
            prop_assert!(part.header().ends_with(b"\r\n\r\n"));
        }
    }
}
