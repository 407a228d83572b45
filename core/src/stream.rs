//! Body copy helpers.
//!
//! Both helpers take the source by value and drop it once the copy is done,
//! which closes it. The destination is only borrowed and stays open.

use std::io::{self, Read, Write};

use encoding_rs::mem::decode_latin1;
use encoding_rs::{CoderResult, Encoding};
use tracing::trace;

const BUFFER_SIZE: usize = 2048;

/// Copy raw bytes from `from` to `to`. Returns the number of bytes copied.
pub fn copy_stream<R, W>(mut from: R, to: &mut W) -> io::Result<u64>
where
    R: Read,
    W: Write + ?Sized,
{
    let copied = io::copy(&mut from, to)?;
    trace!(bytes = copied, "copied raw body");
    Ok(copied)
}

/// Labels decoded as true ISO-8859-1, one byte per code point. WHATWG label
/// rules would map these to windows-1252, which differs for 0x80..=0x9F.
const LATIN1_LABELS: &[&str] = &[
    "iso-8859-1",
    "iso_8859-1",
    "iso8859-1",
    "iso8859_1",
    "latin1",
    "l1",
    "cp819",
    "ibm819",
];

fn is_latin1(label: &str) -> bool {
    LATIN1_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label))
}

/// Decode `from` using the named charset and write the text to `to` as
/// UTF-8, then flush `to`.
///
/// Malformed input is replaced with U+FFFD. An unknown charset label fails
/// with `ErrorKind::InvalidInput` before anything is read.
pub fn copy_text<R, W>(mut from: R, charset: &str, to: &mut W) -> io::Result<u64>
where
    R: Read,
    W: Write + ?Sized,
{
    let label = charset.trim();
    let written = if is_latin1(label) {
        copy_latin1(&mut from, to)?
    } else {
        let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported charset: {charset}"),
            )
        })?;
        copy_decoded(&mut from, encoding, to)?
    };

    drop(from);
    to.flush()?;
    trace!(charset = label, bytes = written, "copied text body");
    Ok(written)
}

fn copy_latin1<R, W>(from: &mut R, to: &mut W) -> io::Result<u64>
where
    R: Read,
    W: Write + ?Sized,
{
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut written = 0u64;
    loop {
        let read = from.read(&mut buffer)?;
        if read == 0 {
            return Ok(written);
        }
        let text = decode_latin1(&buffer[..read]);
        to.write_all(text.as_bytes())?;
        written += text.len() as u64;
    }
}

fn copy_decoded<R, W>(from: &mut R, encoding: &'static Encoding, to: &mut W) -> io::Result<u64>
where
    R: Read,
    W: Write + ?Sized,
{
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut text = String::new();
    let mut written = 0u64;

    loop {
        let read = from.read(&mut buffer)?;
        let last = read == 0;
        let mut pending = &buffer[..read];
        loop {
            if let Some(needed) = decoder.max_utf8_buffer_length(pending.len()) {
                text.reserve(needed);
            }
            let (result, consumed, _) = decoder.decode_to_string(pending, &mut text, last);
            pending = &pending[consumed..];
            to.write_all(text.as_bytes())?;
            written += text.len() as u64;
            text.clear();
            if let CoderResult::InputEmpty = result {
                break;
            }
        }
        if last {
            return Ok(written);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader that hands out one byte per call, to split multi-byte sequences.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.split_first() {
                Some((first, rest)) if !buf.is_empty() => {
                    buf[0] = *first;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    #[test]
    fn copy_stream_is_byte_for_byte() {
        let bytes: Vec<u8> = (0..=255).collect();
        let mut out = Vec::new();
        let copied = copy_stream(Cursor::new(bytes.clone()), &mut out).unwrap();
        assert_eq!(copied, 256);
        assert_eq!(out, bytes);
    }

    #[test]
    fn copy_text_decodes_latin1() {
        let mut out = Vec::new();
        copy_text(Cursor::new(b"caf\xe9".to_vec()), "ISO-8859-1", &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "café");
    }

    #[test]
    fn copy_text_latin1_maps_c1_bytes_to_code_points() {
        let mut out = Vec::new();
        copy_text(Cursor::new(b"\x80\x9f\xff".to_vec()), "ISO-8859-1", &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "\u{80}\u{9f}\u{ff}");
    }

    #[test]
    fn latin1_labels_ignore_case() {
        assert!(is_latin1("latin1"));
        assert!(is_latin1("ISO_8859-1"));
        assert!(!is_latin1("windows-1252"));
    }

    #[test]
    fn windows_1252_still_uses_its_own_table() {
        let mut out = Vec::new();
        copy_text(Cursor::new(b"\x80".to_vec()), "windows-1252", &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "€");
    }

    #[test]
    fn copy_text_decodes_utf8_split_across_reads() {
        let mut out = Vec::new();
        copy_text(Trickle("naïve ☕".as_bytes()), "UTF-8", &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "naïve ☕");
    }

    #[test]
    fn copy_text_replaces_malformed_input() {
        let mut out = Vec::new();
        copy_text(Cursor::new(b"ok\xff".to_vec()), "UTF-8", &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "ok\u{FFFD}");
    }

    #[test]
    fn copy_text_rejects_unknown_charset() {
        let mut out = Vec::new();
        let err = copy_text(Cursor::new(b"x".to_vec()), "no-such-charset", &mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(out.is_empty());
    }

    #[test]
    fn copy_text_flushes_destination() {
        let mut out = io::BufWriter::new(Vec::new());
        copy_text(Cursor::new(b"hello".to_vec()), "UTF-8", &mut out).unwrap();
        assert_eq!(out.buffer(), b"");
        assert_eq!(out.get_ref().as_slice(), b"hello");
    }
}
