//! Entity strategies: turn a response body into a value, or a value into a
//! request body.
//!
//! # Design
//! Both traits are a single method over a borrowed stream, and any closure of
//! the matching shape implements them, so callers rarely need a named type.
//! Failures are plain `io::Error`s; the client propagates them unchanged.
//! `StringEntityReader` is the reference reader used for text responses and
//! for rendering error bodies.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Converts a response byte stream into a `T`.
pub trait EntityReader<T> {
    fn read_entity(&self, input: &mut dyn Read) -> io::Result<T>;
}

impl<T, F> EntityReader<T> for F
where
    F: Fn(&mut dyn Read) -> io::Result<T>,
{
    fn read_entity(&self, input: &mut dyn Read) -> io::Result<T> {
        self(input)
    }
}

/// Writes a request payload to the connection's output stream.
pub trait EntityWriter {
    fn write_entity(&self, output: &mut dyn Write) -> io::Result<()>;
}

impl<F> EntityWriter for F
where
    F: Fn(&mut dyn Write) -> io::Result<()>,
{
    fn write_entity(&self, output: &mut dyn Write) -> io::Result<()> {
        self(output)
    }
}

/// Reads a body as lines of text.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected. Line
/// terminators (`\n` or `\r\n`) are stripped.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringEntityReader;

impl EntityReader<Vec<String>> for StringEntityReader {
    fn read_entity(&self, input: &mut dyn Read) -> io::Result<Vec<String>> {
        let mut reader = BufReader::new(input);
        let mut lines = Vec::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                return Ok(lines);
            }
            if line.ends_with(b"\n") {
                line.pop();
                if line.ends_with(b"\r") {
                    line.pop();
                }
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
    }
}

/// Deserializes a JSON body into `T`.
#[derive(Debug, Clone, Copy)]
pub struct JsonEntityReader<T>(PhantomData<fn() -> T>);

impl<T> JsonEntityReader<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonEntityReader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> EntityReader<T> for JsonEntityReader<T> {
    fn read_entity(&self, input: &mut dyn Read) -> io::Result<T> {
        Ok(serde_json::from_reader(BufReader::new(input))?)
    }
}

/// Serializes a value as the JSON request payload.
///
/// The writer only produces the body; set `Content-Type: application/json`
/// on the client yourself.
#[derive(Debug, Clone)]
pub struct JsonEntityWriter<'a, T: ?Sized>(pub &'a T);

impl<T: Serialize + ?Sized> EntityWriter for JsonEntityWriter<'_, T> {
    fn write_entity(&self, output: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(output, self.0)?;
        Ok(())
    }
}

/// Writes a fixed byte payload.
#[derive(Debug, Clone)]
pub struct BytesEntityWriter<'a>(pub &'a [u8]);

impl EntityWriter for BytesEntityWriter<'_> {
    fn write_entity(&self, output: &mut dyn Write) -> io::Result<()> {
        output.write_all(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Cursor;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Item {
        name: String,
        count: u32,
    }

    fn read_lines(bytes: &[u8]) -> Vec<String> {
        StringEntityReader
            .read_entity(&mut Cursor::new(bytes.to_vec()))
            .unwrap()
    }

    #[test]
    fn string_reader_splits_lines() {
        assert_eq!(read_lines(b"alpha\nbeta\r\ngamma"), ["alpha", "beta", "gamma"]);
    }

    #[test]
    fn string_reader_empty_body_has_no_lines() {
        assert!(read_lines(b"").is_empty());
    }

    #[test]
    fn string_reader_keeps_blank_lines() {
        assert_eq!(read_lines(b"a\n\nb\n"), ["a", "", "b"]);
    }

    #[test]
    fn closures_are_readers() {
        let count_bytes = |input: &mut dyn Read| -> io::Result<usize> {
            let mut buf = Vec::new();
            input.read_to_end(&mut buf)?;
            Ok(buf.len())
        };
        let n = count_bytes.read_entity(&mut Cursor::new(vec![1, 2, 3])).unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn closures_are_writers() {
        let greet = |output: &mut dyn Write| output.write_all(b"hello");
        let mut out = Vec::new();
        greet.write_entity(&mut out).unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn json_writer_then_reader() {
        let item = Item {
            name: "widget".to_string(),
            count: 3,
        };
        let mut out = Vec::new();
        JsonEntityWriter(&item).write_entity(&mut out).unwrap();
        assert_eq!(out, br#"{"name":"widget","count":3}"#);

        let back: Item = JsonEntityReader::new()
            .read_entity(&mut Cursor::new(out))
            .unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn json_reader_surfaces_parse_errors_as_io() {
        let err = JsonEntityReader::<Item>::new()
            .read_entity(&mut Cursor::new(b"not json".to_vec()))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn bytes_writer_writes_payload() {
        let mut out = Vec::new();
        BytesEntityWriter(b"\x00\x01raw").write_entity(&mut out).unwrap();
        assert_eq!(out, b"\x00\x01raw");
    }
}
