//! On-disk filter format shared by every filter variant.
//!
//! ```text
//! [KmerBloomFilter_v1]
//! bytes = 1024
//! hash_num = 3
//! hash_fn = "ntHash_v2"
//! k = 25
//! [HeaderEnd]
//! <body bytes>
//! ```
//!
//! The header is a TOML document whose only table is named after the file
//! signature; the `[HeaderEnd]` line terminates it and the raw body follows.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Read, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Error, Result};

pub const HEADER_END: &str = "[HeaderEnd]";

/// Configuration persisted in a filter file header.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterHeader {
    /// Body size in bytes.
    pub bytes: u64,
    pub hash_num: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_fn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeds: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_array_size: Option<u64>,
}

impl FilterHeader {
    pub(crate) fn new(bytes: usize, hash_num: u32, hash_fn: &str) -> Self {
        Self {
            bytes: bytes as u64,
            hash_num,
            hash_fn: (!hash_fn.is_empty()).then(|| hash_fn.to_owned()),
            ..Self::default()
        }
    }

    /// Field required by the filter being loaded.
    pub(crate) fn require<T>(field: Option<T>, name: &str) -> Result<T> {
        field.ok_or_else(|| Error::Corrupt(format!("header is missing `{name}`")))
    }
}

pub(crate) fn signature_line(signature: &str) -> String {
    format!("[{signature}]")
}

/// Write `header` and `body` to `path`, replacing any existing file.
pub(crate) fn write_filter(
    path: &Path,
    signature: &str,
    header: &FilterHeader,
    body: &[u8],
) -> Result<()> {
    let mut root = toml::Table::new();
    root.insert(signature.to_owned(), toml::Value::try_from(header)?);
    let text = toml::to_string(&root)?;

    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(text.as_bytes())?;
    out.write_all(HEADER_END.as_bytes())?;
    out.write_all(b"\n")?;
    out.write_all(body)?;
    out.flush()?;
    Ok(())
}

/// Read a filter file, checking its signature and body length.
pub(crate) fn read_filter(path: &Path, signature: &str) -> Result<(FilterHeader, Vec<u8>)> {
    let mut raw = Vec::new();
    File::open(path)?.read_to_end(&mut raw)?;

    let found = first_line(&raw);
    let expected = signature_line(signature);
    if found != expected {
        return Err(Error::SignatureMismatch {
            expected,
            found: found.to_owned(),
        });
    }

    let marker = format!("{HEADER_END}\n");
    let header_len = raw
        .windows(marker.len())
        .position(|w| w == marker.as_bytes())
        .ok_or(Error::MissingHeaderEnd)?;
    let text = std::str::from_utf8(&raw[..header_len])
        .map_err(|e| Error::Corrupt(format!("header is not UTF-8: {e}")))?;

    let mut root: toml::Table = text.parse()?;
    let table = root
        .remove(signature)
        .ok_or_else(|| Error::MissingHeaderTable(signature.to_owned()))?;
    let header: FilterHeader = table.try_into()?;
    if header.hash_fn.is_none() {
        warn!(path = %path.display(), "filter header has no hash_fn; assuming the default");
    }

    let body = raw.split_off(header_len + marker.len());
    let expected = header.bytes as usize;
    if body.len() < expected {
        return Err(Error::Truncated {
            expected,
            found: body.len(),
        });
    }
    if body.len() > expected {
        return Err(Error::Corrupt(format!(
            "{} trailing bytes after filter body",
            body.len() - expected
        )));
    }
    Ok((header, body))
}

/// Signature of the filter stored at `path`, without brackets.
pub fn file_signature(path: impl AsRef<Path>) -> Result<String> {
    let mut line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut line)?;
    let line = line.trim_end();
    line.strip_prefix('[')
        .and_then(|l| l.strip_suffix(']'))
        .map(str::to_owned)
        .ok_or_else(|| Error::Corrupt(format!("malformed signature line {line:?}")))
}

fn first_line(raw: &[u8]) -> &str {
    let end = raw.iter().position(|&b| b == b'\n').unwrap_or(raw.len());
    std::str::from_utf8(&raw[..end]).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> FilterHeader {
        FilterHeader {
            k: Some(21),
            seeds: Some(vec!["1101".into(), "1011".into()]),
            ..FilterHeader::new(16, 3, "ntHash_v2")
        }
    }

    #[test]
    fn header_and_body_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bf");
        let body: Vec<u8> = (0..16).collect();
        write_filter(&path, "SeedBloomFilter_v1", &sample_header(), &body).unwrap();

        let text = std::fs::read(&path).unwrap();
        assert!(text.starts_with(b"[SeedBloomFilter_v1]\n"));
        assert_eq!(file_signature(&path).unwrap(), "SeedBloomFilter_v1");

        let (header, read_body) = read_filter(&path, "SeedBloomFilter_v1").unwrap();
        assert_eq!(header, sample_header());
        assert_eq!(read_body, body);
    }

    #[test]
    fn rejects_wrong_signature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bf");
        write_filter(&path, "BloomFilter_v1", &FilterHeader::new(8, 1, ""), &[0; 8]).unwrap();
        assert!(matches!(
            read_filter(&path, "KmerBloomFilter_v1"),
            Err(Error::SignatureMismatch { .. })
        ));
    }

    #[test]
    fn rejects_truncated_and_padded_bodies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bf");
        write_filter(&path, "BloomFilter_v1", &FilterHeader::new(8, 1, "x"), &[0; 5]).unwrap();
        assert!(matches!(
            read_filter(&path, "BloomFilter_v1"),
            Err(Error::Truncated {
                expected: 8,
                found: 5
            })
        ));
        write_filter(&path, "BloomFilter_v1", &FilterHeader::new(8, 1, "x"), &[0; 9]).unwrap();
        assert!(matches!(
            read_filter(&path, "BloomFilter_v1"),
            Err(Error::Corrupt(_))
        ));
    }

    #[test]
    fn rejects_missing_header_end_and_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bf");
        std::fs::write(&path, "[BloomFilter_v1]\nbytes = 8\nhash_num = 1\n").unwrap();
        assert!(matches!(
            read_filter(&path, "BloomFilter_v1"),
            Err(Error::MissingHeaderEnd)
        ));

        std::fs::write(&path, "[BloomFilter_v1]\n[Other]\nbytes = 0\n[HeaderEnd]\n").unwrap();
        // `[BloomFilter_v1]` exists but is empty, so required fields are missing
        assert!(matches!(
            read_filter(&path, "BloomFilter_v1"),
            Err(Error::HeaderParse(_))
        ));
    }

    #[test]
    fn missing_hash_fn_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bf");
        write_filter(&path, "BloomFilter_v1", &FilterHeader::new(8, 2, ""), &[1; 8]).unwrap();
        let (header, _) = read_filter(&path, "BloomFilter_v1").unwrap();
        assert_eq!(header.hash_fn, None);
        assert_eq!(header.hash_num, 2);
    }
}
