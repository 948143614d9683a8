//! Minimal NumPy `.npy` / `.npz` codec for 1-D numeric arrays.
//!
//! Reads format versions 1–3, C order, integer and float dtypes of either
//! byte order; everything is widened to f64. Writes version 1.0 with `<f4`
//! or `<i8` payloads so NumPy can load the result.

use crate::config::MAX_TABLE_FILE_BYTES;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MAGIC: &[u8] = b"\x93NUMPY";
const NPY_SUFFIX: &str = ".npy";
const HEADER_ALIGN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NpyError {
    #[error("missing NUMPY magic")]
    BadMagic,
    #[error("unsupported format version {0}.{1}")]
    UnsupportedVersion(u8, u8),
    #[error("data truncated")]
    Truncated,
    #[error("malformed header: {0}")]
    BadHeader(String),
    #[error("unsupported dtype {0}")]
    UnsupportedDtype(String),
    #[error("fortran-ordered arrays are not supported")]
    FortranOrder,
    #[error("expected a 1-D array, got shape {0:?}")]
    NotOneDimensional(Vec<usize>),
}

#[derive(Debug, Error)]
pub enum NpzError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("array {name}: {source}")]
    Array {
        name: String,
        #[source]
        source: NpyError,
    },
    #[error("member {name} decodes to {size} bytes (max {max})")]
    MemberTooLarge { name: String, size: u64, max: u64 },
}

/// Decode one `.npy` buffer holding a 1-D array.
pub fn parse_npy(bytes: &[u8]) -> Result<Vec<f64>, NpyError> {
    if bytes.len() < MAGIC.len() + 2 || &bytes[..MAGIC.len()] != MAGIC {
        return Err(NpyError::BadMagic);
    }
    let (major, minor) = (bytes[6], bytes[7]);
    let (header_len, header_start) = match major {
        1 => {
            let b = bytes.get(8..10).ok_or(NpyError::Truncated)?;
            (u16::from_le_bytes([b[0], b[1]]) as usize, 10)
        }
        2 | 3 => {
            let b = bytes.get(8..12).ok_or(NpyError::Truncated)?;
            (u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize, 12)
        }
        _ => return Err(NpyError::UnsupportedVersion(major, minor)),
    };
    let header_end = header_start + header_len;
    let header = bytes
        .get(header_start..header_end)
        .ok_or(NpyError::Truncated)?;
    let header = std::str::from_utf8(header)
        .map_err(|_| NpyError::BadHeader("header is not UTF-8".to_string()))?;

    let descr = quoted_value(header, "descr")?;
    let fortran = header_value(header, "fortran_order")?;
    if fortran.starts_with("True") {
        return Err(NpyError::FortranOrder);
    }
    if !fortran.starts_with("False") {
        return Err(NpyError::BadHeader(format!("fortran_order: {fortran}")));
    }
    let shape = parse_shape(header_value(header, "shape")?)?;
    if shape.len() != 1 {
        return Err(NpyError::NotOneDimensional(shape));
    }
    decode(&bytes[header_end..], descr, shape[0])
}

/// Text following `'key':` in the header dict.
fn header_value<'a>(header: &'a str, key: &str) -> Result<&'a str, NpyError> {
    let pat_single = format!("'{key}'");
    let pat_double = format!("\"{key}\"");
    let at = header
        .find(&pat_single)
        .map(|i| i + pat_single.len())
        .or_else(|| header.find(&pat_double).map(|i| i + pat_double.len()))
        .ok_or_else(|| NpyError::BadHeader(format!("missing key {key}")))?;
    let rest = header[at..].trim_start();
    let rest = rest
        .strip_prefix(':')
        .ok_or_else(|| NpyError::BadHeader(format!("no value for {key}")))?;
    Ok(rest.trim_start())
}

fn quoted_value<'a>(header: &'a str, key: &str) -> Result<&'a str, NpyError> {
    let v = header_value(header, key)?;
    let quote = v
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| NpyError::BadHeader(format!("{key} is not a string")))?;
    let body = &v[1..];
    let end = body
        .find(quote)
        .ok_or_else(|| NpyError::BadHeader(format!("unterminated {key}")))?;
    Ok(&body[..end])
}

fn parse_shape(v: &str) -> Result<Vec<usize>, NpyError> {
    let inner = v
        .strip_prefix('(')
        .and_then(|s| s.find(')').map(|end| &s[..end]))
        .ok_or_else(|| NpyError::BadHeader(format!("shape: {v}")))?;
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| NpyError::BadHeader(format!("shape dimension {s:?}")))
        })
        .collect()
}

/// Copy `N` bytes into little-endian order.
fn le_bytes<const N: usize>(chunk: &[u8], little: bool) -> [u8; N] {
    let mut a = [0u8; N];
    a.copy_from_slice(chunk);
    if !little {
        a.reverse();
    }
    a
}

fn decode(data: &[u8], descr: &str, n: usize) -> Result<Vec<f64>, NpyError> {
    let unsupported = || NpyError::UnsupportedDtype(descr.to_string());
    let mut chars = descr.chars();
    let little = match chars.next() {
        Some('<') | Some('|') => true,
        Some('>') => false,
        Some('=') => cfg!(target_endian = "little"),
        _ => return Err(unsupported()),
    };
    let kind = chars.next().ok_or_else(unsupported)?;
    let size: usize = chars.as_str().parse().map_err(|_| unsupported())?;
    if !matches!((kind, size), ('f', 4 | 8) | ('i' | 'u', 1 | 2 | 4 | 8)) {
        return Err(unsupported());
    }
    let needed = n.checked_mul(size).ok_or(NpyError::Truncated)?;
    let data = data.get(..needed).ok_or(NpyError::Truncated)?;
    let chunks = data.chunks_exact(size);
    let out = match (kind, size) {
        ('f', 4) => chunks
            .map(|c| f32::from_le_bytes(le_bytes(c, little)) as f64)
            .collect(),
        ('f', 8) => chunks
            .map(|c| f64::from_le_bytes(le_bytes(c, little)))
            .collect(),
        ('i', 1) => chunks.map(|c| c[0] as i8 as f64).collect(),
        ('i', 2) => chunks
            .map(|c| i16::from_le_bytes(le_bytes(c, little)) as f64)
            .collect(),
        ('i', 4) => chunks
            .map(|c| i32::from_le_bytes(le_bytes(c, little)) as f64)
            .collect(),
        ('i', 8) => chunks
            .map(|c| i64::from_le_bytes(le_bytes(c, little)) as f64)
            .collect(),
        ('u', 1) => chunks.map(|c| c[0] as f64).collect(),
        ('u', 2) => chunks
            .map(|c| u16::from_le_bytes(le_bytes(c, little)) as f64)
            .collect(),
        ('u', 4) => chunks
            .map(|c| u32::from_le_bytes(le_bytes(c, little)) as f64)
            .collect(),
        ('u', 8) => chunks
            .map(|c| u64::from_le_bytes(le_bytes(c, little)) as f64)
            .collect(),
        _ => return Err(unsupported()),
    };
    Ok(out)
}

fn encode(descr: &str, n: usize, payload: &[u8]) -> Vec<u8> {
    frame(
        format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': ({n},), }}"),
        payload,
    )
}

/// Wrap a header dict and payload into a version 1.0 `.npy` buffer.
fn frame(mut header: String, payload: &[u8]) -> Vec<u8> {
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let pad = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    header.extend(std::iter::repeat(' ').take(pad));
    header.push('\n');

    let mut out = Vec::with_capacity(MAGIC.len() + 4 + header.len() + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(payload);
    out
}

/// `.npy` bytes for a float32 array.
pub fn encode_f32(values: &[f64]) -> Vec<u8> {
    let payload: Vec<u8> = values
        .iter()
        .flat_map(|v| (*v as f32).to_le_bytes())
        .collect();
    encode("<f4", values.len(), &payload)
}

/// `.npy` bytes for an int64 array.
pub fn encode_i64(values: &[i64]) -> Vec<u8> {
    let payload: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    encode("<i8", values.len(), &payload)
}

/// Read every `.npy` member of an `.npz` archive, keyed by member name without suffix.
pub fn read_npz(path: &Path) -> Result<BTreeMap<String, Vec<f64>>, NpzError> {
    read_npz_bounded(path, MAX_TABLE_FILE_BYTES)
}

/// Like [`read_npz`], refusing any member that decompresses past `max_member_bytes`.
fn read_npz_bounded(
    path: &Path,
    max_member_bytes: u64,
) -> Result<BTreeMap<String, Vec<f64>>, NpzError> {
    let file = fs::File::open(path)?;
    let mut zip = ZipArchive::new(file)?;
    let mut arrays = BTreeMap::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(name) = entry.name().strip_suffix(NPY_SUFFIX).map(str::to_string) else {
            continue;
        };
        let too_large = |size| NpzError::MemberTooLarge {
            name: name.clone(),
            size,
            max: max_member_bytes,
        };
        if entry.size() > max_member_bytes {
            return Err(too_large(entry.size()));
        }
        let mut buf = Vec::with_capacity(entry.size() as usize);
        (&mut entry)
            .take(max_member_bytes + 1)
            .read_to_end(&mut buf)?;
        if buf.len() as u64 > max_member_bytes {
            return Err(too_large(buf.len() as u64));
        }
        let values = parse_npy(&buf).map_err(|source| NpzError::Array {
            name: name.clone(),
            source,
        })?;
        arrays.insert(name, values);
    }
    Ok(arrays)
}

/// Write pre-encoded `.npy` members into an uncompressed `.npz` archive.
pub fn write_npz(path: &Path, members: &[(String, Vec<u8>)]) -> Result<(), NpzError> {
    let file = fs::File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, bytes) in members {
        zip.start_file(format!("{name}{NPY_SUFFIX}"), options)?;
        zip.write_all(bytes)?;
    }
    zip.finish()?;
    Ok(())
}
