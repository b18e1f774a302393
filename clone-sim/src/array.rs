//! Dense `f64` arrays and their flat on-disk format.
//!
//! Arrays are stored as NumPy `.npy` version 1.0 files so the cache can be read
//! straight from Python:
//!
//! `[magic: 6 bytes][major: u8][minor: u8][header_len: u16 LE][header][data: f64 LE...]`
//!
//! The header is an ASCII dict literal padded with spaces and a final newline so
//! that the data starts on a 64-byte boundary. Only `'<f8'` in C order is written
//! or accepted.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Result, SimError};

pub const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";
pub const NPY_ALIGN: usize = 64;
const NPY_DESCR: &str = "<f8";
const PREAMBLE_V1: usize = 6 + 2 + 2;
const PREAMBLE_V2: usize = 6 + 2 + 4;

/// Row-major `f64` array of arbitrary rank.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Array {
    /// Build an array, checking that `data` fills `shape` exactly.
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(SimError::config(format!(
                "shape {:?} needs {} elements, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// 1-D array.
    pub fn vector(data: Vec<f64>) -> Self {
        Self { shape: vec![data.len()], data }
    }

    /// 2-D array from row-major data.
    pub fn matrix(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        Self::new(vec![rows, cols], data)
    }

    /// 2-D array from equally long rows. An empty slice gives shape `(0, cols)`.
    pub fn from_rows(rows: &[Vec<f64>], cols: usize) -> Result<Self> {
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(SimError::config(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            data.extend_from_slice(row);
        }
        Self::matrix(rows.len(), cols, data)
    }

    /// 2-D 0/1 array from binary vectors of length `cols`.
    pub fn from_bits(rows: &[Vec<bool>], cols: usize) -> Result<Self> {
        let rows: Vec<Vec<f64>> = rows
            .iter()
            .map(|r| r.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect())
            .collect();
        Self::from_rows(&rows, cols)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Total element count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of rows along the first axis (0 for a 0-d array).
    pub fn n_rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    fn row_len(&self) -> usize {
        self.shape.iter().skip(1).product()
    }

    /// Row `i` along the first axis.
    pub fn row(&self, i: usize) -> Option<&[f64]> {
        if self.ndim() == 0 || i >= self.n_rows() {
            return None;
        }
        let width = self.row_len();
        Some(&self.data[i * width..(i + 1) * width])
    }

    /// Iterate rows along the first axis.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.n_rows()).filter_map(move |i| self.row(i))
    }

    /// Last row along the first axis as a 1-D array.
    pub fn last_row(&self) -> Option<Array> {
        let last = self.n_rows().checked_sub(1)?;
        let row = self.row(last)?;
        Some(Array {
            shape: self.shape[1..].to_vec(),
            data: row.to_vec(),
        })
    }

    // ------------------------------------------------------------------------
    // .npy codec
    // ------------------------------------------------------------------------

    fn npy_header(&self) -> String {
        let shape = match self.shape.as_slice() {
            [] => "()".to_string(),
            [n] => format!("({},)", n),
            dims => format!(
                "({})",
                dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
            ),
        };
        let mut header = format!(
            "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
            NPY_DESCR, shape
        );
        let unpadded = PREAMBLE_V1 + header.len() + 1;
        let padding = (NPY_ALIGN - unpadded % NPY_ALIGN) % NPY_ALIGN;
        header.extend(std::iter::repeat(' ').take(padding));
        header.push('\n');
        header
    }

    pub fn to_npy_bytes(&self) -> Vec<u8> {
        let header = self.npy_header();
        let mut buf = Vec::with_capacity(PREAMBLE_V1 + header.len() + 8 * self.data.len());
        buf.extend_from_slice(NPY_MAGIC);
        buf.push(1);
        buf.push(0);
        buf.extend_from_slice(&(header.len() as u16).to_le_bytes());
        buf.extend_from_slice(header.as_bytes());
        for v in &self.data {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf
    }

    pub fn from_npy_bytes(bytes: &[u8]) -> std::result::Result<Self, String> {
        if bytes.len() < PREAMBLE_V1 || &bytes[0..6] != NPY_MAGIC {
            return Err("missing .npy magic".to_string());
        }
        let (header_start, header_len) = match bytes[6] {
            1 => (
                PREAMBLE_V1,
                u16::from_le_bytes([bytes[8], bytes[9]]) as usize,
            ),
            2 | 3 => {
                if bytes.len() < PREAMBLE_V2 {
                    return Err("truncated .npy preamble".to_string());
                }
                (
                    PREAMBLE_V2,
                    u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
                )
            }
            v => return Err(format!("unsupported .npy version {}", v)),
        };
        let data_start = header_start + header_len;
        if bytes.len() < data_start {
            return Err("truncated .npy header".to_string());
        }
        let header = std::str::from_utf8(&bytes[header_start..data_start])
            .map_err(|_| "header is not ASCII".to_string())?;
        let shape = parse_header(header)?;

        let n_bytes = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .and_then(|count| count.checked_mul(8))
            .ok_or_else(|| format!("shape {:?} is too large", shape))?;
        let body = &bytes[data_start..];
        if body.len() != n_bytes {
            return Err(format!(
                "expected {} bytes of data for shape {:?}, found {}",
                n_bytes,
                shape,
                body.len()
            ));
        }
        let data = body
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect();
        Ok(Self { shape, data })
    }

    /// Write as `.npy` to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        write_array(&mut w, self)?;
        w.flush()?;
        Ok(())
    }

    /// Read a `.npy` file written by [`Array::save`] (or NumPy, for `float64` C-order data).
    pub fn load(path: &Path) -> Result<Self> {
        let mut r = BufReader::new(File::open(path)?);
        read_array(&mut r).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => SimError::format(path, e.to_string()),
            _ => SimError::Io(e),
        })
    }
}

/// Extract the shape from a `.npy` header dict, rejecting anything but C-order `'<f8'`.
fn parse_header(header: &str) -> std::result::Result<Vec<usize>, String> {
    let descr = dict_value(header, "descr")?;
    let descr = descr.trim().trim_matches(|c| c == '\'' || c == '"');
    if descr != NPY_DESCR {
        return Err(format!("unsupported dtype '{}', expected '{}'", descr, NPY_DESCR));
    }

    let fortran = dict_value(header, "fortran_order")?;
    if fortran.trim() != "False" {
        return Err("Fortran-ordered arrays are not supported".to_string());
    }

    let shape = dict_value(header, "shape")?;
    let inner = shape
        .trim()
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| format!("malformed shape '{}'", shape))?;
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|_| format!("bad dimension '{}'", s)))
        .collect()
}

/// Raw text of the value stored under `key` in a flat Python dict literal.
fn dict_value<'a>(header: &'a str, key: &str) -> std::result::Result<&'a str, String> {
    let needle = format!("'{}':", key);
    let start = header
        .find(&needle)
        .map(|i| i + needle.len())
        .ok_or_else(|| format!("header has no '{}'", key))?;
    let rest = &header[start..];
    // Tuples contain commas, so a shape value ends at its closing paren.
    let end = if rest.trim_start().starts_with('(') {
        rest.find(')').map(|i| i + 1)
    } else {
        rest.find(|c| c == ',' || c == '}')
    };
    end.map(|e| &rest[..e])
        .ok_or_else(|| format!("unterminated value for '{}'", key))
}

pub fn write_array<W: Write>(w: &mut W, array: &Array) -> io::Result<()> {
    w.write_all(&array.to_npy_bytes())
}

pub fn read_array<R: Read>(r: &mut R) -> io::Result<Array> {
    let mut buf = Vec::new();
    r.read_to_end(&mut buf)?;
    Array::from_npy_bytes(&buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
