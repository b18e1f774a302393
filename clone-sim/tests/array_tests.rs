use clone_sim::array::{read_array, write_array, Array, NPY_ALIGN, NPY_MAGIC};
use clone_sim::error::SimError;
use std::io::Cursor;

#[test]
fn test_npy_layout_for_small_vector() {
    let a = Array::vector(vec![1.0, 2.0]);
    let bytes = a.to_npy_bytes();
    assert_eq!(&bytes[0..6], NPY_MAGIC);
    assert_eq!((bytes[6], bytes[7]), (1, 0));

    // Preamble plus header is padded to a multiple of the alignment, then two f64s.
    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let data_start = 10 + header_len;
    assert_eq!(data_start % NPY_ALIGN, 0);
    assert_eq!(bytes.len(), data_start + 16);

    let header = std::str::from_utf8(&bytes[10..data_start]).unwrap();
    assert!(header.starts_with("{'descr': '<f8', 'fortran_order': False, 'shape': (2,), }"));
    assert!(header.ends_with('\n'));
    assert_eq!(&bytes[data_start..data_start + 8], &1.0f64.to_le_bytes());
    assert_eq!(&bytes[data_start + 8..], &2.0f64.to_le_bytes());
}

#[test]
fn test_oversized_shape_is_rejected_not_overflowed() {
    let mut header = String::from(
        "{'descr': '<f8', 'fortran_order': False, 'shape': (4294967296, 4294967296, 4294967296), }",
    );
    while (10 + header.len() + 1) % NPY_ALIGN != 0 {
        header.push(' ');
    }
    header.push('\n');

    let mut bytes = Vec::new();
    bytes.extend_from_slice(NPY_MAGIC);
    bytes.extend_from_slice(&[1, 0]);
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(&[0u8; 16]);

    let err = Array::from_npy_bytes(&bytes).unwrap_err();
    assert!(err.contains("too large"), "{}", err);
}

#[test]
fn test_matrix_survives_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("m.npy");
    let m = Array::matrix(2, 3, vec![0.5, -1.0, 3.25, 0.0, 1e-9, 7.0]).unwrap();
    m.save(&path).unwrap();
    let back = Array::load(&path).unwrap();
    assert_eq!(back, m);
    assert_eq!(back.shape(), &[2, 3]);
}

#[test]
fn test_empty_leading_axis_is_preserved() {
    let mut buf = Vec::new();
    let a = Array::from_rows(&[], 12).unwrap();
    write_array(&mut buf, &a).unwrap();
    let back = read_array(&mut Cursor::new(buf)).unwrap();
    assert_eq!(back.shape(), &[0, 12]);
    assert!(back.is_empty());
    assert!(back.last_row().is_none());
}

#[test]
fn test_truncated_data_is_rejected() {
    let mut bytes = Array::vector(vec![1.0, 2.0, 3.0]).to_npy_bytes();
    bytes.truncate(bytes.len() - 4);
    assert!(Array::from_npy_bytes(&bytes).is_err());
}

#[test]
fn test_garbage_file_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.npy");
    std::fs::write(&path, b"not an array").unwrap();
    match Array::load(&path) {
        Err(SimError::Format { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected Format error, got {:?}", other),
    }
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Array::load(&dir.path().join("absent.npy")),
        Err(SimError::Io(_))
    ));
}

#[test]
fn test_shape_must_match_data() {
    assert!(Array::new(vec![2, 2], vec![0.0; 3]).is_err());
    assert!(Array::from_rows(&[vec![1.0, 2.0], vec![3.0]], 2).is_err());
}

#[test]
fn test_rows_and_last_row() {
    let m = Array::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]], 2).unwrap();
    assert_eq!(m.n_rows(), 3);
    assert_eq!(m.row(1).unwrap(), &[3.0, 4.0]);
    assert!(m.row(3).is_none());
    assert_eq!(m.rows().count(), 3);
    let last = m.last_row().unwrap();
    assert_eq!(last.shape(), &[2]);
    assert_eq!(last.data(), &[5.0, 6.0]);
}

#[test]
fn test_from_bits_encodes_zero_one() {
    let m = Array::from_bits(&[vec![true, false], vec![false, true]], 2).unwrap();
    assert_eq!(m.data(), &[1.0, 0.0, 0.0, 1.0]);
}
