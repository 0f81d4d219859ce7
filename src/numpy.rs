//! Read NDArrays from Numpy files, and the word lists that name their rows

use ndarray::prelude::*;
use std::fs::File;
use std::path::Path;
use std::io::{BufRead, BufReader, Read};
use regex::bytes::Regex;
use byteorder::{ByteOrder, LittleEndian};
use errors::*;

const NPY_HEADER: &str =
    r"(?s-u)NUMPY\x01\x00..\{'descr': ?'<f8', ?'fortran_order': ?False, ?'shape': ?\((\d+), ?(\d+),?\),? ?\} *\n";

/// Read a Numpy matrix into memory. Be careful if it's large. You could run out of memory.
///
/// You need to know the number of dimensions at compile time so for convenience, we assume you
/// need a matrix. Only little-endian 64-bit floats in C order are supported.
pub fn read_matrix<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    let mut reader = File::open(path.as_ref())
        .map_err(|e| Error::MissingFile("numpy matrix", Some(e)))?;
    let mut content = vec![];
    reader.read_to_end(&mut content)?;
    parse_matrix(path.as_ref(), &content)
}

fn parse_matrix(path: &Path, content: &[u8]) -> Result<Array2<f64>> {
    let header_match = Regex::new(NPY_HEADER)?;
    let (skip, h, w) = {
        let captures = header_match.captures(content)
            .ok_or_else(|| helpful_complaint(path, content))?;
        // where the full match ends
        let skip = captures.get(0).map(|m| m.end()).unwrap_or(0);
        // The shape of the array as described in the metadata
        let h: usize = String::from_utf8_lossy(&captures[1]).parse()?;
        let w: usize = String::from_utf8_lossy(&captures[2]).parse()?;
        (skip, h, w)
    };
    let body = &content[skip..];
    if body.len() != h * w * 8 {
        return Err(Error::InvalidDimensions(format!(
            "The numpy file's array is the wrong length for a {}x{} array. \
            It should be {} elements, ({} bytes), but it is actually {} bytes.",
            h, w, h * w, h * w * 8, body.len())));
    }
    let mut values = vec![0.0; h * w];
    LittleEndian::read_f64_into(body, &mut values);
    Ok(Array2::from_shape_vec((h, w), values)?)
}

/// Read one word per line; line `i` names row `i` of the matching matrix
pub fn read_wordlist<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let file = File::open(path.as_ref())
        .map_err(|e| Error::MissingFile("word list", Some(e)))?;
    let mut words = vec![];
    for line in BufReader::new(file).lines() {
        words.push(line?.trim().to_string());
    }
    Ok(words)
}

/// Tell the user more info about the file
///
/// It seems verbose but you can see this error often so it save you time.
fn helpful_complaint(p: &Path, header: &[u8]) -> Error {
    let cap = ::std::cmp::min(header.len(), 100);
    let complaint = format!(
        "Expected {} to be an uncompressed numpy (.npy) file, but couldn't \
        parse the header. The first hundred bytes look like:

        {}


        It should look something like this example, where . are non-printable characters: \
        NUMPY..{{'descr': '<f8', 'fortran_order': False, 'shape': (34, 27)}}\
        Note: only 2D little-endian 64-bit float matrices in C order are supported (for \
        simplicity). You may need to change the dtype accordingly.",
        p.display(),
        String::from_utf8_lossy(&header[..cap]));
    Error::Other(complaint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Write;

    fn npy_bytes(h: usize, w: usize, values: &[f64]) -> Vec<u8> {
        let header = format!("{{'descr': '<f8', 'fortran_order': False, 'shape': ({}, {}), }}",
            h, w);
        let mut bytes = vec![];
        bytes.write_all(b"\x93NUMPY\x01\x00").unwrap();
        bytes.write_u16::<LittleEndian>(header.len() as u16 + 1).unwrap();
        write!(bytes, "{}\n", header).unwrap();
        for &v in values {
            bytes.write_f64::<LittleEndian>(v).unwrap();
        }
        bytes
    }

    #[test]
    fn parses_small_matrix() {
        let bytes = npy_bytes(2, 3, &[1., 2., 3., 4., 5., -6.]);
        let mat = parse_matrix(Path::new("mem.npy"), &bytes).unwrap();
        assert_eq!(mat, arr2(&[[1., 2., 3.], [4., 5., -6.]]));
    }

    #[test]
    fn rejects_truncated_body() {
        let bytes = npy_bytes(2, 3, &[1., 2., 3.]);
        match parse_matrix(Path::new("mem.npy"), &bytes) {
            Err(Error::InvalidDimensions(_)) => {},
            other => panic!("expected InvalidDimensions, got {:?}", other),
        }
    }

    #[test]
    fn rejects_other_dtypes() {
        let bytes = b"\x93NUMPY\x01\x00\x10\x00{'descr': '<f4'}\n".to_vec();
        match parse_matrix(Path::new("mem.npy"), &bytes) {
            Err(Error::Other(msg)) => assert!(msg.contains("mem.npy")),
            other => panic!("expected a complaint, got {:?}", other),
        }
    }
}
