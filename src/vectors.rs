//! Word embeddings in the common text format, and their vocabularies
//!
//! The text format is one word per line followed by its coordinates, separated by spaces. It may
//! start with a `<count> <dim>` header, as word2vec writes it. GloVe writes an `<unk>` row that
//! can have a different length; it is dropped rather than treated as an error.

use ndarray::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;
use errors::*;
use farm::{FarmMap, new_farm};
use numpy;

/// The placeholder row GloVe appends, which may have a malformed vector
pub const UNKNOWN_WORD: &str = "<unk>";

/// Word vectors with one row per vocabulary word, in file order
#[derive(Debug, Clone)]
pub struct Embedding {
    pub words: Vec<String>,
    pub vectors: Array2<f64>,
}

/// What to do when two rows lowercase to the same word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplicates {
    /// The first row wins
    KeepFirst,
    /// Later rows overwrite earlier ones
    KeepLast,
}

/// Case-insensitive word lookup
#[derive(Debug, Clone)]
pub struct Vocabulary {
    ids: FarmMap<String, usize>,
}

impl Embedding {
    pub fn new(words: Vec<String>, vectors: Array2<f64>) -> Result<Embedding> {
        if words.len() != vectors.nrows() {
            return Err(Error::InvalidDimensions(format!(
                "{} words for a matrix of {} rows", words.len(), vectors.nrows())));
        }
        Ok(Embedding { words, vectors })
    }

    /// Read vectors in the text format, keeping at most `cap` rows (all if None)
    pub fn read_text<P: AsRef<Path>>(path: P, cap: Option<usize>) -> Result<Embedding> {
        let file = File::open(path.as_ref())
            .map_err(|e| Error::MissingFile("vectors file", Some(e)))?;
        Embedding::from_text(BufReader::new(file), cap)
    }

    /// Parse vectors in the text format from any reader
    pub fn from_text<R: BufRead>(reader: R, cap: Option<usize>) -> Result<Embedding> {
        let start = Instant::now();
        let cap = cap.unwrap_or(::std::usize::MAX);
        let mut words = vec![];
        let mut flat = vec![];
        let mut dim: Option<usize> = None;

        for (line_no, line) in reader.lines().enumerate() {
            if words.len() >= cap { break; }
            let line = line?;
            let mut tokens = line.split_whitespace();
            let word = match tokens.next() {
                Some(word) => word,
                None => continue,
            };
            let values: Vec<&str> = tokens.collect();

            if line_no == 0 {
                if let Some(declared) = parse_header(word, &values) {
                    debug!("Header declares {} dimensions", declared);
                    dim = Some(declared);
                    continue;
                }
            }
            let expected = *dim.get_or_insert(values.len());
            if values.len() != expected {
                if word == UNKNOWN_WORD {
                    debug!("Skipping {} row with {} values", UNKNOWN_WORD, values.len());
                    continue;
                }
                return Err(Error::IncompatibleInputs {
                    line: line_no + 1,
                    word: word.to_string(),
                    expected,
                    found: values.len(),
                });
            }
            for value in values {
                flat.push(value.parse::<f64>()?);
            }
            words.push(word.to_string());
        }

        let dim = dim.unwrap_or(0);
        let vectors = Array2::from_shape_vec((words.len(), dim), flat)?;
        info!("Loaded {} vectors of {} dimensions in {:.1} seconds",
            words.len(), dim, start.elapsed().as_secs_f64());
        Embedding::new(words, vectors)
    }

    /// Read a numpy matrix and the word list naming its rows, keeping at most `cap` rows
    pub fn read_numpy<P, Q>(wordlist: P, matrix: Q, cap: Option<usize>) -> Result<Embedding>
        where P: AsRef<Path>, Q: AsRef<Path> {
        let mut words = numpy::read_wordlist(wordlist)?;
        let mut vectors = numpy::read_matrix(matrix)?;
        if words.len() != vectors.nrows() {
            return Err(Error::InvalidDimensions(format!(
                "the word list has {} words but the matrix has {} rows",
                words.len(), vectors.nrows())));
        }
        if let Some(cap) = cap {
            if cap < words.len() {
                words.truncate(cap);
                vectors = vectors.slice(s![..cap, ..]).to_owned();
            }
        }
        Embedding::new(words, vectors)
    }

    /// Read either format: numpy when a word list is given, text otherwise
    pub fn open<P: AsRef<Path>>(vectors: P, wordlist: Option<&Path>, cap: Option<usize>)
        -> Result<Embedding> {
        match wordlist {
            Some(wordlist) => Embedding::read_numpy(wordlist, vectors, cap),
            None => Embedding::read_text(vectors, cap),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn vocabulary(&self, duplicates: Duplicates) -> Vocabulary {
        Vocabulary::new(&self.words, duplicates)
    }

    /// A copy with every row scaled to unit length.
    ///
    /// Rows of all zeros can't be normalized, so they stay zero and have similarity 0 to
    /// everything.
    pub fn normalized(&self) -> Array2<f64> {
        let mut normalized = self.vectors.clone();
        for mut row in normalized.outer_iter_mut() {
            let norm = row.dot(&row).sqrt();
            if norm != 0.0 { row.mapv_inplace(|x| x / norm); }
        }
        normalized
    }
}

/// A first line of exactly two unsigned integers is a `<count> <dim>` header
fn parse_header(first: &str, rest: &[&str]) -> Option<usize> {
    if rest.len() != 1 { return None; }
    match (first.parse::<usize>(), rest[0].parse::<usize>()) {
        (Ok(_), Ok(dim)) => Some(dim),
        _ => None,
    }
}

impl Vocabulary {
    pub fn new<S: AsRef<str>>(words: &[S], duplicates: Duplicates) -> Vocabulary {
        let mut ids = new_farm();
        for (id, word) in words.iter().enumerate() {
            let key = word.as_ref().to_lowercase();
            match duplicates {
                Duplicates::KeepFirst => { ids.entry(key).or_insert(id); },
                Duplicates::KeepLast => { ids.insert(key, id); },
            }
        }
        Vocabulary { ids }
    }

    pub fn get(&self, word: &str) -> Option<usize> {
        match self.ids.get(word) {
            Some(&id) => Some(id),
            None => self.ids.get(&word.to_lowercase()).cloned(),
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.get(word).is_some()
    }

    /// Number of distinct lowercase words
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str, cap: Option<usize>) -> Result<Embedding> {
        Embedding::from_text(Cursor::new(text.as_bytes().to_vec()), cap)
    }

    #[test]
    fn reads_plain_rows() {
        let emb = parse("cat 1 2 3\ndog 4 5 6\n", None).unwrap();
        assert_eq!(emb.words, vec!["cat", "dog"]);
        assert_eq!(emb.vectors, arr2(&[[1., 2., 3.], [4., 5., 6.]]));
    }

    #[test]
    fn skips_header_line() {
        let emb = parse("2 2\ncat 1 2\ndog 3 4\n", None).unwrap();
        assert_eq!(emb.len(), 2);
        assert_eq!(emb.dim(), 2);
        assert_eq!(emb.vectors[[1, 0]], 3.0);
    }

    #[test]
    fn one_dimensional_rows_are_not_headers() {
        let emb = parse("cat 0.5\ndog 1.5\n", None).unwrap();
        assert_eq!(emb.words, vec!["cat", "dog"]);
        assert_eq!(emb.dim(), 1);
    }

    #[test]
    fn tolerates_short_unk_row() {
        let emb = parse("cat 1 2\n<unk> 0\ndog 3 4\n", None).unwrap();
        assert_eq!(emb.words, vec!["cat", "dog"]);
    }

    #[test]
    fn rejects_short_rows() {
        match parse("cat 1 2\ndog 3\n", None) {
            Err(Error::IncompatibleInputs { line, expected, found, .. }) => {
                assert_eq!((line, expected, found), (2, 2, 1));
            },
            other => panic!("expected IncompatibleInputs, got {:?}", other),
        }
    }

    #[test]
    fn rows_must_match_header() {
        assert!(parse("2 3\ncat 1 2\ndog 3 4\n", None).is_err());
    }

    #[test]
    fn rejects_bad_floats() {
        match parse("cat 1 x\n", None) {
            Err(Error::ParseFloatError(_)) => {},
            other => panic!("expected ParseFloatError, got {:?}", other),
        }
    }

    #[test]
    fn cap_limits_rows() {
        let emb = parse("3 1\na 1\nb 2\nc 3\n", Some(2)).unwrap();
        assert_eq!(emb.words, vec!["a", "b"]);
        assert_eq!(emb.vectors.nrows(), 2);
    }

    #[test]
    fn vocabulary_duplicate_policies() {
        let words = vec!["Apple", "apple", "pear"];
        let first = Vocabulary::new(&words[..], Duplicates::KeepFirst);
        let last = Vocabulary::new(&words[..], Duplicates::KeepLast);
        assert_eq!(first.get("apple"), Some(0));
        assert_eq!(last.get("apple"), Some(1));
        assert_eq!(last.get("APPLE"), Some(1));
        assert_eq!(first.len(), 2);
        assert!(!first.contains("plum"));
    }

    #[test]
    fn normalized_rows_have_unit_length() {
        let emb = Embedding::new(
            vec!["a".into(), "zero".into()],
            arr2(&[[3., 4.], [0., 0.]])).unwrap();
        let normalized = emb.normalized();
        assert!((normalized[[0, 0]] - 0.6).abs() < 1e-12);
        assert!((normalized[[0, 1]] - 0.8).abs() < 1e-12);
        assert_eq!(normalized.row(1), arr1(&[0., 0.]));
    }
}
