//! Semantic categories (SEMCAT) and their members in a vocabulary
//!
//! A category directory holds one file per category, named `<name>-<count>.txt` with one member
//! word per line (or several, separated by spaces). Only members that the embedding knows about
//! take part in scoring.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;
use errors::*;
use farm::new_plain_set;
use vectors::Vocabulary;

pub const DEFAULT_CATEGORY_DIR: &str = "SEMCAT";

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    /// Member count the file name advertises. Informational only.
    pub expected: Option<usize>,
    /// Members found in the vocabulary
    pub words: Vec<String>,
    /// Distinct vocabulary rows of those members, in file order
    pub rows: Vec<usize>,
}

impl Category {
    /// Resolve member words against a vocabulary, dropping the unknown ones.
    ///
    /// Members are separated by any whitespace, so a line may hold several.
    pub fn from_words<I, S>(name: &str, expected: Option<usize>, members: I, vocab: &Vocabulary)
        -> Category
        where I: IntoIterator<Item=S>, S: AsRef<str> {
        let mut seen = new_plain_set();
        let mut words = vec![];
        let mut rows = vec![];
        for line in members {
            for member in line.as_ref().split_whitespace() {
                if let Some(row) = vocab.get(member) {
                    if seen.insert(row) {
                        words.push(member.to_string());
                        rows.push(row);
                    }
                }
            }
        }
        Category { name: name.to_string(), expected, words, rows }
    }

    /// Split a file name like `body_part-52.txt` into ("body part", Some(52))
    pub fn parse_file_name(file_name: &str) -> (String, Option<usize>) {
        let stem = match file_name.rfind('.') {
            Some(dot) => &file_name[..dot],
            None => file_name,
        };
        let name = stem.split('-').next().unwrap_or(stem).replace('_', " ");
        let expected = match stem.rfind('-') {
            Some(dash) => stem[dash + 1..].parse().ok(),
            None => None,
        };
        (name, expected)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read every category file in a directory, in file name order
pub fn read_categories<P: AsRef<Path>>(dir: P, vocab: &Vocabulary) -> Result<Vec<Category>> {
    let entries = fs::read_dir(dir.as_ref())
        .map_err(|e| Error::MissingFile("category directory", Some(e)))?;
    let mut paths = vec![];
    for entry in entries {
        let path = entry?.path();
        if path.is_file() { paths.push(path); }
    }
    paths.sort();

    let mut categories = vec![];
    for path in paths {
        let file_name = path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (name, expected) = Category::parse_file_name(&file_name);
        if expected.is_none() {
            warn!("Category file {} doesn't say how many words it has", file_name);
        }
        let members = BufReader::new(File::open(&path)?).lines()
            .collect::<::std::io::Result<Vec<String>>>()?;
        let category = Category::from_words(&name, expected, &members, vocab);
        debug!("Category {:?}: {} of {} words in vocabulary",
            category.name, category.len(), members.len());
        categories.push(category);
    }
    info!("Read {} categories from {}", categories.len(), dir.as_ref().display());
    Ok(categories)
}
