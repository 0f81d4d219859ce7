//! Run an embedding against the Mikolov 2013 analogy questions
//!
//! Each question `a b c d` reads "a is to b as c is to d". The prediction is the vocabulary word
//! closest (by cosine similarity) to `b - a + c`, not counting the three question words.

use ndarray::prelude::*;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;
use errors::*;
use vectors::{Duplicates, Embedding, Vocabulary};

pub const DEFAULT_QUESTION_DIR: &str = "Question_Data";
/// Questions answered per matrix product
const BATCH_SIZE: usize = 100;

/// The questions of one file
#[derive(Debug, Clone)]
pub struct QuestionFile {
    pub name: String,
    pub questions: Vec<[String; 4]>,
    /// Every line of the file, section headers and skipped lines included
    pub lines: usize,
}

impl QuestionFile {
    /// Files named `gram*` test syntax, the rest test semantics
    pub fn is_syntactic(&self) -> bool {
        self.name.starts_with("gram")
    }

    pub fn parse<R: BufRead>(name: &str, reader: R) -> Result<QuestionFile> {
        let mut questions = vec![];
        let mut lines = 0;
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            lines += 1;
            let line = line.trim();
            // Section headers like ": capital-common-countries"
            if line.is_empty() || line.starts_with(':') { continue; }
            let words: Vec<&str> = line.split_whitespace().collect();
            if words.len() != 4 {
                warn!("{}:{} is not a four word analogy, skipping", name, line_no + 1);
                continue;
            }
            questions.push([
                words[0].to_lowercase(),
                words[1].to_lowercase(),
                words[2].to_lowercase(),
                words[3].to_lowercase(),
            ]);
        }
        Ok(QuestionFile { name: name.to_string(), questions, lines })
    }
}

/// Read every `.txt` file in a directory, in file name order
pub fn read_question_files<P: AsRef<Path>>(dir: P) -> Result<Vec<QuestionFile>> {
    let entries = fs::read_dir(dir.as_ref())
        .map_err(|e| Error::MissingFile("question directory", Some(e)))?;
    let mut paths = vec![];
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "txt") {
            paths.push(path);
        }
    }
    paths.sort();
    let mut files = vec![];
    for path in paths {
        let name = path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        files.push(QuestionFile::parse(&name, BufReader::new(File::open(&path)?))?);
    }
    Ok(files)
}

/// Correct answers out of a number of questions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accuracy {
    pub correct: usize,
    pub count: usize,
}

impl Accuracy {
    pub fn percent(&self) -> f64 {
        if self.count == 0 { 0.0 } else { 100.0 * self.correct as f64 / self.count as f64 }
    }

    fn add(&mut self, other: Accuracy) {
        self.correct += other.correct;
        self.count += other.count;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalogyReport {
    /// Per file accuracy over the questions whose words are all known
    pub files: Vec<(String, Accuracy)>,
    /// Every line read, including headers and questions with unknown words
    pub total_questions: usize,
    pub semantic: Accuracy,
    pub syntactic: Accuracy,
    pub total: Accuracy,
}

impl fmt::Display for AnalogyReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &(ref name, acc) in &self.files {
            writeln!(f, "{}:", name)?;
            writeln!(f, "ACCURACY TOP1: {:.2}% ({}/{})", acc.percent(), acc.correct, acc.count)?;
        }
        let seen = if self.total_questions == 0 { 0.0 }
            else { 100.0 * self.total.count as f64 / self.total_questions as f64 };
        writeln!(f)?;
        writeln!(f, "Questions seen/total: {:.2}% ({}/{})",
            seen, self.total.count, self.total_questions)?;
        writeln!(f, "Semantic accuracy: {:.2}%  ({}/{})",
            self.semantic.percent(), self.semantic.correct, self.semantic.count)?;
        writeln!(f, "Syntactic accuracy: {:.2}%  ({}/{})",
            self.syntactic.percent(), self.syntactic.correct, self.syntactic.count)?;
        writeln!(f, "Total accuracy: {:.2}%  ({}/{})",
            self.total.percent(), self.total.correct, self.total.count)
    }
}

/// Answers analogy questions with a normalized copy of an embedding
pub struct Analogies {
    normalized: Array2<f64>,
    words: Vec<String>,
    vocab: Vocabulary,
}

impl Analogies {
    pub fn new(embedding: &Embedding) -> Analogies {
        Analogies {
            normalized: embedding.normalized(),
            words: embedding.words.iter().map(|w| w.to_lowercase()).collect(),
            vocab: embedding.vocabulary(Duplicates::KeepFirst),
        }
    }

    /// Row ids of a question, if all four words are known
    fn lookup(&self, question: &[String; 4]) -> Option<[usize; 4]> {
        Some([
            self.vocab.get(&question[0])?,
            self.vocab.get(&question[1])?,
            self.vocab.get(&question[2])?,
            self.vocab.get(&question[3])?,
        ])
    }

    /// Predicted row for each question, given as `[a, b, c, _]` row ids
    pub fn predict(&self, questions: &[[usize; 4]]) -> Vec<usize> {
        let dim = self.normalized.ncols();
        let mut predictions = Vec::with_capacity(questions.len());
        for batch in questions.chunks(BATCH_SIZE) {
            let mut targets = Array2::zeros((batch.len(), dim));
            for (mut target, q) in targets.outer_iter_mut().zip(batch) {
                target.assign(&(&self.normalized.row(q[1]) - &self.normalized.row(q[0])
                    + &self.normalized.row(q[2])));
            }
            // cosine similarity since the rows are normalized
            let mut similarity = self.normalized.dot(&targets.t());
            for (k, q) in batch.iter().enumerate() {
                for &row in &q[..3] {
                    similarity[[row, k]] = ::std::f64::NEG_INFINITY;
                }
            }
            for column in similarity.axis_iter(Axis(1)) {
                predictions.push(argmax(column));
            }
        }
        predictions
    }

    pub fn evaluate(&self, files: &[QuestionFile]) -> AnalogyReport {
        let mut report = AnalogyReport {
            files: vec![],
            total_questions: 0,
            semantic: Accuracy::default(),
            syntactic: Accuracy::default(),
            total: Accuracy::default(),
        };
        for file in files {
            report.total_questions += file.lines;
            let known: Vec<[usize; 4]> = file.questions.iter()
                .filter_map(|q| self.lookup(q))
                .collect();
            let predictions = self.predict(&known);
            let correct = known.iter().zip(&predictions)
                .filter(|&(q, &predicted)| self.words[predicted] == self.words[q[3]])
                .count();
            let acc = Accuracy { correct, count: known.len() };
            info!("{}: {}/{} correct", file.name, acc.correct, acc.count);
            if file.is_syntactic() { report.syntactic.add(acc); } else { report.semantic.add(acc); }
            report.total.add(acc);
            report.files.push((file.name.clone(), acc));
        }
        report
    }
}

/// First index of the largest value
fn argmax(values: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] { best = i; }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn embedding() -> Embedding {
        // man/woman and king/queen differ along the second axis
        Embedding::new(
            vec!["man".into(), "woman".into(), "king".into(), "queen".into(), "apple".into()],
            arr2(&[
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [1.0, 0.0, 1.0],
                [1.0, 1.0, 1.0],
                [0.0, 0.0, -1.0],
            ])).unwrap()
    }

    #[test]
    fn parses_questions() {
        let text = ": family\nMan Woman King Queen\nbroken line\n\nman woman king queen\n";
        let file = QuestionFile::parse("family.txt", Cursor::new(text)).unwrap();
        assert_eq!(file.questions.len(), 2);
        assert_eq!(file.lines, 5);
        assert_eq!(file.questions[0][3], "queen");
        assert!(!file.is_syntactic());
        assert!(QuestionFile { name: "gram1-plural.txt".into(), questions: vec![], lines: 0 }
            .is_syntactic());
    }

    #[test]
    fn predicts_queen() {
        let emb = embedding();
        let analogies = Analogies::new(&emb);
        assert_eq!(analogies.predict(&[[0, 1, 2, 3]]), vec![3]);
    }

    #[test]
    fn question_words_are_excluded() {
        // woman - man + man = woman, which is excluded, so some other word wins
        let emb = embedding();
        let analogies = Analogies::new(&emb);
        let predicted = analogies.predict(&[[0, 1, 0, 1]]);
        assert!(predicted[0] != 0 && predicted[0] != 1);
    }

    #[test]
    fn report_counts_seen_questions() {
        let emb = embedding();
        let analogies = Analogies::new(&emb);
        let files = vec![
            QuestionFile::parse("family.txt",
                Cursor::new(": family\nman woman king queen\nman woman prince princess\n"))
                .unwrap(),
            QuestionFile::parse("gram-test.txt", Cursor::new("woman man queen apple\n")).unwrap(),
        ];
        let report = analogies.evaluate(&files);
        // the section header counts towards the total
        assert_eq!(report.total_questions, 4);
        assert_eq!(report.semantic, Accuracy { correct: 1, count: 1 });
        assert_eq!(report.syntactic.count, 1);
        assert_eq!(report.total.count, 2);
        let text = report.to_string();
        assert!(text.contains("family.txt:\nACCURACY TOP1: 100.00% (1/1)"));
        assert!(text.contains("Questions seen/total: 50.00% (2/4)"));
    }

    #[test]
    fn batches_agree_with_single_questions() {
        let emb = embedding();
        let analogies = Analogies::new(&emb);
        let questions: Vec<[usize; 4]> = (0..2 * BATCH_SIZE + 37)
            .map(|i| match i % 3 {
                0 => [0, 1, 2, 3],
                1 => [2, 3, 0, 1],
                _ => [1, 0, 3, 2],
            })
            .collect();
        let predicted = analogies.predict(&questions);
        assert_eq!(predicted.len(), questions.len());
        for (q, &p) in questions.iter().zip(&predicted) {
            assert_eq!(analogies.predict(&[*q]), vec![p]);
        }
        assert_eq!(predicted[0], 3);
        assert_eq!(predicted[BATCH_SIZE], predicted[BATCH_SIZE % 3]);
    }

    #[test]
    fn empty_groups_report_zero() {
        assert_eq!(Accuracy::default().percent(), 0.0);
    }
}
