//! Sentence sentiment from averaged word vectors
//!
//! Every sentence of the Stanford Sentiment Treebank is reduced to the mean vector of the words
//! the embedding knows. A linear SVM, with its regularization picked by cross validation on the
//! train and dev sentences, then labels the test sentences positive or negative. Neutral
//! sentences are left out.

use ndarray::prelude::*;
use rayon::prelude::*;
use regex::Regex;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::svm::Kernels;
use smartcore::svm::svc::{SVC, SVCParameters};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;
use analogy::Accuracy;
use errors::*;
use farm::{FarmMap, new_farm};
use vectors::{Duplicates, Embedding, Vocabulary};

pub const DEFAULT_TREEBANK_DIR: &str = "stanfordSentimentTreebank";
/// Regularization strengths tried by the grid search
pub const DEFAULT_C_GRID: [f64; 7] = [0.001, 0.01, 0.1, 1.0, 10.0, 100.0, 1000.0];
pub const DEFAULT_FOLDS: usize = 5;
/// Scores up to here are negative
const NEGATIVE_MAX: f64 = 0.4;
/// Scores above here are positive; anything between is neutral
const POSITIVE_MIN: f64 = 0.6;

pub const NEGATIVE: i32 = -1;
pub const POSITIVE: i32 = 1;

/// Which part of the treebank a sentence belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
    Dev,
}

impl Split {
    /// The codes of `datasetSplit.txt`: 1 train, 2 test, 3 dev
    pub fn from_code(code: &str) -> Result<Split> {
        match code.trim() {
            "1" => Ok(Split::Train),
            "2" => Ok(Split::Test),
            "3" => Ok(Split::Dev),
            other => Err(Error::Malformed(format!("unknown split code {:?}", other))),
        }
    }

    /// The dev sentences train the classifier too
    pub fn trains(self) -> bool {
        self != Split::Test
    }
}

/// `NEGATIVE` or `POSITIVE` for a sentiment score in [0, 1], None if it is neutral
pub fn label(score: f64) -> Option<i32> {
    if score <= NEGATIVE_MAX {
        Some(NEGATIVE)
    } else if score > POSITIVE_MIN {
        Some(POSITIVE)
    } else {
        None
    }
}

/// The four files of the Stanford Sentiment Treebank that sentence classification needs
#[derive(Debug, Clone)]
pub struct Treebank {
    /// Phrase text to phrase id
    pub phrases: FarmMap<String, usize>,
    /// Sentence texts, in sentence order
    pub sentences: Vec<String>,
    /// Sentiment score of each phrase id, from 0 (negative) to 1 (positive)
    pub scores: Vec<f64>,
    /// Split of each sentence
    pub splits: Vec<Split>,
}

impl Treebank {
    pub fn new(phrases: FarmMap<String, usize>, sentences: Vec<String>, scores: Vec<f64>,
        splits: Vec<Split>) -> Result<Treebank> {
        if sentences.len() != splits.len() {
            return Err(Error::InvalidDimensions(format!(
                "{} sentences but {} split assignments", sentences.len(), splits.len())));
        }
        Ok(Treebank { phrases, sentences, scores, splits })
    }

    /// Read `dictionary.txt`, `datasetSentences.txt`, `sentiment_labels.txt` and
    /// `datasetSplit.txt` from a treebank directory
    pub fn read<P: AsRef<Path>>(dir: P) -> Result<Treebank> {
        let dir = dir.as_ref();
        let open = |name: &str, what: &'static str| -> Result<BufReader<File>> {
            File::open(dir.join(name))
                .map(BufReader::new)
                .map_err(|e| Error::MissingFile(what, Some(e)))
        };
        let start = Instant::now();
        let treebank = Treebank::new(
            parse_dictionary(open("dictionary.txt", "treebank phrase dictionary")?)?,
            parse_sentences(open("datasetSentences.txt", "treebank sentence file")?)?,
            parse_scores(open("sentiment_labels.txt", "treebank sentiment labels")?)?,
            parse_splits(open("datasetSplit.txt", "treebank split file")?)?)?;
        info!("Read {} sentences and {} phrases in {:.1} seconds",
            treebank.sentences.len(), treebank.phrases.len(), start.elapsed().as_secs_f64());
        Ok(treebank)
    }

    /// Sentiment score of a whole sentence, if the dictionary has it as a phrase
    pub fn score_of(&self, sentence: &str) -> Option<f64> {
        self.phrases.get(sentence).and_then(|&id| self.scores.get(id).cloned())
    }
}

/// Non-empty lines, optionally skipping a header line
fn data_lines<R: BufRead>(reader: R, header: bool) -> Result<Vec<String>> {
    let mut lines = vec![];
    for line in reader.lines().skip(if header { 1 } else { 0 }) {
        let line = line?;
        if !line.is_empty() { lines.push(line); }
    }
    Ok(lines)
}

/// `phrase|id` per line, no header
pub fn parse_dictionary<R: BufRead>(reader: R) -> Result<FarmMap<String, usize>> {
    let mut phrases = new_farm();
    for line in data_lines(reader, false)? {
        let bar = line.rfind('|')
            .ok_or_else(|| Error::Malformed(format!("expected `phrase|id`, got {:?}", line)))?;
        phrases.insert(line[..bar].to_string(), line[bar + 1..].trim().parse::<usize>()?);
    }
    Ok(phrases)
}

/// `index<TAB>sentence` per line, after a header
pub fn parse_sentences<R: BufRead>(reader: R) -> Result<Vec<String>> {
    data_lines(reader, true)?.into_iter()
        .map(|line| match line.find('\t') {
            Some(tab) => Ok(line[tab + 1..].to_string()),
            None => Err(Error::Malformed(format!("expected `index<TAB>sentence`, got {:?}", line))),
        })
        .collect()
}

/// `phrase id|score` per line, after a header. Phrase ids count up from 0 in file order.
pub fn parse_scores<R: BufRead>(reader: R) -> Result<Vec<f64>> {
    data_lines(reader, true)?.into_iter()
        .map(|line| match line.split('|').nth(1) {
            Some(score) => Ok(score.trim().parse::<f64>()?),
            None => Err(Error::Malformed(format!("expected `id|score`, got {:?}", line))),
        })
        .collect()
}

/// `sentence index,split code` per line, after a header
pub fn parse_splits<R: BufRead>(reader: R) -> Result<Vec<Split>> {
    data_lines(reader, true)?.into_iter()
        .map(|line| match line.split(',').nth(1) {
            Some(code) => Split::from_code(code),
            None => Err(Error::Malformed(format!("expected `index,split`, got {:?}", line))),
        })
        .collect()
}

/// Turns sentences into the mean vector of their known words
pub struct SentenceEncoder<'a> {
    embedding: &'a Embedding,
    vocab: Vocabulary,
    non_word: Regex,
}

impl<'a> SentenceEncoder<'a> {
    pub fn new(embedding: &'a Embedding) -> Result<SentenceEncoder<'a>> {
        Ok(SentenceEncoder {
            embedding,
            vocab: embedding.vocabulary(Duplicates::KeepLast),
            non_word: Regex::new(r"\W+")?,
        })
    }

    /// Rows of the sentence's words, lowercased and stripped of punctuation. Unknown words are
    /// left out.
    pub fn tokens(&self, sentence: &str) -> Vec<usize> {
        sentence.split_whitespace()
            .filter_map(|word| {
                let word = word.to_lowercase();
                self.vocab.get(&self.non_word.replace_all(&word, ""))
            })
            .collect()
    }

    /// Mean vector of the known words, None if there are none
    pub fn encode(&self, sentence: &str) -> Option<Array1<f64>> {
        let tokens = self.tokens(sentence);
        if tokens.is_empty() { return None; }
        self.embedding.vectors.select(Axis(0), &tokens).mean_axis(Axis(0))
    }

    pub fn dim(&self) -> usize {
        self.embedding.dim()
    }
}

/// Sentence vectors and their labels
#[derive(Debug, Clone, PartialEq)]
pub struct Samples {
    pub features: Array2<f64>,
    pub labels: Vec<i32>,
}

impl Samples {
    fn from_rows(rows: Vec<Array1<f64>>, labels: Vec<i32>, dim: usize) -> Result<Samples> {
        let mut flat = Vec::with_capacity(rows.len() * dim);
        for row in &rows {
            flat.extend(row.iter().cloned());
        }
        let features = Array2::from_shape_vec((rows.len(), dim), flat)?;
        Ok(Samples { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The samples at the given positions
    pub fn select(&self, indices: &[usize]) -> Samples {
        Samples {
            features: self.features.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// Train and test samples from the non-neutral sentences that have at least one known word
pub fn samples(treebank: &Treebank, encoder: &SentenceEncoder) -> Result<(Samples, Samples)> {
    let (mut train_rows, mut train_labels) = (vec![], vec![]);
    let (mut test_rows, mut test_labels) = (vec![], vec![]);
    let mut missing = 0;
    let mut unknown = 0;
    for (sentence, &split) in treebank.sentences.iter().zip(&treebank.splits) {
        let score = match treebank.score_of(sentence) {
            Some(score) => score,
            None => { missing += 1; continue; },
        };
        let label = match label(score) {
            Some(label) => label,
            None => continue,
        };
        let vector = match encoder.encode(sentence) {
            Some(vector) => vector,
            None => { unknown += 1; continue; },
        };
        if split.trains() {
            train_rows.push(vector);
            train_labels.push(label);
        } else {
            test_rows.push(vector);
            test_labels.push(label);
        }
    }
    if missing > 0 {
        warn!("{} sentences aren't in the phrase dictionary, skipping", missing);
    }
    debug!("{} sentences have no known words", unknown);
    info!("{} train and {} test sentences", train_labels.len(), test_labels.len());
    Ok((Samples::from_rows(train_rows, train_labels, encoder.dim())?,
        Samples::from_rows(test_rows, test_labels, encoder.dim())?))
}

/// Anything that learns labels from rows, given a regularization strength
pub trait Classifier {
    fn fit_predict(&self, train: &Samples, test: ArrayView2<f64>, c: f64) -> Result<Vec<i32>>;
}

/// Support vector machine with a linear kernel
#[derive(Debug, Clone, Copy)]
pub struct LinearSvm {
    pub seed: u64,
}

fn dense(rows: ArrayView2<f64>) -> DenseMatrix<f64> {
    let values: Vec<Vec<f64>> = rows.outer_iter().map(|row| row.to_vec()).collect();
    DenseMatrix::from_2d_vec(&values)
}

impl Classifier for LinearSvm {
    fn fit_predict(&self, train: &Samples, test: ArrayView2<f64>, c: f64) -> Result<Vec<i32>> {
        if test.nrows() == 0 { return Ok(vec![]); }
        let x = dense(train.features.view());
        let y = train.labels.clone();
        let unseen = dense(test);
        let parameters: SVCParameters<f64, i32, DenseMatrix<f64>, Vec<i32>> =
            SVCParameters::default()
                .with_c(c)
                .with_kernel(Kernels::linear())
                .with_seed(Some(self.seed));
        let svm = SVC::fit(&x, &y, &parameters)?;
        let predicted = svm.predict(&unseen)?;
        Ok(predicted.iter().map(|&p| if p > 0.0 { POSITIVE } else { NEGATIVE }).collect())
    }
}

/// Test positions of `k` stratified folds.
///
/// Each class is cut into `k` contiguous blocks in sample order, the first blocks one larger
/// when it doesn't divide evenly, and fold `f` takes block `f` of every class.
pub fn stratified_folds(labels: &[i32], k: usize) -> Vec<Vec<usize>> {
    let mut classes = labels.to_vec();
    classes.sort();
    classes.dedup();
    let mut folds = vec![vec![]; k];
    for class in classes {
        let members: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == class).collect();
        let mut start = 0;
        for (f, fold) in folds.iter_mut().enumerate() {
            let size = members.len() / k + if f < members.len() % k { 1 } else { 0 };
            fold.extend_from_slice(&members[start..start + size]);
            start += size;
        }
    }
    for fold in &mut folds { fold.sort(); }
    folds
}

fn correct(truth: &[i32], predicted: &[i32]) -> usize {
    truth.iter().zip(predicted).filter(|&(t, p)| t == p).count()
}

/// Mean cross validated accuracy of every `c`, and the first `c` with the best one
pub fn grid_search<C: Classifier + Sync>(classifier: &C, train: &Samples, grid: &[f64],
    folds: usize) -> Result<(f64, Vec<f64>)> {
    if grid.is_empty() {
        return Err(Error::InvalidParameter("need at least one value of C to try".into()));
    }
    if folds < 2 {
        return Err(Error::InvalidParameter("cross validation needs at least 2 folds".into()));
    }
    for &class in &[NEGATIVE, POSITIVE] {
        let count = train.labels.iter().filter(|&&l| l == class).count();
        if count < folds {
            return Err(Error::InvalidParameter(format!(
                "only {} training sentences labelled {}, fewer than the {} folds",
                count, class, folds)));
        }
    }

    let test_folds = stratified_folds(&train.labels, folds);
    let splits: Vec<(Samples, Samples)> = test_folds.iter()
        .map(|held_out| {
            let rest: Vec<usize> = (0..train.len())
                .filter(|i| held_out.binary_search(i).is_err())
                .collect();
            (train.select(&rest), train.select(held_out))
        })
        .collect();

    let accuracies = grid.par_iter()
        .map(|&c| {
            let mut total = 0.0;
            for &(ref fit, ref check) in &splits {
                let predicted = classifier.fit_predict(fit, check.features.view(), c)?;
                total += correct(&check.labels, &predicted) as f64 / check.len() as f64;
            }
            let accuracy = total / splits.len() as f64;
            info!("C = {}: cross validated accuracy {:.4}", c, accuracy);
            Ok(accuracy)
        })
        .collect::<Result<Vec<f64>>>()?;

    let mut best = 0;
    for (i, &accuracy) in accuracies.iter().enumerate() {
        if accuracy > accuracies[best] { best = i; }
    }
    Ok((grid[best], accuracies))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentimentReport {
    /// Regularization the final classifier was trained with
    pub c: f64,
    pub accuracy: Accuracy,
}

impl fmt::Display for SentimentReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Accuracy for sentiment classification is: {:.2}% ({}/{})",
            self.accuracy.percent(), self.accuracy.correct, self.accuracy.count)
    }
}

/// Pick C by cross validation, retrain on all of `train` and score on `test`
pub fn evaluate<C: Classifier + Sync>(classifier: &C, train: &Samples, test: &Samples,
    grid: &[f64], folds: usize) -> Result<SentimentReport> {
    let start = Instant::now();
    let (c, _) = grid_search(classifier, train, grid, folds)?;
    info!("Picked C = {} in {:.1} seconds", c, start.elapsed().as_secs_f64());
    let predicted = classifier.fit_predict(train, test.features.view(), c)?;
    Ok(SentimentReport {
        c,
        accuracy: Accuracy { correct: correct(&test.labels, &predicted), count: test.len() },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn embedding() -> Embedding {
        Embedding::new(
            vec!["good".into(), "Movie".into(), "bad".into(), "film".into()],
            arr2(&[
                [1.0, 0.0],
                [0.0, 1.0],
                [-1.0, 0.0],
                [0.0, 3.0],
            ])).unwrap()
    }

    fn treebank() -> Treebank {
        let dictionary = "good movie|0\nbad movie|1\nokay movie|2\nbad|3\nzzz qqq|4\ngood film|5\n";
        let sentences = "sentence_index\tsentence\n1\tgood movie\n2\tbad movie\n\
            3\tokay movie\n4\tbad\n5\tzzz qqq\n6\tnot in the dictionary\n7\tgood film\n";
        let scores = "phrase ids|sentiment values\n0|0.9\n1|0.1\n2|0.5\n3|0.2\n4|0.9\n5|0.61\n";
        let splits = "sentence_index,splitset_label\n1,1\n2,3\n3,1\n4,2\n5,2\n6,1\n7,2\n";
        Treebank::new(
            parse_dictionary(Cursor::new(dictionary)).unwrap(),
            parse_sentences(Cursor::new(sentences)).unwrap(),
            parse_scores(Cursor::new(scores)).unwrap(),
            parse_splits(Cursor::new(splits)).unwrap()).unwrap()
    }

    /// Predicts the sign of the first feature, but only once C is at least 1
    struct FirstFeature;

    impl Classifier for FirstFeature {
        fn fit_predict(&self, _: &Samples, test: ArrayView2<f64>, c: f64) -> Result<Vec<i32>> {
            Ok(test.outer_iter()
                .map(|row| if c < 1.0 || row[0] > 0.0 { POSITIVE } else { NEGATIVE })
                .collect())
        }
    }

    fn separable(n: usize) -> Samples {
        let labels: Vec<i32> = (0..n)
            .map(|i| if i % 2 == 0 { POSITIVE } else { NEGATIVE })
            .collect();
        let features = Array2::from_shape_fn((n, 2), |(i, j)| {
            let sign = labels[i] as f64;
            if j == 0 { sign * (2.0 + (i % 5) as f64) } else { (i % 3) as f64 - 1.0 }
        });
        Samples { features, labels }
    }

    #[test]
    fn neutral_scores_have_no_label() {
        assert_eq!(label(0.0), Some(NEGATIVE));
        assert_eq!(label(0.4), Some(NEGATIVE));
        assert_eq!(label(0.41), None);
        assert_eq!(label(0.6), None);
        assert_eq!(label(0.61), Some(POSITIVE));
    }

    #[test]
    fn reads_split_codes() {
        assert_eq!(Split::from_code("1").unwrap(), Split::Train);
        assert_eq!(Split::from_code("2").unwrap(), Split::Test);
        assert_eq!(Split::from_code("3 ").unwrap(), Split::Dev);
        assert!(Split::from_code("4").is_err());
        assert!(Split::Dev.trains());
        assert!(!Split::Test.trains());
    }

    #[test]
    fn parses_treebank_files() {
        let bank = treebank();
        assert_eq!(bank.sentences.len(), 7);
        assert_eq!(bank.sentences[0], "good movie");
        assert_eq!(bank.score_of("bad"), Some(0.2));
        assert_eq!(bank.score_of("not in the dictionary"), None);
        assert_eq!(bank.splits[1], Split::Dev);
        assert!(parse_dictionary(Cursor::new("no separator\n")).is_err());
        assert!(parse_sentences(Cursor::new("header\nno tab\n")).is_err());
    }

    #[test]
    fn mismatched_splits_are_rejected() {
        let result = Treebank::new(new_farm(), vec!["a".into(), "b".into()], vec![],
            vec![Split::Train]);
        assert!(result.is_err());
    }

    #[test]
    fn sentences_are_lowercased_and_stripped() {
        let emb = embedding();
        let encoder = SentenceEncoder::new(&emb).unwrap();
        assert_eq!(encoder.tokens("A GOOD, movie !"), vec![0, 1]);
        assert_eq!(encoder.encode("A GOOD, movie !"), Some(arr1(&[0.5, 0.5])));
        assert_eq!(encoder.encode("nothing known here"), None);
    }

    #[test]
    fn splits_sentences_into_train_and_test() {
        let emb = embedding();
        let encoder = SentenceEncoder::new(&emb).unwrap();
        let (train, test) = samples(&treebank(), &encoder).unwrap();
        // the neutral "okay movie" and the dictionary-less sentence are dropped
        assert_eq!(train.labels, vec![POSITIVE, NEGATIVE]);
        assert_eq!(train.features, arr2(&[[0.5, 0.5], [-0.5, 0.5]]));
        // "zzz qqq" has no known words
        assert_eq!(test.labels, vec![NEGATIVE, POSITIVE]);
        assert_eq!(test.features, arr2(&[[-1.0, 0.0], [0.5, 1.5]]));
    }

    #[test]
    fn folds_are_stratified() {
        let labels = [1, 1, 1, 1, -1, -1, -1, -1, -1, 1];
        let folds = stratified_folds(&labels, 2);
        assert_eq!(folds, vec![vec![0, 1, 2, 4, 5, 6], vec![3, 7, 8, 9]]);
    }

    #[test]
    fn grid_search_picks_the_first_best_c() {
        let train = separable(20);
        let (c, accuracies) = grid_search(&FirstFeature, &train, &DEFAULT_C_GRID, 5).unwrap();
        assert_eq!(c, 1.0);
        assert_eq!(accuracies[0], 0.5);
        assert_eq!(accuracies[3], 1.0);
        assert_eq!(accuracies[6], 1.0);
    }

    #[test]
    fn grid_search_needs_both_classes_in_every_fold() {
        let train = separable(6);
        assert!(grid_search(&FirstFeature, &train, &DEFAULT_C_GRID, 5).is_err());
        assert!(grid_search(&FirstFeature, &separable(20), &[], 5).is_err());
        assert!(grid_search(&FirstFeature, &separable(20), &[1.0], 1).is_err());
    }

    #[test]
    fn reports_test_accuracy() {
        let train = separable(20);
        let test = Samples {
            features: arr2(&[[3.0, 0.0], [-3.0, 0.0], [2.0, 1.0], [4.0, -1.0]]),
            labels: vec![POSITIVE, NEGATIVE, NEGATIVE, POSITIVE],
        };
        let report = evaluate(&FirstFeature, &train, &test, &DEFAULT_C_GRID, 5).unwrap();
        assert_eq!(report.accuracy, Accuracy { correct: 3, count: 4 });
        assert_eq!(report.to_string(), "Accuracy for sentiment classification is: 75.00% (3/4)");
    }

    #[test]
    fn linear_svm_separates_clusters() {
        let train = separable(20);
        let test = arr2(&[[6.0, 0.0], [-6.0, 0.5], [5.0, -1.0], [-5.0, 1.0]]);
        let predicted = LinearSvm { seed: 0 }.fit_predict(&train, test.view(), 10.0).unwrap();
        assert_eq!(predicted, vec![POSITIVE, NEGATIVE, POSITIVE, NEGATIVE]);
    }
}
