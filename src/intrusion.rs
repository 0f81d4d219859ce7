//! Word intrusion: can a person spot the word that doesn't belong to a dimension?
//!
//! A question shows the four strongest words of a dimension plus one intruder that is weak in
//! that dimension but strong in another. If people find the intruder reliably, the dimension is
//! coherent. Questions from several embeddings can share one survey; each answer carries the
//! label of the embedding it tests.

use ndarray::prelude::*;
use rand::Rng;
use rand::seq::{index, SliceRandom};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use errors::*;

/// Words shown per question
pub const CHOICES: usize = 5;
pub const DEFAULT_QUESTIONS_FILE: &str = "word_intrusion_test_questions.txt";
pub const DEFAULT_ANSWERS_FILE: &str = "word_intrusion_test_answers.txt";
/// The intruder comes from this share of a dimension's weakest words
const BOTTOM_FRACTION: f64 = 0.5;
/// ..and from this share of some other dimension's strongest words
const TOP_FRACTION: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub words: Vec<String>,
}

impl Question {
    /// Parse `1) w1 2) w2 3) w3 4) w4 5) w5`: the words sit at every other token
    pub fn parse(line: &str) -> Result<Question> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 2 * CHOICES {
            return Err(Error::Malformed(format!(
                "expected {} numbered words in question {:?}", CHOICES, line)));
        }
        let words = (0..CHOICES).map(|i| tokens[2 * i + 1].to_string()).collect();
        Ok(Question { words })
    }

    /// 1-based position of a word
    pub fn choice_of(&self, word: &str) -> Option<usize> {
        self.words.iter().position(|w| w == word).map(|i| i + 1)
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let numbered: Vec<String> = self.words.iter().enumerate()
            .map(|(i, w)| format!("{}) {}", i + 1, w))
            .collect();
        write!(f, "{}", numbered.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub intruder: String,
    /// Which embedding the question was drawn from
    pub label: String,
}

impl Answer {
    pub fn parse(line: &str) -> Result<Answer> {
        let mut tokens = line.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some(intruder), Some(label)) => Ok(Answer {
                intruder: intruder.to_string(),
                label: label.to_string(),
            }),
            _ => Err(Error::Malformed(format!("expected `<intruder> <label>`, got {:?}", line))),
        }
    }
}

/// Questions paired with their answers, as shown to participants
#[derive(Debug, Clone)]
pub struct Survey {
    pub lines: Vec<String>,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
}

impl Survey {
    pub fn new(lines: Vec<String>, answers: Vec<Answer>) -> Result<Survey> {
        if lines.len() != answers.len() {
            return Err(Error::Malformed(format!(
                "{} questions but {} answers", lines.len(), answers.len())));
        }
        let questions = lines.iter().map(|l| Question::parse(l)).collect::<Result<Vec<_>>>()?;
        for (n, (q, a)) in questions.iter().zip(&answers).enumerate() {
            if q.choice_of(&a.intruder).is_none() {
                return Err(Error::Malformed(format!(
                    "question {} doesn't contain its intruder {:?}", n + 1, a.intruder)));
            }
        }
        Ok(Survey { lines, questions, answers })
    }

    pub fn read<P: AsRef<Path>, Q: AsRef<Path>>(questions: P, answers: Q) -> Result<Survey> {
        let lines = read_lines(questions.as_ref(), "questions file")?;
        let answers = read_lines(answers.as_ref(), "answers file")?
            .iter()
            .map(|l| Answer::parse(l))
            .collect::<Result<Vec<_>>>()?;
        Survey::new(lines, answers)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Ask every question on `output`, reading picks from `input`
    pub fn run<R: BufRead, W: Write>(&self, mut input: R, mut output: W) -> Result<Tally> {
        let mut tally = Tally::default();
        writeln!(output, "Enter intruder word id: ")?;
        for (n, (question, answer)) in self.questions.iter().zip(&self.answers).enumerate() {
            writeln!(output, "Question {} / {}: {}", n + 1, self.len(), self.lines[n])?;
            write!(output, "Your answer: ")?;
            output.flush()?;
            let pick = loop {
                let mut line = String::new();
                if input.read_line(&mut line)? == 0 {
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof,
                        "survey input ended before the last question").into());
                }
                match line.trim().parse::<usize>() {
                    Ok(pick) if pick >= 1 && pick <= CHOICES => break pick,
                    _ => {
                        write!(output, "Invalid answer! Enter intruder word id (1,2,3,4,5): ")?;
                        output.flush()?;
                    },
                }
            };
            tally.record(&answer.label, question.choice_of(&answer.intruder) == Some(pick));
            writeln!(output, "\n")?;
        }
        Ok(tally)
    }
}

fn read_lines(path: &Path, what: &'static str) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| Error::MissingFile(what, Some(e)))?;
    let mut lines = vec![];
    for line in BufReader::new(file).lines() {
        let line = line?;
        if !line.trim().is_empty() { lines.push(line); }
    }
    Ok(lines)
}

/// Right and wrong picks, per embedding label
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    pub results: BTreeMap<String, Vec<bool>>,
}

impl Tally {
    pub fn record(&mut self, label: &str, correct: bool) {
        self.results.entry(label.to_string()).or_insert_with(Vec::new).push(correct);
    }

    /// Write `word_intrusion_<label>_results_<participant>.txt`, one 0 or 1 per line
    pub fn write_results<P: AsRef<Path>>(&self, dir: P, participant: &str)
        -> Result<Vec<PathBuf>> {
        let mut written = vec![];
        for (label, results) in &self.results {
            let path = dir.as_ref()
                .join(format!("word_intrusion_{}_results_{}.txt", label, participant));
            let mut file = File::create(&path)?;
            for &correct in results {
                writeln!(file, "{}", if correct { 1 } else { 0 })?;
            }
            written.push(path);
        }
        Ok(written)
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (label, results) in &self.results {
            writeln!(f, "You picked the intruder word correctly in {} of {} {} dimensions.",
                results.iter().filter(|&&c| c).count(), results.len(), label)?;
        }
        Ok(())
    }
}

/// Build intrusion questions for `count` randomly chosen dimensions
pub fn generate<R: Rng>(vectors: ArrayView2<f64>, words: &[String], label: &str, count: usize,
    rng: &mut R) -> Result<Vec<(Question, Answer)>> {
    let (rows, dims) = vectors.dim();
    if words.len() != rows {
        return Err(Error::InvalidDimensions(format!(
            "{} words for a matrix of {} rows", words.len(), rows)));
    }
    if rows < 2 * CHOICES {
        return Err(Error::InvalidParameter(format!(
            "need at least {} words to build intrusion questions", 2 * CHOICES)));
    }
    if count > dims {
        return Err(Error::InvalidParameter(format!(
            "asked for {} questions but there are only {} dimensions", count, dims)));
    }
    if let Some(((row, dimension), _)) = vectors.indexed_iter().find(|&(_, x)| !x.is_finite()) {
        return Err(Error::NonFinite { row, dimension });
    }

    let descending: Vec<Vec<usize>> = (0..dims)
        .map(|dim| descending_rows(vectors.column(dim)))
        .collect();
    // how many dimensions each row is a top word of
    let top_len = ((rows as f64 * TOP_FRACTION).ceil() as usize).max(1);
    let mut top_of = vec![0usize; rows];
    for order in &descending {
        for &row in &order[..top_len] { top_of[row] += 1; }
    }

    let bottom_start = rows - ((rows as f64 * BOTTOM_FRACTION).floor() as usize).max(1);
    let mut questions = vec![];
    for dim in index::sample(rng, dims, count).into_iter() {
        let order = &descending[dim];
        let top = &order[..CHOICES - 1];
        let bottom = &order[bottom_start..];
        // the bottom half can't hold this dimension's own top words, so any count is elsewhere
        let strong_elsewhere: Vec<usize> = bottom.iter()
            .cloned()
            .filter(|&row| top_of[row] > 0)
            .collect();
        let pool = if strong_elsewhere.is_empty() { bottom.to_vec() } else { strong_elsewhere };
        let intruder = match pool.choose(rng) {
            Some(&row) => row,
            None => continue,
        };
        let mut choices: Vec<usize> = top.to_vec();
        choices.push(intruder);
        choices.shuffle(rng);
        debug!("Dimension {}: intruder {:?}", dim, words[intruder]);
        questions.push((
            Question { words: choices.iter().map(|&row| words[row].clone()).collect() },
            Answer { intruder: words[intruder].clone(), label: label.to_string() },
        ));
    }
    Ok(questions)
}

/// Rows from the largest coordinate to the smallest; ties keep row order
fn descending_rows(column: ArrayView1<f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..column.len()).collect();
    order.sort_by(|&a, &b| column[b].total_cmp(&column[a]));
    order
}

/// Append generated questions and answers to the survey files
pub fn append_survey<P: AsRef<Path>, Q: AsRef<Path>>(questions: P, answers: Q,
    generated: &[(Question, Answer)]) -> Result<()> {
    let mut qfile = OpenOptions::new().create(true).append(true).open(questions.as_ref())?;
    let mut afile = OpenOptions::new().create(true).append(true).open(answers.as_ref())?;
    for &(ref question, ref answer) in generated {
        writeln!(qfile, "{}", question)?;
        writeln!(afile, "{} {}", answer.intruder, answer.label)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::io::Cursor;

    fn survey() -> Survey {
        Survey::new(
            vec![
                "1) red 2) blue 3) green 4) cat 5) yellow".to_string(),
                "1) dog 2) piano 3) cat 4) horse 5) cow".to_string(),
            ],
            vec![
                Answer { intruder: "cat".into(), label: "imbue".into() },
                Answer { intruder: "piano".into(), label: "glove".into() },
            ]).unwrap()
    }

    #[test]
    fn parses_numbered_questions() {
        let q = Question::parse("1) red 2) blue 3) green 4) cat 5) yellow").unwrap();
        assert_eq!(q.words, vec!["red", "blue", "green", "cat", "yellow"]);
        assert_eq!(q.choice_of("cat"), Some(4));
        assert_eq!(q.to_string(), "1) red 2) blue 3) green 4) cat 5) yellow");
        assert!(Question::parse("1) red 2) blue").is_err());
    }

    #[test]
    fn parses_answers() {
        assert_eq!(Answer::parse("cat imbue").unwrap(),
            Answer { intruder: "cat".into(), label: "imbue".into() });
        assert!(Answer::parse("cat").is_err());
    }

    #[test]
    fn intruder_must_be_among_choices() {
        let result = Survey::new(
            vec!["1) a 2) b 3) c 4) d 5) e".to_string()],
            vec![Answer { intruder: "z".into(), label: "glove".into() }]);
        assert!(result.is_err());
    }

    #[test]
    fn survey_reprompts_and_tallies() {
        let mut output = vec![];
        let tally = survey().run(Cursor::new("7\nx\n4\n1\n"), &mut output).unwrap();
        assert_eq!(tally.results["imbue"], vec![true]);
        assert_eq!(tally.results["glove"], vec![false]);
        let shown = String::from_utf8(output).unwrap();
        assert_eq!(shown.matches("Invalid answer!").count(), 2);
        assert!(shown.contains("Question 2 / 2: 1) dog 2) piano"));
        assert!(tally.to_string()
            .contains("You picked the intruder word correctly in 1 of 1 imbue dimensions."));
    }

    #[test]
    fn survey_fails_when_input_runs_out() {
        match survey().run(Cursor::new("4\n"), io::sink()) {
            Err(Error::IOError(ref err)) => assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected UnexpectedEof, got {:?}", other),
        }
    }

    #[test]
    fn generated_questions_hide_a_weak_word() {
        // dimension d puts rows 4d..4d+3 on top; everything else is small
        let rows = 12;
        let dims = 3;
        let vectors = Array2::from_shape_fn((rows, dims), |(row, dim)| {
            if row / 4 == dim { 10.0 - (row % 4) as f64 } else { (row % 4) as f64 * 0.1 }
        });
        let words: Vec<String> = (0..rows).map(|r| format!("w{}", r)).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let generated = generate(vectors.view(), &words, "glove", 3, &mut rng).unwrap();
        assert_eq!(generated.len(), 3);
        for &(ref question, ref answer) in &generated {
            assert_eq!(question.words.len(), CHOICES);
            assert!(question.choice_of(&answer.intruder).is_some());
            assert_eq!(answer.label, "glove");
            // the four top words of a dimension share a block; the intruder doesn't
            let block = |w: &str| w[1..].parse::<usize>().unwrap() / 4;
            let intruder_block = block(answer.intruder.as_str());
            let others: Vec<usize> = question.words.iter()
                .filter(|w| **w != answer.intruder)
                .map(|w| block(w.as_str()))
                .collect();
            assert!(others.iter().all(|&b| b == others[0]));
            assert!(intruder_block != others[0]);
        }
    }

    #[test]
    fn intruder_falls_back_to_any_weak_word() {
        // both dimensions share their top words, so no weak word is strong anywhere else
        let rows = 12;
        let vectors = Array2::from_shape_fn((rows, 2), |(row, _)| (rows - row) as f64);
        let words: Vec<String> = (0..rows).map(|r| format!("w{}", r)).collect();
        let mut rng = StdRng::seed_from_u64(3);
        let generated = generate(vectors.view(), &words, "glove", 2, &mut rng).unwrap();
        assert_eq!(generated.len(), 2);
        for &(ref question, ref answer) in &generated {
            let intruder: usize = answer.intruder[1..].parse().unwrap();
            assert!(intruder >= rows / 2);
            let mut top: Vec<&str> = question.words.iter()
                .map(|w| w.as_str())
                .filter(|&w| w != answer.intruder)
                .collect();
            top.sort();
            assert_eq!(top, vec!["w0", "w1", "w2", "w3"]);
        }
    }

    #[test]
    fn generation_is_seeded() {
        let vectors = Array2::from_shape_fn((20, 4), |(r, d)| ((r * 7 + d * 3) % 11) as f64);
        let words: Vec<String> = (0..20).map(|r| format!("w{}", r)).collect();
        let a = generate(vectors.view(), &words, "x", 4, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = generate(vectors.view(), &words, "x", 4, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
        assert!(generate(vectors.view(), &words, "x", 5, &mut StdRng::seed_from_u64(1)).is_err());
    }
}
