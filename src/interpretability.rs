//! Interpretability of embedding dimensions against semantic categories
//!
//! Every dimension ranks the vocabulary by its coordinate. A dimension "captures" a category
//! when the category's members crowd one extreme end of that ranking. For a category of `m`
//! words we look at the `λ·m` most extreme words, then shrink the window to `λ·i` for
//! `i = m, m-1, ...` and take the best share of members found inside, as long as at least
//! `min_count` of them remain. A dimension is credited with its best category, and the
//! interpretability of the embedding is the mean over dimensions, once per `min_count`.
//!
//! Both ends of a dimension are searched unless the embedding has no negative values.

use ndarray::prelude::*;
use rayon::prelude::*;
use std::cmp;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use categories::Category;
use errors::*;

pub const DEFAULT_VOCAB_LIMIT: usize = 50_000;
pub const DEFAULT_LAMBDA: usize = 5;
pub const DEFAULT_MIN_COUNTS: [usize; 4] = [5, 10, 15, 20];

/// Which extreme of a dimension to search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Largest coordinates first
    Positive,
    /// Smallest coordinates first
    Negative,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Window multiplier: a category of m words is looked for among the λ·m most extreme words
    pub lambda: usize,
    /// Minimum number of category words a window must hold, one score per entry
    pub min_counts: Vec<usize>,
    /// Give up if scoring is still running at this point
    pub deadline: Option<Instant>,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            lambda: DEFAULT_LAMBDA,
            min_counts: DEFAULT_MIN_COUNTS.to_vec(),
            deadline: None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.lambda == 0 {
            return Err(Error::InvalidParameter("lambda must be at least 1".into()));
        }
        if self.min_counts.is_empty() {
            return Err(Error::InvalidParameter("need at least one minimum word count".into()));
        }
        if self.min_counts.contains(&0) {
            return Err(Error::InvalidParameter("minimum word counts must be at least 1".into()));
        }
        Ok(())
    }
}

/// Rank order of the vocabulary along one dimension
///
/// Ties keep row order, so among equal values the later row ranks as more positive.
#[derive(Debug, Clone)]
pub struct DimensionRanks {
    /// Ascending position of each row
    position: Vec<usize>,
    positive: usize,
    negative: usize,
}

impl DimensionRanks {
    /// Values must be finite (or at least not NaN) for the order to mean anything.
    pub fn new(column: ArrayView1<f64>) -> DimensionRanks {
        let mut ascending: Vec<usize> = (0..column.len()).collect();
        // sort_by is stable
        ascending.sort_by(|&a, &b| column[a].total_cmp(&column[b]));
        let mut position = vec![0; column.len()];
        for (pos, &row) in ascending.iter().enumerate() {
            position[row] = pos;
        }
        DimensionRanks {
            position,
            positive: column.iter().filter(|&&x| x > 0.0).count(),
            negative: column.iter().filter(|&&x| x < 0.0).count(),
        }
    }

    /// How many rows lie strictly on the given side of zero
    pub fn nonzero_count(&self, polarity: Polarity) -> usize {
        match polarity {
            Polarity::Positive => self.positive,
            Polarity::Negative => self.negative,
        }
    }

    /// Distance of a row from the given extreme; 0 is the most extreme row
    pub fn rank(&self, row: usize, polarity: Polarity) -> usize {
        match polarity {
            Polarity::Positive => self.position.len() - 1 - self.position[row],
            Polarity::Negative => self.position[row],
        }
    }

    /// Ranks of the member rows that fall among the `max_range` most extreme rows, ascending
    pub fn window_ranks(&self, members: &[usize], polarity: Polarity, max_range: usize)
        -> Vec<usize> {
        let mut ranks: Vec<usize> = members.iter()
            .map(|&row| self.rank(row, polarity))
            .filter(|&rank| rank < max_range)
            .collect();
        ranks.sort_unstable();
        ranks.dedup();
        ranks
    }

    /// The ranks of a category's members in the candidate window of one polarity.
    ///
    /// The window is the λ·m most extreme rows, but never reaches past zero.
    pub fn candidate_ranks(&self, members: &[usize], polarity: Polarity, lambda: usize)
        -> Vec<usize> {
        let max_range = cmp::min(lambda.saturating_mul(members.len()),
            self.nonzero_count(polarity));
        self.window_ranks(members, polarity, max_range)
    }
}

/// Best share (in percent) of a category found near the extreme, given its members' ranks.
///
/// `ranks` must be sorted ascending. Windows shrink from `λ·members` down to
/// `λ·min_count`, and the search stops at the first window with fewer than
/// `min_count` members, since every smaller window is inside it.
pub fn sweep(ranks: &[usize], members: usize, lambda: usize, min_count: usize) -> f64 {
    if ranks.len() < min_count { return 0.0; }
    let mut best = 0.0f64;
    for i in (min_count..members + 1).rev() {
        let boundary = lambda.saturating_mul(i);
        let edge_word_count = ranks.iter().take_while(|&&rank| rank < boundary).count();
        if edge_word_count < min_count { break; }
        let score = (edge_word_count as f64 / i as f64 * 100.0).min(100.0);
        if score > best { best = score; }
    }
    best
}

/// Score one category on one dimension for one polarity
pub fn polarity_score(ranks: &DimensionRanks, members: &[usize], polarity: Polarity,
    lambda: usize, min_count: usize) -> f64 {
    if ranks.nonzero_count(polarity) == 0 { return 0.0; }
    let window = ranks.candidate_ranks(members, polarity, lambda);
    sweep(&window, members.len(), lambda, min_count)
}

/// Every category scored on every dimension, for every minimum word count
#[derive(Debug, Clone, PartialEq)]
pub struct Scores {
    pub min_counts: Vec<usize>,
    /// Indexed `[dimension, category, threshold]`, each in [0, 100]
    pub cells: Array3<f64>,
}

impl Scores {
    pub fn dimensions(&self) -> usize {
        self.cells.len_of(Axis(0))
    }

    /// The best category score of each dimension, indexed `[dimension, threshold]`
    pub fn best(&self) -> Array2<f64> {
        self.cells.fold_axis(Axis(1), 0.0, |&best, &score| best.max(score))
    }

    /// Which category gave each dimension its best score, if any scored above zero
    pub fn best_categories(&self) -> Array2<Option<usize>> {
        let (dims, _, thresholds) = self.cells.dim();
        Array2::from_shape_fn((dims, thresholds), |(dim, t)| {
            let mut best: Option<(usize, f64)> = None;
            for (cat, &score) in self.cells.slice(s![dim, .., t]).iter().enumerate() {
                if score > 0.0 && best.map_or(true, |(_, b)| score > b) {
                    best = Some((cat, score));
                }
            }
            best.map(|(cat, _)| cat)
        })
    }

    /// Mean over dimensions of the best category score, one per threshold
    pub fn averages(&self) -> Array1<f64> {
        let best = self.best();
        best.mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(self.min_counts.len()))
    }

    /// Append `interpretability: <score>` to one result file per threshold
    pub fn append_results<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>> {
        let mut written = vec![];
        for (&min_count, &average) in self.min_counts.iter().zip(self.averages().iter()) {
            let path = dir.as_ref()
                .join(format!("interpretability_results_n_min_{}.txt", min_count));
            let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
            writeln!(file, "interpretability: {:.2}", average)?;
            written.push(path);
        }
        Ok(written)
    }

    /// Write a tab separated table of each dimension's best score and category per threshold
    pub fn write_dimension_report<P: AsRef<Path>>(&self, path: P, categories: &[Category])
        -> Result<()> {
        let mut file = File::create(path.as_ref())?;
        write!(file, "dimension")?;
        for min_count in &self.min_counts {
            write!(file, "\tscore_n_min_{0}\tcategory_n_min_{0}", min_count)?;
        }
        writeln!(file)?;
        let best = self.best();
        let best_categories = self.best_categories();
        for dim in 0..self.dimensions() {
            write!(file, "{}", dim)?;
            for t in 0..self.min_counts.len() {
                let name = best_categories[[dim, t]]
                    .and_then(|cat| categories.get(cat))
                    .map_or("-", |category| category.name.as_str());
                write!(file, "\t{:.2}\t{}", best[[dim, t]], name)?;
            }
            writeln!(file)?;
        }
        Ok(())
    }
}

/// Score every category against every dimension of an embedding
pub fn score(vectors: ArrayView2<f64>, categories: &[Category], settings: &Settings)
    -> Result<Scores> {
    settings.validate()?;
    let (rows, dims) = vectors.dim();
    if dims == 0 {
        return Err(Error::InvalidDimensions("the embedding has no dimensions to score".into()));
    }
    if let Some(((row, dimension), _)) = vectors.indexed_iter().find(|&(_, x)| !x.is_finite()) {
        return Err(Error::NonFinite { row, dimension });
    }
    for category in categories {
        if let Some(&row) = category.rows.iter().find(|&&row| row >= rows) {
            return Err(Error::InvalidDimensions(format!(
                "category {:?} refers to row {} but the embedding has {} rows",
                category.name, row, rows)));
        }
    }

    let polarities: &[Polarity] = if is_nonnegative(vectors) {
        info!("Embedding is nonnegative; scoring only the positive end of each dimension");
        &[Polarity::Positive]
    } else {
        &[Polarity::Positive, Polarity::Negative]
    };

    let start = Instant::now();
    info!("Evaluating interpretability of {} dimensions against {} categories ...",
        dims, categories.len());
    let planes = (0..dims).into_par_iter()
        .map(|dim| score_dimension(vectors.column(dim), dim, categories, polarities, settings))
        .collect::<Result<Vec<Array2<f64>>>>()?;

    let mut cells = Array3::zeros((dims, categories.len(), settings.min_counts.len()));
    for (dim, plane) in planes.iter().enumerate() {
        cells.index_axis_mut(Axis(0), dim).assign(plane);
    }
    info!("Done in {:.1} seconds", start.elapsed().as_secs_f64());
    Ok(Scores { min_counts: settings.min_counts.clone(), cells })
}

/// True when no coordinate is negative, as with sparse nonnegative embeddings
pub fn is_nonnegative(vectors: ArrayView2<f64>) -> bool {
    vectors.iter().all(|&x| x >= 0.0)
}

/// One dimension's `[category, threshold]` plane
fn score_dimension(column: ArrayView1<f64>, dim: usize, categories: &[Category],
    polarities: &[Polarity], settings: &Settings) -> Result<Array2<f64>> {
    if let Some(deadline) = settings.deadline {
        if Instant::now() > deadline { return Err(Error::DeadlineExceeded); }
    }
    let ranks = DimensionRanks::new(column);
    let mut plane = Array2::zeros((categories.len(), settings.min_counts.len()));
    for (cat_no, category) in categories.iter().enumerate() {
        let windows: Vec<Vec<usize>> = polarities.iter()
            .filter(|&&polarity| ranks.nonzero_count(polarity) > 0)
            .map(|&polarity| ranks.candidate_ranks(&category.rows, polarity, settings.lambda))
            .collect();
        for (t, &min_count) in settings.min_counts.iter().enumerate() {
            plane[[cat_no, t]] = windows.iter()
                .map(|window| sweep(window, category.len(), settings.lambda, min_count))
                .fold(0.0, f64::max);
        }
    }
    debug!("Dimension {}: best score {:.2} at n_min={}", dim,
        plane.column(0).fold(0.0, |a: f64, &b| a.max(b)), settings.min_counts[0]);
    Ok(plane)
}
