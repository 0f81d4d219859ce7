//! Score how interpretable each dimension of an embedding is, against semantic categories
//!
//! For every minimum category word count, the average best category score over all dimensions
//! is appended to `interpretability_results_n_min_<count>.txt` in the output directory.
//!

// argument parsing
#[macro_use] extern crate clap;
// logging
#[macro_use] extern crate log;
extern crate env_logger;
// lastly, this library
extern crate embeval;

use clap::Arg;
use std::path::Path;

use embeval::errors::*;
use embeval::categories::{self, DEFAULT_CATEGORY_DIR};
use embeval::interpretability::{self, Settings, DEFAULT_LAMBDA, DEFAULT_MIN_COUNTS,
    DEFAULT_VOCAB_LIMIT};
use embeval::vectors::{Duplicates, Embedding};

pub fn main() {
    // Main can't return a Result, and the ? operator needs the enclosing function to return Result
    inner_main().expect("Could not recover. Exiting.");
}
pub fn inner_main() -> Result<()> {
    env_logger::init();
    let vocab_limit = DEFAULT_VOCAB_LIMIT.to_string();
    let lambda = DEFAULT_LAMBDA.to_string();
    let args = app_from_crate!()
        .arg_from_usage("<vectors> 'word vectors, as text (word then values) or a .npy matrix'")
        .arg_from_usage("--wordlist=[FILE] 'one word per line naming the rows of a .npy matrix'")
        .arg(Arg::from_usage("--categories=[DIR] 'directory of category files, name-count.txt'")
            .default_value(DEFAULT_CATEGORY_DIR))
        .arg(Arg::from_usage("--vocab-limit=[N] 'only score the first N words'")
            .default_value(&vocab_limit))
        .arg_from_usage("--full-vocab 'score every word, ignoring --vocab-limit'")
        .arg(Arg::from_usage("--lambda=[N] 'look for a category of m words among the N*m most extreme words'")
            .default_value(&lambda))
        .arg_from_usage("--min-count=[N]... 'minimum category words in a window [default: 5 10 15 20]'")
        .arg(Arg::from_usage("--output-dir=[DIR] 'where the result files go'")
            .default_value("."))
        .arg_from_usage("--report=[FILE] 'also write the best category of every dimension here'")
        .get_matches();

    let cap = if args.is_present("full-vocab") { None }
        else { Some(value_t!(args, "vocab-limit", usize).unwrap_or_else(|e| e.exit())) };
    let min_counts = if args.is_present("min-count") {
        values_t!(args, "min-count", usize).unwrap_or_else(|e| e.exit())
    } else {
        DEFAULT_MIN_COUNTS.to_vec()
    };
    let settings = Settings {
        lambda: value_t!(args, "lambda", usize).unwrap_or_else(|e| e.exit()),
        min_counts,
        deadline: None,
    };
    settings.validate()?;

    info!("Loading vectors ...");
    let embedding = Embedding::open(
        args.value_of("vectors").unwrap_or_default(),
        args.value_of("wordlist").map(Path::new),
        cap)?;
    let vocab = embedding.vocabulary(Duplicates::KeepLast);
    let categories = categories::read_categories(
        args.value_of("categories").unwrap_or(DEFAULT_CATEGORY_DIR), &vocab)?;

    let scores = interpretability::score(embedding.vectors.view(), &categories, &settings)?;
    let output_dir = args.value_of("output-dir").unwrap_or(".");
    scores.append_results(output_dir)?;
    if let Some(report) = args.value_of("report") {
        scores.write_dimension_report(report, &categories)?;
    }

    for (min_count, average) in settings.min_counts.iter().zip(scores.averages().iter()) {
        println!("n_min {}: interpretability: {:.2}", min_count, average);
    }
    Ok(())
}
