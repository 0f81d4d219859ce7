//! Classify the sentiment of Stanford Sentiment Treebank sentences from averaged word vectors
//!
//! A linear SVM is trained on the train and dev sentences, with C picked by cross validation,
//! and the accuracy on the test sentences is written to the output file.
//!

// argument parsing
#[macro_use] extern crate clap;
// logging
#[macro_use] extern crate log;
extern crate env_logger;
// lastly, this library
extern crate embeval;

use clap::Arg;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use embeval::errors::*;
use embeval::sentiment::{self, LinearSvm, SentenceEncoder, Treebank, DEFAULT_C_GRID,
    DEFAULT_FOLDS, DEFAULT_TREEBANK_DIR};
use embeval::vectors::Embedding;

pub fn main() {
    // Main can't return a Result, and the ? operator needs the enclosing function to return Result
    inner_main().expect("Could not recover. Exiting.");
}
pub fn inner_main() -> Result<()> {
    env_logger::init();
    let folds = DEFAULT_FOLDS.to_string();
    let args = app_from_crate!()
        .arg_from_usage("<vectors> 'word vectors, as text (word then values) or a .npy matrix'")
        .arg_from_usage("<output> 'file to write the accuracy to'")
        .arg_from_usage("--wordlist=[FILE] 'one word per line naming the rows of a .npy matrix'")
        .arg(Arg::from_usage("--data=[DIR] 'Stanford Sentiment Treebank directory'")
            .default_value(DEFAULT_TREEBANK_DIR))
        .arg(Arg::from_usage("--folds=[N] 'cross validation folds used to pick C'")
            .default_value(&folds))
        .arg(Arg::from_usage("--seed=[N] 'random seed for the SVM solver'").default_value("0"))
        .get_matches();

    let folds = value_t!(args, "folds", usize).unwrap_or_else(|e| e.exit());
    let seed = value_t!(args, "seed", u64).unwrap_or_else(|e| e.exit());

    info!("Reading vectors file ...");
    let embedding = Embedding::open(
        args.value_of("vectors").unwrap_or_default(),
        args.value_of("wordlist").map(Path::new),
        None)?;
    info!("Reading train and test data ...");
    let treebank = Treebank::read(args.value_of("data").unwrap_or(DEFAULT_TREEBANK_DIR))?;
    let encoder = SentenceEncoder::new(&embedding)?;
    let (train, test) = sentiment::samples(&treebank, &encoder)?;

    info!("Training linear SVM with cross validation ...");
    let report = sentiment::evaluate(&LinearSvm { seed }, &train, &test, &DEFAULT_C_GRID, folds)?;
    println!("{}", report);

    let mut output = File::create(args.value_of("output").unwrap_or_default())?;
    writeln!(output, "{}", report)?;
    Ok(())
}
