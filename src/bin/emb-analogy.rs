//! Run the input embedding against the Mikolov 2013 analogy dataset
//!
//! The report is printed and appended to the output file.
//!

// argument parsing
#[macro_use] extern crate clap;
// logging
#[macro_use] extern crate log;
extern crate env_logger;
// lastly, this library
extern crate embeval;

use clap::Arg;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use embeval::errors::*;
use embeval::analogy::{self, Analogies, DEFAULT_QUESTION_DIR};
use embeval::vectors::Embedding;

pub fn main() {
    // Main can't return a Result, and the ? operator needs the enclosing function to return Result
    inner_main().expect("Could not recover. Exiting.");
}
pub fn inner_main() -> Result<()> {
    env_logger::init();
    let args = app_from_crate!()
        .arg_from_usage("<vectors> 'word vectors, as text (word then values) or a .npy matrix'")
        .arg_from_usage("<output> 'file to append the accuracy report to'")
        .arg_from_usage("--wordlist=[FILE] 'one word per line naming the rows of a .npy matrix'")
        .arg(Arg::from_usage("--questions=[DIR] 'directory of analogy question files'")
            .default_value(DEFAULT_QUESTION_DIR))
        .get_matches();

    info!("Reading vectors file ...");
    let embedding = Embedding::open(
        args.value_of("vectors").unwrap_or_default(),
        args.value_of("wordlist").map(Path::new),
        None)?;
    let files = analogy::read_question_files(
        args.value_of("questions").unwrap_or(DEFAULT_QUESTION_DIR))?;

    info!("Evaluating ...");
    let report = Analogies::new(&embedding).evaluate(&files);
    print!("{}", report);

    let mut output = OpenOptions::new().create(true).append(true)
        .open(args.value_of("output").unwrap_or_default())?;
    writeln!(output, "{}", report)?;
    Ok(())
}
