//! Word intrusion survey
//!
//! `generate` draws questions from an embedding and appends them to the survey files, so
//! several embeddings (each under its own label) can be mixed into one survey.
//! `survey` asks a participant every question and records their picks per label.
//!

// argument parsing
#[macro_use] extern crate clap;
// logging
#[macro_use] extern crate log;
extern crate env_logger;
extern crate rand;
// lastly, this library
extern crate embeval;

use clap::{Arg, ArgMatches, SubCommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::{self, BufRead, Write};
use std::path::Path;

use embeval::errors::*;
use embeval::interpretability::DEFAULT_VOCAB_LIMIT;
use embeval::intrusion::{self, Survey, DEFAULT_ANSWERS_FILE, DEFAULT_QUESTIONS_FILE};
use embeval::vectors::Embedding;

pub fn main() {
    // Main can't return a Result, and the ? operator needs the enclosing function to return Result
    inner_main().expect("Could not recover. Exiting.");
}
pub fn inner_main() -> Result<()> {
    env_logger::init();
    let vocab_limit = DEFAULT_VOCAB_LIMIT.to_string();
    let questions = || Arg::from_usage("--questions=[FILE] 'survey questions, one per line'")
        .default_value(DEFAULT_QUESTIONS_FILE);
    let answers = || Arg::from_usage("--answers=[FILE] 'intruder and label for each question'")
        .default_value(DEFAULT_ANSWERS_FILE);
    let args = app_from_crate!()
        .subcommand(SubCommand::with_name("generate")
            .about("Append intrusion questions drawn from an embedding")
            .arg_from_usage("<vectors> 'word vectors, as text (word then values) or a .npy matrix'")
            .arg_from_usage("<label> 'name recorded with every answer, e.g. glove'")
            .arg_from_usage("--wordlist=[FILE] 'one word per line naming the rows of a .npy matrix'")
            .arg(Arg::from_usage("--dimensions=[N] 'how many dimensions to ask about'")
                .default_value("20"))
            .arg(Arg::from_usage("--seed=[N] 'random seed'").default_value("0"))
            .arg(Arg::from_usage("--vocab-limit=[N] 'only draw from the first N words'")
                .default_value(&vocab_limit))
            .arg(questions())
            .arg(answers()))
        .subcommand(SubCommand::with_name("survey")
            .about("Ask the intrusion questions interactively")
            .arg_from_usage("--name=[NAME] 'participant name, asked for if missing'")
            .arg(Arg::from_usage("--output-dir=[DIR] 'where the result files go'")
                .default_value("."))
            .arg(questions())
            .arg(answers()))
        .get_matches();

    match args.subcommand() {
        ("generate", Some(sub)) => generate(sub),
        ("survey", Some(sub)) => survey(sub),
        _ => {
            eprintln!("{}", args.usage());
            Ok(())
        },
    }
}

fn generate(args: &ArgMatches) -> Result<()> {
    let cap = value_t!(args, "vocab-limit", usize).unwrap_or_else(|e| e.exit());
    let count = value_t!(args, "dimensions", usize).unwrap_or_else(|e| e.exit());
    let seed = value_t!(args, "seed", u64).unwrap_or_else(|e| e.exit());
    let label = args.value_of("label").unwrap_or_default();

    let embedding = Embedding::open(
        args.value_of("vectors").unwrap_or_default(),
        args.value_of("wordlist").map(Path::new),
        Some(cap))?;
    let mut rng = StdRng::seed_from_u64(seed);
    let generated = intrusion::generate(
        embedding.vectors.view(), &embedding.words, label, count, &mut rng)?;
    intrusion::append_survey(
        args.value_of("questions").unwrap_or(DEFAULT_QUESTIONS_FILE),
        args.value_of("answers").unwrap_or(DEFAULT_ANSWERS_FILE),
        &generated)?;
    info!("Appended {} {} questions", generated.len(), label);
    Ok(())
}

fn survey(args: &ArgMatches) -> Result<()> {
    let survey = Survey::read(
        args.value_of("questions").unwrap_or(DEFAULT_QUESTIONS_FILE),
        args.value_of("answers").unwrap_or(DEFAULT_ANSWERS_FILE))?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut output = stdout.lock();

    let name = match args.value_of("name") {
        Some(name) => name.to_string(),
        None => {
            write!(output, "Enter name: ")?;
            output.flush()?;
            let mut name = String::new();
            input.read_line(&mut name)?;
            name.trim().to_string()
        },
    };
    if name.is_empty() || name.contains(|c: char| c == '/' || c == '\\') {
        return Err(Error::InvalidParameter(format!("unusable participant name {:?}", name)));
    }

    let tally = survey.run(&mut input, &mut output)?;
    tally.write_results(args.value_of("output-dir").unwrap_or("."), &name)?;
    writeln!(output, "\nTest is over.")?;
    write!(output, "{}", tally)?;
    writeln!(output, "Good Job")?;
    Ok(())
}
