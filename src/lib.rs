//! Evaluation of word embeddings
//!
//! Helpers behind the included binaries: loading vectors and semantic categories, scoring how
//! interpretable each embedding dimension is, analogy accuracy, sentiment classification, and word
//! intrusion surveys.
//! The binaries are thin wrappers, so most of the logic (and the tests) live here.


#[macro_use] extern crate log;
#[macro_use] extern crate ndarray;
extern crate byteorder;
extern crate farmhash;
extern crate hash_hasher;
extern crate rand;
extern crate rayon;
extern crate regex;
extern crate smartcore;
pub mod errors;
pub mod farm;
pub mod numpy;
pub mod vectors;
pub mod categories;
pub mod interpretability;
pub mod analogy;
pub mod sentiment;
pub mod intrusion;
