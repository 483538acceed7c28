//! Algorithms for study design

pub mod matching;
