pub mod classifier;
pub mod config;
pub mod signals;

pub use classifier::{Classifier, Verdict};
pub use config::{ClassifierConfig, Signal};
