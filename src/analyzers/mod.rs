pub mod aqi_classifier;

pub use aqi_classifier::{AqiClassifier, AqiResult, Breakpoint, BreakpointTable};
