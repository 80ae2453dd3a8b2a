pub mod indicators;
pub mod levels;
pub mod resolver;
pub mod scan;
pub mod scoring;
pub mod synthesizer;
pub mod zones;

pub use resolver::ParameterResolver;
pub use scan::ScanRanker;
pub use synthesizer::{SynthesisPolicy, Synthesizer};
