pub mod chart;

pub use chart::{parse, Chart, ChartParser, Derivations, ParseError};
