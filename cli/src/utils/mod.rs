pub mod date;
pub mod indicators;
pub mod logger;
pub mod stats;

pub use date::*;
pub use indicators::*;
pub use logger::*;
pub use stats::*;
