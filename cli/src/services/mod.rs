pub mod dataset;
pub mod market_data;

pub use dataset::*;
pub use market_data::*;
