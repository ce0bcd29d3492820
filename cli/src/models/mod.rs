pub mod company;
pub mod index;
pub mod stock_data;

pub use company::*;
pub use index::*;
pub use stock_data::*;
