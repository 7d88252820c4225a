pub mod forecast;
pub mod series;

pub use forecast::*;
pub use series::*;
