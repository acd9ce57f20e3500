pub mod price;
pub mod product;

pub use price::*;
pub use product::*;
