mod level;
mod price;
mod quantity;

pub use level::PriceLevel;
pub use price::Price;
pub use quantity::Quantity;
