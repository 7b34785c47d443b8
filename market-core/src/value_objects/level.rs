use serde::{Deserialize, Serialize};

use super::{Price, Quantity};

/// One resting level of an order book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Price,
    pub quantity: Quantity,
}

impl PriceLevel {
    pub fn new(price: Price, quantity: Quantity) -> Self {
        PriceLevel { price, quantity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_level_construction() {
        let level = PriceLevel::new(Price::from(dec!(50000)), Quantity::from(dec!(2)));
        assert_eq!(level.price.to_string(), "50000");
        assert_eq!(level.quantity.to_string(), "2");
    }
}
