use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currency code, normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl Into<String>) -> Self {
        Currency(code.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Currency {
    fn from(s: &str) -> Self {
        Currency::new(s)
    }
}

impl From<String> for Currency {
    fn from(s: String) -> Self {
        Currency::new(s)
    }
}

/// Asset class a pair trades under. Closed set: the same pair can carry
/// an independent book per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    #[default]
    Spot,
    Margin,
    Futures,
    Options,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Spot => "spot",
            AssetClass::Margin => "margin",
            AssetClass::Futures => "futures",
            AssetClass::Options => "options",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = UnknownAssetClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spot" => Ok(AssetClass::Spot),
            "margin" => Ok(AssetClass::Margin),
            "futures" => Ok(AssetClass::Futures),
            "options" => Ok(AssetClass::Options),
            other => Err(UnknownAssetClass(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown asset class: {0}")]
pub struct UnknownAssetClass(String);

/// Identifies exactly one independently-synchronized order book:
/// (base currency, quote currency, asset class).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookKey {
    pub base: Currency,
    pub quote: Currency,
    pub asset: AssetClass,
}

impl BookKey {
    pub fn new(base: impl Into<Currency>, quote: impl Into<Currency>, asset: AssetClass) -> Self {
        BookKey {
            base: base.into(),
            quote: quote.into(),
            asset,
        }
    }

    pub fn spot(base: impl Into<Currency>, quote: impl Into<Currency>) -> Self {
        BookKey::new(base, quote, AssetClass::Spot)
    }

    /// Concatenated ticker symbol as used on REST and stream endpoints,
    /// e.g. `BTCUSDT`.
    pub fn symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl fmt::Display for BookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}.{}", self.base, self.quote, self.asset)
    }
}
