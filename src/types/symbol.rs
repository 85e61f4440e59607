//! Currency symbols shared by both venues

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Symbol {
    Dai,
    Zar,
    Btc,
    Eth,
    Usdt,
    Usdc,
    /// Iranian rial as reported by Nobitex wallets.
    Rls,
    /// Iranian rial as used in Nobitex market symbols.
    Irt,
    /// Toman, the keeper's reference currency (10 rial).
    Tmn,
}

impl Symbol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Symbol::Dai => "DAI",
            Symbol::Zar => "ZAR",
            Symbol::Btc => "BTC",
            Symbol::Eth => "ETH",
            Symbol::Usdt => "USDT",
            Symbol::Usdc => "USDC",
            Symbol::Rls => "RLS",
            Symbol::Irt => "IRT",
            Symbol::Tmn => "TMN",
        }
    }

    pub fn lowercase(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSymbol(pub String);

impl fmt::Display for UnknownSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown symbol {}", self.0)
    }
}

impl std::error::Error for UnknownSymbol {}

impl FromStr for Symbol {
    type Err = UnknownSymbol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DAI" => Ok(Symbol::Dai),
            "ZAR" => Ok(Symbol::Zar),
            "BTC" => Ok(Symbol::Btc),
            "ETH" => Ok(Symbol::Eth),
            "USDT" => Ok(Symbol::Usdt),
            "USDC" => Ok(Symbol::Usdc),
            "RLS" => Ok(Symbol::Rls),
            "IRT" => Ok(Symbol::Irt),
            "TMN" => Ok(Symbol::Tmn),
            _ => Err(UnknownSymbol(s.to_string())),
        }
    }
}
