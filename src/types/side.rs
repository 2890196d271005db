// nexus_core/src/types/side.rs
//
// The ONE TRUE Side Enum.
//
// Three states, not two: on the wire, 0 means "no side at all" (an
// INVALID response such as CANCEL_REJECTED still has to fill in a Side
// field). Keeping an explicit Invalid variant means every wire struct
// can carry Side as a plain u8 position without an Option<Side>.

use std::fmt;

/// Order side. Represented as a single byte (`u8`) matching the wire enum
/// in §6: `0 = INVALID, 1 = BUY, 2 = SELL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    Invalid = 0,
    Buy = 1,
    Sell = 2,
}

impl Default for Side {
    fn default() -> Self {
        Side::Invalid
    }
}

impl Side {
    /// Parse from a string (case-insensitive).
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err("Side must be 'buy' or 'sell'".to_string()),
        }
    }

    /// The opposite side. Calling this on `Invalid` is a caller bug.
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
            Side::Invalid => panic!("Side::opposite called on Side::Invalid"),
        }
    }

    /// Sign multiplier: Buy = +1, Sell = -1.
    pub fn sign(&self) -> i32 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
            Side::Invalid => 0,
        }
    }

    /// Raw u8 value for wire serialization.
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Reconstruct from a raw wire byte. Unknown bytes are a protocol
    /// error, not an invariant violation — callers at ingress decide
    /// whether to log-and-discard or treat it as fatal.
    pub fn from_u8(value: u8) -> Result<Self, String> {
        match value {
            0 => Ok(Side::Invalid),
            1 => Ok(Side::Buy),
            2 => Ok(Side::Sell),
            _ => Err(format!("invalid Side byte: {value}")),
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Side::Invalid)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
            Side::Invalid => write!(f, "INVALID"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_is_one_byte() {
        assert_eq!(std::mem::size_of::<Side>(), 1);
    }

    #[test]
    fn from_str_case_insensitive() {
        assert_eq!(Side::from_str("buy").unwrap(), Side::Buy);
        assert_eq!(Side::from_str("BUY").unwrap(), Side::Buy);
        assert_eq!(Side::from_str("sell").unwrap(), Side::Sell);
    }

    #[test]
    fn roundtrip_u8() {
        assert_eq!(Side::from_u8(Side::Buy.as_u8()).unwrap(), Side::Buy);
        assert_eq!(Side::from_u8(Side::Sell.as_u8()).unwrap(), Side::Sell);
        assert_eq!(Side::from_u8(0).unwrap(), Side::Invalid);
        assert!(Side::from_u8(3).is_err());
    }

    #[test]
    fn opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn invalid_is_not_valid() {
        assert!(!Side::Invalid.is_valid());
        assert!(Side::Buy.is_valid());
    }
}
