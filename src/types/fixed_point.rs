// nexus_core/src/types/fixed_point.rs
//
// Fixed-Point Arithmetic for Financial Math.
//
// WHY THIS IS FASTER:
// IEEE 754 floats cannot represent 0.1 exactly (it becomes 0.1000000000000000055...).
// Over millions of trades, this drift causes real financial losses.
// Fixed-point uses a 64-bit integer scaled by 10^8, giving us 8 decimal places
// of precision with ZERO rounding error on addition and subtraction.
//
// WHY NO HEAP ALLOCATION:
// `Price` and `Qty` are both `#[derive(Copy, Clone)]`. They live entirely
// on the stack or inside pre-allocated pool arrays. The matching engine
// will never call `malloc` for a Price or a Qty.

use std::fmt;

use serde::Deserialize;

/// Scale factor: 10^8. All prices are stored as `raw_value = human_price * SCALE`.
///
/// Example: $100.05 → `10_005_000_000i64`
pub const SCALE: i64 = 100_000_000;

/// Fixed-point price representation: a 64-bit signed integer scaled by
/// `SCALE`. Supports exact addition, subtraction, and notional computation.
///
/// # Memory Layout
/// Exactly 8 bytes. Fits in a single CPU register. No heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(from = "i64")]
pub struct Price {
    raw: i64,
}

impl From<i64> for Price {
    /// Lets config TOML spell a `Price` field as a plain raw integer
    /// (already scaled by `SCALE`), matching the wire representation.
    fn from(raw: i64) -> Self {
        Price { raw }
    }
}

/// The price carried by wire sentinels (`INVALID` responses, request
/// slots that were never filled in). Zero is never a valid traded price.
pub const PRICE_INVALID: Price = Price { raw: 0 };

impl Price {
    /// Create a Price from a raw integer value (already scaled by 10^8).
    pub const fn new(raw: i64) -> Self {
        Self { raw }
    }

    /// Create a Price from a human-readable decimal string (e.g., "100.05").
    /// This is the only place string-to-fixed conversion happens; after
    /// this, all math is pure integer.
    pub fn from_str_decimal(s: &str) -> Result<Self, String> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split('.').collect();
        if parts.is_empty() || parts.len() > 2 {
            return Err("invalid price string format".to_string());
        }

        let integer_part: i64 = parts[0]
            .parse()
            .map_err(|_| "invalid integer part".to_string())?;

        let fractional_raw: i64 = if parts.len() == 2 && !parts[1].is_empty() {
            let frac_str = parts[1];
            let frac_digits = frac_str.len();
            if frac_digits > 8 {
                return Err("max 8 decimal places supported".to_string());
            }
            let frac_val: i64 = frac_str
                .parse()
                .map_err(|_| "invalid fractional part".to_string())?;
            let multiplier = 10i64.pow((8 - frac_digits) as u32);
            frac_val * multiplier
        } else {
            0
        };

        let sign = if integer_part < 0 { -1i64 } else { 1i64 };
        let raw = integer_part * SCALE + sign * fractional_raw;
        Ok(Self { raw })
    }

    /// Create a Price from a floating point value. Prefer
    /// `from_str_decimal` wherever the source is text (config files,
    /// CLI args) — this exists only for interop with external feeds that
    /// hand back doubles.
    pub fn from_float(value: f64) -> Self {
        Self {
            raw: (value * SCALE as f64).round() as i64,
        }
    }

    /// The raw i64 value (scaled by 10^8).
    pub fn raw(&self) -> i64 {
        self.raw
    }

    pub fn to_float(&self) -> f64 {
        self.raw as f64 / SCALE as f64
    }

    /// Compute notional value: price x quantity. Exact integer math.
    pub fn notional(&self, qty: u32) -> i64 {
        self.raw * (qty as i64)
    }

    pub fn is_valid(&self) -> bool {
        self.raw != 0
    }
}

impl std::ops::Add for Price {
    type Output = Price;
    fn add(self, rhs: Price) -> Price {
        Price { raw: self.raw + rhs.raw }
    }
}

impl std::ops::Sub for Price {
    type Output = Price;
    fn sub(self, rhs: Price) -> Price {
        Price { raw: self.raw - rhs.raw }
    }
}

impl Default for Price {
    fn default() -> Self {
        PRICE_INVALID
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let integer_part = self.raw / SCALE;
        let fractional_part = (self.raw % SCALE).unsigned_abs();
        write!(f, "{integer_part}.{fractional_part:08}")
    }
}

/// Fixed-point order/trade quantity: a 32-bit unsigned integer, exactly
/// 4 bytes, matching the `uint32 qty` wire field throughout §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(from = "u32")]
pub struct Qty {
    raw: u32,
}

impl From<u32> for Qty {
    fn from(raw: u32) -> Self {
        Qty { raw }
    }
}

pub const QTY_INVALID: Qty = Qty { raw: 0 };

impl Qty {
    pub const fn new(raw: u32) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> u32 {
        self.raw
    }

    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }

    pub fn checked_sub(self, rhs: Qty) -> Option<Qty> {
        self.raw.checked_sub(rhs.raw).map(Qty::new)
    }
}

impl std::ops::Add for Qty {
    type Output = Qty;
    fn add(self, rhs: Qty) -> Qty {
        Qty::new(self.raw + rhs.raw)
    }
}

impl std::ops::Sub for Qty {
    type Output = Qty;
    fn sub(self, rhs: Qty) -> Qty {
        Qty::new(self.raw - rhs.raw)
    }
}

impl std::cmp::PartialEq<u32> for Qty {
    fn eq(&self, other: &u32) -> bool {
        self.raw == *other
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
