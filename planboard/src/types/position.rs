//! Position ranks using fractional indexing.

use crate::error::{PlanError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base-62 digits in ascending ASCII order
const DIGITS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const BASE: u32 = 62;

/// Widest rank that still fits a `u128` when scaled
const MAX_SCALED_WIDTH: usize = 21;

/// Rank among siblings. Uses fractional indexing.
///
/// A rank is read as the base-62 fraction `0.d1d2d3...`. Ranks never end in
/// `0`, which keeps lexicographic order identical to numeric order, so there is
/// always room to insert between two distinct ranks without touching either.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ordinal(String);

impl Ordinal {
    /// Validate an externally supplied rank
    pub fn parse(rank: impl Into<String>) -> Result<Self> {
        let rank = rank.into();
        if rank.is_empty() {
            return Err(PlanError::invalid_rank(rank, "empty"));
        }
        if let Some(c) = rank.bytes().find(|b| digit_value(*b).is_none()) {
            let reason = format!("'{}' is not a base-62 digit", c as char);
            return Err(PlanError::invalid_rank(rank, reason));
        }
        if rank.ends_with('0') {
            return Err(PlanError::invalid_rank(rank, "trailing zero"));
        }
        Ok(Self(rank))
    }

    /// Rank for the first item of an empty sibling set
    pub fn first() -> Self {
        Self::from_digits(&midpoint(&[], None))
    }

    /// Rank after `last`
    pub fn after(last: &Ordinal) -> Self {
        Self::from_digits(&midpoint(&last.digits(), None))
    }

    /// Rank before `first`
    pub fn before(first: &Ordinal) -> Self {
        Self::from_digits(&midpoint(&[], Some(&first.digits())))
    }

    /// Rank strictly between `before` and `after`.
    ///
    /// Fails with `InvalidOrdering` unless `before < after`.
    pub fn between(before: &Ordinal, after: &Ordinal) -> Result<Self> {
        if before >= after {
            return Err(PlanError::InvalidOrdering {
                before: before.0.clone(),
                after: after.0.clone(),
            });
        }
        Ok(Self::from_digits(&midpoint(
            &before.digits(),
            Some(&after.digits()),
        )))
    }

    /// Evenly spaced ranks for `count` siblings
    pub fn spread(count: usize) -> Vec<Self> {
        if count == 0 {
            return Vec::new();
        }
        let width = spread_width(count);
        let scale = (BASE as u128).pow(width as u32);
        let step = scale / (count as u128 + 1);
        (1..=count as u128)
            .map(|i| Self::from_scaled(step * i, width))
            .collect()
    }

    /// Digits a rank from `spread(count)` can use
    pub fn spread_len(count: usize) -> usize {
        spread_width(count)
    }

    /// The rank as an integer numerator over `62^width`.
    ///
    /// Returns `None` if the rank is longer than `width` or `width` overflows.
    pub fn scaled(&self, width: usize) -> Option<u128> {
        if self.0.len() > width || width > MAX_SCALED_WIDTH {
            return None;
        }
        let mut value = 0u128;
        for i in 0..width {
            let digit = self.0.as_bytes().get(i).copied().map(digit_value).unwrap_or(Some(0))?;
            value = value * BASE as u128 + digit as u128;
        }
        Some(value)
    }

    /// Number of digits
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Ranks are never empty; present for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn digits(&self) -> Vec<u8> {
        self.0.bytes().filter_map(digit_value).collect()
    }

    fn from_digits(digits: &[u8]) -> Self {
        Self(digits.iter().map(|d| DIGITS[*d as usize] as char).collect())
    }

    fn from_scaled(mut value: u128, width: usize) -> Self {
        let mut digits = vec![0u8; width];
        for slot in digits.iter_mut().rev() {
            *slot = (value % BASE as u128) as u8;
            value /= BASE as u128;
        }
        while digits.last() == Some(&0) {
            digits.pop();
        }
        Self::from_digits(&digits)
    }
}

/// Smallest width leaving at least one full digit of room between spread ranks
fn spread_width(count: usize) -> usize {
    let needed = (count as u128 + 1) * BASE as u128;
    let mut width = 1;
    let mut scale = BASE as u128;
    while scale < needed && width < MAX_SCALED_WIDTH {
        width += 1;
        scale *= BASE as u128;
    }
    width
}

fn digit_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'Z' => Some(b - b'A' + 10),
        b'a'..=b'z' => Some(b - b'a' + 36),
        _ => None,
    }
}

/// Digits of a fraction strictly between `a` and `b` (`None` = 1).
///
/// Requires `a < b` and neither ending in a zero digit.
fn midpoint(a: &[u8], b: Option<&[u8]>) -> Vec<u8> {
    if let Some(b) = b {
        let mut n = 0;
        while n < b.len() && a.get(n).copied().unwrap_or(0) == b[n] {
            n += 1;
        }
        if n > 0 {
            let mut out = b[..n].to_vec();
            let rest = a.get(n..).unwrap_or(&[]);
            out.extend(midpoint(rest, Some(&b[n..])));
            return out;
        }
    }

    let digit_a = a.first().copied().unwrap_or(0) as u32;
    let digit_b = b.and_then(|b| b.first()).map(|d| *d as u32).unwrap_or(BASE);

    if digit_b.saturating_sub(digit_a) > 1 {
        return vec![((digit_a + digit_b + 1) / 2) as u8];
    }

    match b {
        // consecutive first digits, and b has more to give
        Some(b) if b.len() > 1 => vec![b[0]],
        _ => {
            let mut out = vec![digit_a as u8];
            out.extend(midpoint(a.get(1..).unwrap_or(&[]), None));
            out
        }
    }
}

impl TryFrom<String> for Ordinal {
    type Error = PlanError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Ordinal> for String {
    fn from(ordinal: Ordinal) -> Self {
        ordinal.0
    }
}

impl fmt::Display for Ordinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Default for Ordinal {
    fn default() -> Self {
        Self::first()
    }
}
