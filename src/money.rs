// src/money.rs

//! Integer money and percentage types.
//!
//! Amounts are carried in cents and percentages in basis points (hundredths
//! of a percent, `10000` = 100,00%). Floating point never touches either.

use crate::errors::{AppError, AppResult};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

// ─── Cents ────────────────────────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    ToSchema,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Cents(pub i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    pub fn checked_add(self, other: Cents) -> Option<Cents> {
        self.0.checked_add(other.0).map(Cents)
    }

    /// Exact sum; `None` on overflow.
    pub fn checked_sum<I>(amounts: I) -> Option<Cents>
    where
        I: IntoIterator<Item = Cents>,
    {
        amounts
            .into_iter()
            .try_fold(Cents::ZERO, |acc, amount| acc.checked_add(amount))
    }

    /// Reais with two decimal places, e.g. `Cents(36490)` → `364.90`
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

/// Brazilian notation: `R$ 1.234,56`
impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let digits = (abs / 100).to_string();

        let mut reais = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                reais.push('.');
            }
            reais.push(ch);
        }

        write!(f, "{sign}R$ {reais},{:02}", abs % 100)
    }
}

// ─── Basis points ─────────────────────────────────────────────────────────────

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    ToSchema,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct BasisPoints(pub i32);

impl BasisPoints {
    /// 100,00%
    pub const FULL: BasisPoints = BasisPoints(10_000);

    /// The share left for the other party, e.g. 8500 → 1500
    pub fn complement(self) -> BasisPoints {
        BasisPoints(Self::FULL.0 - self.0)
    }

    /// Parses a user-facing percentage such as `"85,00"`, `"85.5"` or `"7,25%"`.
    ///
    /// The value is multiplied by 100 and rounded to the nearest integer,
    /// midpoints away from zero.
    pub fn parse_percentual(raw: &str) -> AppResult<BasisPoints> {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();

        // "1.000,50" style input: dots are grouping, comma is the decimal mark
        let normalized = if trimmed.contains(',') {
            trimmed.replace('.', "").replace(',', ".")
        } else {
            trimmed.to_string()
        };

        let value = Decimal::from_str(&normalized).map_err(|_| {
            AppError::Validation(format!("'{}' is not a valid percentage", raw))
        })?;

        if value < Decimal::ZERO || value > dec!(100) {
            return Err(AppError::Validation(format!(
                "Percentage {} must be between 0 and 100",
                raw.trim()
            )));
        }

        (value * dec!(100))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i32()
            .map(BasisPoints)
            .ok_or_else(|| AppError::Validation(format!("'{}' is out of range", raw)))
    }
}

/// `8500` → `85,00%`
impl fmt::Display for BasisPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{},{:02}%", abs / 100, abs % 100)
    }
}

/// Divides `total` between tenant and platform.
///
/// The tenant share is floored; the platform receives the remainder so the
/// two parts always add up to `total`.
pub fn split_amount(total: Cents, percentual_tenant: BasisPoints) -> (Cents, Cents) {
    let tenant = (i128::from(total.0) * i128::from(percentual_tenant.0))
        .div_euclid(i128::from(BasisPoints::FULL.0));
    // |tenant| <= |total| for basis points within [0, 10000]
    let tenant = Cents(tenant as i64);
    (tenant, Cents(total.0 - tenant.0))
}

/// A percentage as sent by clients: raw basis points or a formatted string.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum PercentualInput {
    BasisPoints(i32),
    Text(String),
}

impl PercentualInput {
    pub fn to_basis_points(&self) -> AppResult<BasisPoints> {
        match self {
            PercentualInput::BasisPoints(value) => Ok(BasisPoints(*value)),
            PercentualInput::Text(raw) => BasisPoints::parse_percentual(raw),
        }
    }
}
