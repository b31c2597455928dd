//! Monetary and percentage quantities with their display codecs.

use std::{
    fmt::{Debug, Display, Formatter},
    str::FromStr,
};

use derive_more::From;
use serde::Deserialize;

use crate::prelude::*;

/// Chilean peso amount.
///
/// The display format is the locale-aware one the ledger stores:
/// `$` prefix, `.` as the thousands separator, `,` as the decimal separator,
/// always two decimals. [`FromStr`] reverses it exactly, so any amount with
/// two fractional digits round-trips through the ledger.
#[derive(Copy, Clone, PartialEq, PartialOrd, From, Deserialize)]
#[serde(transparent)]
pub struct Pesos(pub f64);

impl Display for Pesos {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let total_cents = (self.0.abs() * 100.0).round() as u64;
        let sign = if self.0.is_sign_negative() && total_cents != 0 { "-" } else { "" };
        write!(f, "${sign}{},{:02}", group_thousands(total_cents / 100), total_cents % 100)
    }
}

impl Debug for Pesos {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for Pesos {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let stripped = value
            .trim()
            .strip_prefix('$')
            .with_context(|| format!("`{value}` is missing the `$` prefix"))?;
        let normalized = stripped.replace('.', "").replace(',', ".");
        let amount = f64::from_str(&normalized)
            .with_context(|| format!("failed to parse the amount `{value}`"))?;
        Ok(Self(amount))
    }
}

/// Group the integral part with `.` every three digits.
fn group_thousands(mut units: u64) -> String {
    let mut groups = Vec::new();
    loop {
        let (rest, group) = (units / 1000, units % 1000);
        if rest == 0 {
            groups.push(group.to_string());
            break;
        }
        groups.push(format!("{group:03}"));
        units = rest;
    }
    groups.reverse();
    groups.join(".")
}

/// Day-over-day percentage change, rounded to two decimals.
#[derive(Copy, Clone, PartialEq, PartialOrd, From)]
pub struct Variation(pub f64);

impl Variation {
    /// Percentage change of `current` relative to `previous`.
    #[must_use]
    pub fn between(previous: Pesos, current: Pesos) -> Self {
        Self(((current.0 - previous.0) / previous.0 * 10000.0).round() / 100.0)
    }

    #[must_use]
    pub fn abs(self) -> f64 {
        self.0.abs()
    }
}

impl Display for Variation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}%", self.0)
    }
}

impl Debug for Variation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl FromStr for Variation {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let stripped = value
            .trim()
            .strip_suffix('%')
            .with_context(|| format!("`{value}` is missing the `%` suffix"))?;
        Ok(Self(f64::from_str(stripped)?))
    }
}
