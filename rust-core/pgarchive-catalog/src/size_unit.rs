// SPDX-License-Identifier: PMPL-1.0-or-later
//! Binary size units as printed by the backup tool's listings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// A power-of-1024 size unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeUnit {
    B,
    KiB,
    MiB,
    GiB,
    TiB,
}

impl SizeUnit {
    /// All units, smallest first.
    pub const ALL: [SizeUnit; 5] = [
        SizeUnit::B,
        SizeUnit::KiB,
        SizeUnit::MiB,
        SizeUnit::GiB,
        SizeUnit::TiB,
    ];

    /// The symbol used in listings (`"GiB"`, ...).
    pub fn symbol(self) -> &'static str {
        match self {
            SizeUnit::B => "B",
            SizeUnit::KiB => "KiB",
            SizeUnit::MiB => "MiB",
            SizeUnit::GiB => "GiB",
            SizeUnit::TiB => "TiB",
        }
    }

    /// Number of bytes in one unit.
    pub fn multiplier(self) -> u64 {
        match self {
            SizeUnit::B => 1,
            SizeUnit::KiB => 1 << 10,
            SizeUnit::MiB => 1 << 20,
            SizeUnit::GiB => 1 << 30,
            SizeUnit::TiB => 1 << 40,
        }
    }

    /// Convert `magnitude` units into whole bytes, truncating any fraction.
    pub fn bytes(self, magnitude: f64) -> CatalogResult<u64> {
        if !magnitude.is_finite() || magnitude < 0.0 {
            return Err(CatalogError::InvalidSize(magnitude.to_string()));
        }
        // Saturates at u64::MAX for absurdly large magnitudes.
        Ok((magnitude * self.multiplier() as f64) as u64)
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for SizeUnit {
    type Err = CatalogError;

    /// Exact (whitespace-trimmed, case-sensitive) symbol match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        SizeUnit::ALL
            .into_iter()
            .find(|unit| unit.symbol() == trimmed)
            .ok_or_else(|| CatalogError::InvalidUnit(s.to_string()))
    }
}

/// Convert a `(magnitude, unit symbol)` pair such as `(213.0, "GiB")` into bytes.
pub fn to_bytes(magnitude: f64, unit: &str) -> CatalogResult<u64> {
    unit.parse::<SizeUnit>()?.bytes(magnitude)
}
