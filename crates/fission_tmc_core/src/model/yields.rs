//! Fixed-capacity fission-yield summary table
//!
//! One row per retained fragment split. Rows past the retained count stay
//! zero-filled; consumers treat a row whose leading field is zero as empty.

use serde::{Deserialize, Serialize};

/// Default row capacity, comfortably above the few hundred unique splits a
/// typical run produces
pub const DEFAULT_CAPACITY: usize = 300;

/// Column indices shared by both table layouts
pub mod columns {
    pub const Z_LIGHT: usize = 0;
    pub const A_LIGHT: usize = 1;
    pub const Z_HEAVY: usize = 2;
    pub const A_HEAVY: usize = 3;
    pub const YIELD: usize = 4;
    pub const TKE: usize = 5;
    pub const TXE: usize = 6;
    pub const EXC_LIGHT: usize = 7;
    pub const EXC_LIGHT_STD: usize = 8;
    pub const EXC_HEAVY: usize = 9;
    pub const EXC_HEAVY_STD: usize = 10;
    pub const NEUTRON_LIGHT: usize = 11;
    pub const NEUTRON_LIGHT_STD: usize = 12;
    pub const NEUTRON_HEAVY: usize = 13;
    pub const NEUTRON_HEAVY_STD: usize = 14;
    pub const GAMMA_LIGHT: usize = 15;
    pub const GAMMA_LIGHT_STD: usize = 16;
    pub const GAMMA_HEAVY: usize = 17;
    pub const GAMMA_HEAVY_STD: usize = 18;
}

/// Table layout: basic excitation columns, or extended with per-fragment
/// neutron and gamma emission energies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YieldFormat {
    Basic,
    Extended,
}

impl YieldFormat {
    #[must_use]
    pub fn columns(self) -> usize {
        match self {
            YieldFormat::Basic => 11,
            YieldFormat::Extended => 19,
        }
    }
}

/// Contiguous row-major summary table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldTable {
    format: YieldFormat,
    capacity: usize,
    retained: usize,
    data: Vec<f32>,
}

impl YieldTable {
    /// Zero-filled table with room for `capacity` rows
    #[must_use]
    pub fn new(format: YieldFormat, capacity: usize) -> Self {
        Self {
            format,
            capacity,
            retained: 0,
            data: vec![0.0; capacity * format.columns()],
        }
    }

    #[must_use]
    pub fn format(&self) -> YieldFormat {
        self.format
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of rows holding data
    #[must_use]
    pub fn len(&self) -> usize {
        self.retained
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.retained == 0
    }

    /// Row `index` including zero-filled headroom
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let width = self.format.columns();
        self.data.get(index * width..(index + 1) * width)
    }

    /// Rows whose leading field is non-zero
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data
            .chunks_exact(self.format.columns())
            .filter(|row| row[columns::Z_LIGHT] != 0.0)
    }

    /// Sum of the yield column over data rows
    #[must_use]
    pub fn total_yield(&self) -> f64 {
        self.rows().map(|row| f64::from(row[columns::YIELD])).sum()
    }

    /// Raw backing storage, `capacity * columns` values
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Append a row. Returns false once capacity is reached.
    pub(crate) fn push_row(&mut self, values: &[f32]) -> bool {
        if self.retained >= self.capacity {
            return false;
        }
        let width = self.format.columns();
        let start = self.retained * width;
        let n = values.len().min(width);
        self.data[start..start + n].copy_from_slice(&values[..n]);
        self.retained += 1;
        true
    }
}
