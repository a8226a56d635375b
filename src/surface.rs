//! Rectangular market grids and the implied-volatility surface input.
//!
//! A calibration run works on one fixed N_T × N_X grid: rows ordered by
//! increasing maturity, columns by increasing strike. Shape problems are
//! construction-time errors so the pricing and objective layers never have to
//! re-check dimensions.

use crate::error::{Error, Result};
use crate::models::bs;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Rectangular row-major container mapping (maturity index, strike index) to
/// a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    n_rows: usize,
    n_cols: usize,
    data: Vec<T>,
}

impl<T> Grid<T> {
    /// Builds a grid from nested rows. Ragged or empty input is rejected.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map(Vec::len).unwrap_or(0);
        if n_rows == 0 || n_cols == 0 {
            return Err(Error::InvalidInput(
                "grid requires at least one row and one column".to_string(),
            ));
        }
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                return Err(Error::DimensionMismatch(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    n_cols
                )));
            }
            data.extend(row);
        }
        Ok(Self {
            n_rows,
            n_cols,
            data,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn get(&self, i: usize, j: usize) -> Option<&T> {
        if i < self.n_rows && j < self.n_cols {
            self.data.get(i * self.n_cols + j)
        } else {
            None
        }
    }

    /// Iterates rows as slices, in increasing-maturity order.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        self.data.chunks(self.n_cols)
    }

    /// Elementwise transformation preserving the shape.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            data: self.data.iter().map(&mut f).collect(),
        }
    }

    /// Elementwise combination of two equally shaped grids.
    pub fn zip_with<U, V>(
        &self,
        other: &Grid<U>,
        mut f: impl FnMut(&T, &U) -> V,
    ) -> Result<Grid<V>> {
        if self.n_rows != other.n_rows || self.n_cols != other.n_cols {
            return Err(Error::DimensionMismatch(format!(
                "cannot combine {}x{} grid with {}x{} grid",
                self.n_rows, self.n_cols, other.n_rows, other.n_cols
            )));
        }
        Ok(Grid {
            n_rows: self.n_rows,
            n_cols: self.n_cols,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| f(a, b))
                .collect(),
        })
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        assert!(
            i < self.n_rows && j < self.n_cols,
            "grid index ({}, {}) out of range for {}x{} grid",
            i,
            j,
            self.n_rows,
            self.n_cols
        );
        &self.data[i * self.n_cols + j]
    }
}

/// One observed cell of the implied-volatility surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketPoint {
    pub strike: f64,
    pub maturity: f64,
    pub implied_vol: f64,
}

/// Market implied-volatility surface for one calibration run.
///
/// Strikes and maturities are strictly increasing and positive; the vol grid
/// is N_T × N_X with every entry positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolSurface {
    strikes: Vec<f64>,
    maturities: Vec<f64>,
    vols: Grid<f64>,
}

impl VolSurface {
    pub fn new(strikes: Vec<f64>, maturities: Vec<f64>, vols: Grid<f64>) -> Result<Self> {
        if vols.n_rows() != maturities.len() {
            return Err(Error::DimensionMismatch(format!(
                "vol grid has {} rows but {} maturities were supplied",
                vols.n_rows(),
                maturities.len()
            )));
        }
        if vols.n_cols() != strikes.len() {
            return Err(Error::DimensionMismatch(format!(
                "vol grid has {} columns but {} strikes were supplied",
                vols.n_cols(),
                strikes.len()
            )));
        }
        validate_axis("strike", &strikes)?;
        validate_axis("maturity", &maturities)?;
        for (i, row) in vols.rows().enumerate() {
            for (j, &vol) in row.iter().enumerate() {
                if !(vol > 0.0) || !vol.is_finite() {
                    return Err(Error::InvalidInput(format!(
                        "implied volatility at ({}, {}) must be positive and finite, got {}",
                        i, j, vol
                    )));
                }
            }
        }
        Ok(Self {
            strikes,
            maturities,
            vols,
        })
    }

    pub fn strikes(&self) -> &[f64] {
        &self.strikes
    }

    pub fn maturities(&self) -> &[f64] {
        &self.maturities
    }

    pub fn vols(&self) -> &Grid<f64> {
        &self.vols
    }

    pub fn n_strikes(&self) -> usize {
        self.strikes.len()
    }

    pub fn n_maturities(&self) -> usize {
        self.maturities.len()
    }

    /// Iterates every cell with its grid position, row-major.
    pub fn points(&self) -> impl Iterator<Item = (usize, usize, MarketPoint)> + '_ {
        self.maturities
            .iter()
            .enumerate()
            .flat_map(move |(i, &maturity)| {
                self.strikes.iter().enumerate().map(move |(j, &strike)| {
                    (
                        i,
                        j,
                        MarketPoint {
                            strike,
                            maturity,
                            implied_vol: self.vols[(i, j)],
                        },
                    )
                })
            })
    }
}

fn validate_axis(name: &str, values: &[f64]) -> Result<()> {
    for (idx, &value) in values.iter().enumerate() {
        if !(value > 0.0) || !value.is_finite() {
            return Err(Error::InvalidInput(format!(
                "{} at index {} must be positive and finite, got {}",
                name, idx, value
            )));
        }
    }
    for (idx, pair) in values.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(Error::InvalidInput(format!(
                "{} values must be strictly increasing ({} followed by {} at index {})",
                name,
                pair[0],
                pair[1],
                idx + 1
            )));
        }
    }
    Ok(())
}

/// Converts an implied-volatility surface into the target price grid: cell
/// (i, j) is the diffusion call price at (maturities\[i\], strikes\[j\]) under
/// the cell's implied volatility.
pub fn build_target_grid(spot: f64, rate: f64, surface: &VolSurface) -> Result<Grid<f64>> {
    let mut rows = Vec::with_capacity(surface.n_maturities());
    for _ in 0..surface.n_maturities() {
        rows.push(Vec::with_capacity(surface.n_strikes()));
    }
    for (i, _j, point) in surface.points() {
        let price = bs::call_price(spot, point.strike, point.maturity, rate, point.implied_vol)?;
        rows[i].push(price);
    }
    Grid::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_surface() -> VolSurface {
        let vols = Grid::from_rows(vec![
            vec![0.32, 0.30, 0.31],
            vec![0.30, 0.28, 0.29],
        ])
        .unwrap();
        VolSurface::new(vec![10.0, 11.0, 12.0], vec![0.1, 0.3], vols).unwrap()
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let err = Grid::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));
    }

    #[test]
    fn test_surface_shape_mismatch_is_rejected() {
        let vols = Grid::from_rows(vec![vec![0.3, 0.3], vec![0.3, 0.3]]).unwrap();
        assert!(VolSurface::new(vec![10.0, 11.0, 12.0], vec![0.1, 0.3], vols.clone()).is_err());
        assert!(VolSurface::new(vec![10.0, 11.0], vec![0.1], vols).is_err());
    }

    #[test]
    fn test_unordered_axes_are_rejected() {
        let vols = Grid::from_rows(vec![vec![0.3, 0.3]]).unwrap();
        assert!(VolSurface::new(vec![11.0, 10.0], vec![0.1], vols.clone()).is_err());
        let vols2 = Grid::from_rows(vec![vec![0.3], vec![0.3]]).unwrap();
        assert!(VolSurface::new(vec![10.0], vec![0.3, 0.1], vols2).is_err());
    }

    #[test]
    fn test_target_grid_reproduces_direct_pricing() {
        let surface = sample_surface();
        let target = build_target_grid(11.0, 0.06, &surface).unwrap();
        for (i, j, point) in surface.points() {
            let direct =
                bs::call_price(11.0, point.strike, point.maturity, 0.06, point.implied_vol)
                    .unwrap();
            assert_eq!(target[(i, j)], direct);
        }
    }

    #[test]
    fn test_checked_access() {
        let g = Grid::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        assert_eq!(g.get(0, 1), Some(&2.0));
        assert!(g.get(1, 0).is_none());
        assert!(g.get(0, 2).is_none());
    }

    #[test]
    fn test_zip_with_difference() {
        let a = Grid::from_rows(vec![vec![2.0, 3.0]]).unwrap();
        let b = Grid::from_rows(vec![vec![1.0, 5.0]]).unwrap();
        let diff = a.zip_with(&b, |x, y| x - y).unwrap();
        assert_eq!(diff[(0, 0)], 1.0);
        assert_eq!(diff[(0, 1)], -2.0);
    }
}
