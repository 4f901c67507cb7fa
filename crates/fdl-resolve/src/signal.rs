//! Signal array model
//!
//! A signal has one [`Dimension`] per declared index range. Cells are stored
//! in a flat buffer addressed by a row-major offset over the normalized
//! bounds; two same-shape bitsets record which cells have been initialized
//! and which have been driven by logic.

use crate::error::{SymbolError, SymbolResult};
use bitvec::prelude::*;
use fdl_frontend::ast::PortDirection;
use fdl_frontend::ConstValue;

/// Largest number of cells a single signal may hold
pub const MAX_CELLS: usize = 1 << 20;

/// One normalized dimension. `flip` records a descending declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension {
    pub low: i64,
    pub high: i64,
    pub flip: bool,
}

impl Dimension {
    pub fn from_bounds(left: i64, right: i64) -> Self {
        Self {
            low: left.min(right),
            high: left.max(right),
            flip: left > right,
        }
    }

    pub fn len(&self) -> usize {
        self.checked_len().unwrap_or(usize::MAX)
    }

    /// Element count, `None` when it does not fit a `usize`
    pub fn checked_len(&self) -> Option<usize> {
        let span = self.high.checked_sub(self.low)?;
        usize::try_from(span).ok()?.checked_add(1)
    }

    pub fn is_empty(&self) -> bool {
        self.high < self.low
    }

    /// Whether the dimension is a single element
    pub fn is_scalar(&self) -> bool {
        self.low == self.high
    }

    pub fn contains(&self, low: i64, high: i64) -> bool {
        self.low <= low && high <= self.high
    }

    /// Storage position of index `i`
    fn position(&self, i: i64) -> usize {
        if self.flip {
            (self.high - i) as usize
        } else {
            (i - self.low) as usize
        }
    }

    /// Indices `low..=high` in this dimension's declared direction
    fn walk(&self, low: i64, high: i64) -> Vec<i64> {
        if self.flip {
            (low..=high).rev().collect()
        } else {
            (low..=high).collect()
        }
    }
}

/// A declared port, signal, constant or generic together with its value store
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSymbol {
    pub name: String,
    pub type_name: String,
    /// Bound type configuration parameters, e.g. `width = 8`
    pub type_params: Vec<(String, Option<ConstValue>)>,
    pub is_const: bool,
    pub is_generic: bool,
    pub direction: Option<PortDirection>,
    /// Name given by a `rename` statement
    pub rename: Option<String>,
    /// Iteration range when the symbol is a loop variable
    pub loop_range: Option<(i64, i64)>,
    dims: Vec<Dimension>,
    values: Vec<Option<ConstValue>>,
    init_assigned: BitVec,
    value_assigned: BitVec,
}

impl SignalSymbol {
    /// A scalar signal of `type_name`
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            type_params: Vec::new(),
            is_const: false,
            is_generic: false,
            direction: None,
            rename: None,
            loop_range: None,
            dims: vec![Dimension::from_bounds(0, 0)],
            values: vec![None],
            init_assigned: bitvec![0; 1],
            value_assigned: bitvec![0; 1],
        }
    }

    /// Shape the store from declared `[left, right]` bounds, outermost first.
    /// No bounds means a scalar (`[[0, 0]]`). The shape may hold at most
    /// [`MAX_CELLS`] cells; on failure the previous shape is kept.
    pub fn set_array(&mut self, bounds: &[(i64, i64)]) -> SymbolResult<()> {
        let dims: Vec<Dimension> = if bounds.is_empty() {
            vec![Dimension::from_bounds(0, 0)]
        } else {
            bounds
                .iter()
                .map(|(left, right)| Dimension::from_bounds(*left, *right))
                .collect()
        };

        let cells = dims
            .iter()
            .try_fold(1usize, |total, dim| total.checked_mul(dim.checked_len()?))
            .filter(|cells| *cells <= MAX_CELLS)
            .ok_or_else(|| SymbolError::ArrayTooLarge {
                signal: self.name.clone(),
                bounds: bounds
                    .iter()
                    .map(|(left, right)| format!("[{left}:{right}]"))
                    .collect(),
                limit: MAX_CELLS,
            })?;

        self.dims = dims;
        self.values = vec![None; cells];
        self.init_assigned = bitvec![0; cells];
        self.value_assigned = bitvec![0; cells];
        Ok(())
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    /// Number of dimensions spanning more than one element
    pub fn type_dim(&self) -> usize {
        self.dims.iter().filter(|d| !d.is_scalar()).count()
    }

    pub fn cell_count(&self) -> usize {
        self.values.len()
    }

    pub fn init_assigned(&self) -> &BitSlice {
        &self.init_assigned
    }

    pub fn value_assigned(&self) -> &BitSlice {
        &self.value_assigned
    }

    /// Every cell has been driven by logic or declared constant
    pub fn is_fully_assigned(&self) -> bool {
        self.value_assigned.all()
    }

    pub fn values(&self) -> &[Option<ConstValue>] {
        &self.values
    }

    /// Row-major storage offset of one cell
    pub fn offset(&self, indices: &[i64]) -> usize {
        let mut offset = 0;
        for (dim, index) in self.dims.iter().zip(indices) {
            offset = offset * dim.len() + dim.position(*index);
        }
        offset
    }

    /// Storage offsets selected by `index`, in declared order.
    ///
    /// `None` selects the whole shape. Each given range must lie within the
    /// declared bounds of its dimension; dimensions left out are taken whole.
    pub fn resolve_cells(&self, index: Option<&[(i64, i64)]>) -> SymbolResult<Vec<usize>> {
        let index = index.unwrap_or(&[]);
        if index.len() > self.dims.len() {
            return Err(SymbolError::TooManyIndices {
                signal: self.name.clone(),
                expected: self.dims.len(),
                found: index.len(),
            });
        }

        let mut axes = Vec::with_capacity(self.dims.len());
        for (position, dim) in self.dims.iter().enumerate() {
            let (low, high) = match index.get(position) {
                Some((a, b)) => ((*a).min(*b), (*a).max(*b)),
                None => (dim.low, dim.high),
            };
            if !dim.contains(low, high) {
                return Err(SymbolError::OutOfBounds {
                    signal: self.name.clone(),
                    index: format!("{low}:{high}"),
                    bounds: format!("{}:{}", dim.low, dim.high),
                });
            }
            axes.push(dim.walk(low, high));
        }

        let mut cells = vec![0usize];
        for (dim, axis) in self.dims.iter().zip(&axes) {
            let mut next = Vec::with_capacity(cells.len() * axis.len());
            for base in &cells {
                for i in axis {
                    next.push(base * dim.len() + dim.position(*i));
                }
            }
            cells = next;
        }
        Ok(cells)
    }

    /// Record an initializer over `index` (or the whole shape).
    ///
    /// Every targeted cell must still be uninitialized. Constants are also
    /// marked as driven.
    pub fn assign_init_value(
        &mut self,
        value: Option<&ConstValue>,
        index: Option<&[(i64, i64)]>,
    ) -> SymbolResult<()> {
        let cells = self.resolve_cells(index)?;
        if cells.iter().any(|c| self.init_assigned[*c]) {
            return Err(SymbolError::AlreadyAssigned {
                signal: self.name.clone(),
                what: "initial value",
            });
        }

        self.store(&cells, value)?;
        for cell in &cells {
            self.init_assigned.set(*cell, true);
            if self.is_const {
                self.value_assigned.set(*cell, true);
            }
        }
        Ok(())
    }

    /// Record a logic assignment over `index` (or the whole shape)
    pub fn assign_value(
        &mut self,
        value: Option<&ConstValue>,
        index: Option<&[(i64, i64)]>,
    ) -> SymbolResult<()> {
        let cells = self.resolve_cells(index)?;
        self.drive_cells(&cells)?;
        self.store(&cells, value)
    }

    /// Mark already resolved cells as driven by logic
    pub fn drive_cells(&mut self, cells: &[usize]) -> SymbolResult<()> {
        if cells.iter().any(|c| self.value_assigned[*c]) {
            return Err(SymbolError::AlreadyAssigned {
                signal: self.name.clone(),
                what: "value",
            });
        }
        for cell in cells {
            self.value_assigned.set(*cell, true);
        }
        Ok(())
    }

    /// Fill every cell of a constant at once
    pub fn assign_const_value(&mut self, value: &ConstValue) -> SymbolResult<()> {
        self.is_const = true;
        self.assign_init_value(Some(value), None)
    }

    /// Folded value of a fully initialized signal
    pub fn const_value(&self) -> Option<ConstValue> {
        if self.values.len() == 1 {
            return self.values[0].clone();
        }
        let mut bits = Vec::with_capacity(self.values.len());
        for value in &self.values {
            match value {
                Some(ConstValue::Bit(b)) if b.len() == 1 => bits.push(b[0]),
                _ => return None,
            }
        }
        Some(ConstValue::Bit(bits))
    }

    /// Folded value of the cells selected by `index`, if all are known
    pub fn read_value(&self, index: Option<&[(i64, i64)]>) -> Option<ConstValue> {
        if index.is_none() {
            return self.const_value();
        }
        let cells = self.resolve_cells(index).ok()?;
        if let [cell] = cells.as_slice() {
            return self.values[*cell].clone();
        }
        let mut bits = Vec::with_capacity(cells.len());
        for cell in cells {
            match &self.values[cell] {
                Some(ConstValue::Bit(b)) if b.len() == 1 => bits.push(b[0]),
                _ => return None,
            }
        }
        Some(ConstValue::Bit(bits))
    }

    fn store(&mut self, cells: &[usize], value: Option<&ConstValue>) -> SymbolResult<()> {
        let Some(value) = value else {
            return Ok(());
        };

        match value {
            _ if cells.len() == 1 => self.values[cells[0]] = Some(value.clone()),
            ConstValue::Bit(bits) if bits.len() > 1 => {
                if bits.len() != cells.len() {
                    return Err(SymbolError::WidthMismatch {
                        signal: self.name.clone(),
                        expected: cells.len(),
                        found: bits.len(),
                    });
                }
                for (cell, bit) in cells.iter().zip(bits) {
                    self.values[*cell] = Some(ConstValue::Bit(vec![*bit]));
                }
            }
            other => {
                for cell in cells {
                    self.values[*cell] = Some(other.clone());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte() -> SignalSymbol {
        let mut signal = SignalSymbol::new("data", "bit");
        signal.set_array(&[(7, 0)]).unwrap();
        signal
    }

    #[test]
    fn test_dimension_normalization() {
        let dim = Dimension::from_bounds(7, 0);
        assert_eq!((dim.low, dim.high, dim.flip), (0, 7, true));
        assert_eq!(dim.len(), 8);
        let dim = Dimension::from_bounds(2, 5);
        assert_eq!((dim.low, dim.high, dim.flip), (2, 5, false));
    }

    #[test]
    fn test_scalar_shape() {
        let signal = SignalSymbol::new("x", "int");
        assert_eq!(signal.dims(), &[Dimension::from_bounds(0, 0)]);
        assert_eq!(signal.type_dim(), 0);
        assert_eq!(signal.cell_count(), 1);
    }

    #[test]
    fn test_init_containment_and_conflicts() {
        let mut signal = byte();
        assert!(signal.assign_init_value(None, Some(&[(3, 0)])).is_ok());
        assert!(matches!(
            signal.assign_init_value(None, Some(&[(8, 0)])),
            Err(SymbolError::OutOfBounds { .. })
        ));
        assert!(matches!(
            signal.assign_init_value(None, Some(&[(3, 0)])),
            Err(SymbolError::AlreadyAssigned { .. })
        ));
        assert!(signal.assign_init_value(None, Some(&[(7, 4)])).is_ok());
        assert!(signal.init_assigned().all());
        assert!(signal.value_assigned().not_any());
    }

    #[test]
    fn test_const_marks_value_assigned() {
        let mut signal = byte();
        signal.is_const = true;
        let value = ConstValue::Bit(vec![true, false, true, false, false, true, false, true]);
        signal.assign_init_value(Some(&value), None).unwrap();
        assert!(signal.is_fully_assigned());
        assert_eq!(signal.const_value(), Some(value));
    }

    #[test]
    fn test_value_bits_follow_declared_order() {
        let mut signal = byte();
        let value = ConstValue::Bit(vec![true, false, false, false]);
        signal.assign_init_value(Some(&value), Some(&[(7, 4)])).unwrap();
        // bit 7 is the first bit of the literal
        assert_eq!(
            signal.values()[signal.offset(&[7])],
            Some(ConstValue::Bit(vec![true]))
        );
        assert_eq!(
            signal.values()[signal.offset(&[4])],
            Some(ConstValue::Bit(vec![false]))
        );
    }

    #[test]
    fn test_read_value_of_slice() {
        let mut signal = byte();
        signal.is_const = true;
        let value = ConstValue::Bit(vec![true, true, false, false, true, false, true, false]);
        signal.assign_init_value(Some(&value), None).unwrap();
        assert_eq!(
            signal.read_value(Some(&[(7, 6)])),
            Some(ConstValue::Bit(vec![true, true]))
        );
        assert_eq!(signal.read_value(Some(&[(3, 3)])), Some(ConstValue::Bit(vec![true])));
        assert_eq!(signal.read_value(Some(&[(9, 9)])), None);
    }

    #[test]
    fn test_width_mismatch() {
        let mut signal = byte();
        let value = ConstValue::Bit(vec![true, false]);
        assert!(matches!(
            signal.assign_init_value(Some(&value), Some(&[(3, 0)])),
            Err(SymbolError::WidthMismatch { expected: 4, found: 2, .. })
        ));
    }

    #[test]
    fn test_logic_driver_conflicts() {
        let mut signal = byte();
        signal.assign_value(None, Some(&[(3, 0)])).unwrap();
        assert!(signal.assign_value(None, Some(&[(2, 2)])).is_err());
        signal.assign_value(None, Some(&[(4, 7)])).unwrap();
        assert!(signal.is_fully_assigned());
    }

    #[test]
    fn test_two_dimensional_offsets() {
        let mut signal = SignalSymbol::new("mem", "bit");
        signal.set_array(&[(0, 3), (7, 0)]).unwrap();
        assert_eq!(signal.cell_count(), 32);
        assert_eq!(signal.type_dim(), 2);

        let row = signal.resolve_cells(Some(&[(1, 1)])).unwrap();
        assert_eq!(row.len(), 8);
        assert_eq!(row[0], signal.offset(&[1, 7]));

        assert!(signal.resolve_cells(Some(&[(0, 0), (0, 0), (0, 0)])).is_err());
    }

    #[test]
    fn test_oversized_arrays_keep_previous_shape() {
        let mut signal = byte();
        assert!(matches!(
            signal.set_array(&[(i64::MAX, 0)]),
            Err(SymbolError::ArrayTooLarge { .. })
        ));
        assert!(matches!(
            signal.set_array(&[(i64::MIN, i64::MAX)]),
            Err(SymbolError::ArrayTooLarge { .. })
        ));
        assert!(signal.set_array(&[(4_000_000_000, 0), (4_000_000_000, 0)]).is_err());
        assert!(signal.set_array(&[(MAX_CELLS as i64, 0)]).is_err());
        assert_eq!(signal.cell_count(), 8);
    }
}
