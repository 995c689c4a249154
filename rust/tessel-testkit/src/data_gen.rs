//! Seeded generators of cell sequences with a controllable mix of runs, literals and nulls.

/// Shape of a generated cell sequence.
#[derive(Debug, Clone)]
pub struct CellShape {
    /// Number of cells.
    pub len: usize,
    /// Probability that a stretch is a null run.
    pub null_ratio: f64,
    /// Probability that a non-null stretch repeats one value.
    pub run_ratio: f64,
    /// Longest generated stretch.
    pub max_stretch: usize,
    /// Number of distinct missing reasons.
    pub reasons: u32,
}

impl Default for CellShape {
    fn default() -> Self {
        CellShape {
            len: 1000,
            null_ratio: 0.1,
            run_ratio: 0.5,
            max_stretch: 20,
            reasons: 3,
        }
    }
}

impl CellShape {
    pub fn with_len(mut self, len: usize) -> Self {
        self.len = len;
        self
    }

    pub fn with_null_ratio(mut self, null_ratio: f64) -> Self {
        self.null_ratio = null_ratio;
        self
    }

    pub fn with_run_ratio(mut self, run_ratio: f64) -> Self {
        self.run_ratio = run_ratio;
        self
    }

    pub fn with_max_stretch(mut self, max_stretch: usize) -> Self {
        self.max_stretch = max_stretch.max(1);
        self
    }

    pub fn with_reasons(mut self, reasons: u32) -> Self {
        self.reasons = reasons;
        self
    }
}

/// A generated cell: a value or a missing reason.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell<T> {
    Value(T),
    Missing(u32),
}

impl<T> Cell<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Cell::Value(v) => Some(v),
            Cell::Missing(_) => None,
        }
    }
}

/// Generates `shape.len` cells, drawing new values from `next_value`.
pub fn generate_cells<T, F>(seed: u64, shape: &CellShape, mut next_value: F) -> Vec<Cell<T>>
where
    T: Clone,
    F: FnMut(&mut fastrand::Rng) -> T,
{
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut cells = Vec::with_capacity(shape.len);
    while cells.len() < shape.len {
        let stretch = rng
            .usize(1..=shape.max_stretch)
            .min(shape.len - cells.len());
        if rng.f64() < shape.null_ratio {
            let reason = rng.u32(0..shape.reasons.max(1));
            cells.extend(std::iter::repeat_n(Cell::Missing(reason), stretch));
        } else if rng.f64() < shape.run_ratio {
            let value = next_value(&mut rng);
            cells.extend(std::iter::repeat_n(Cell::Value(value), stretch));
        } else {
            for _ in 0..stretch {
                cells.push(Cell::Value(next_value(&mut rng)));
            }
        }
    }
    cells
}

/// Integer cells drawn from a small domain, so literal stretches also contain repeats.
pub fn int_cells(seed: u64, shape: &CellShape) -> Vec<Cell<i64>> {
    generate_cells(seed, shape, |rng| rng.i64(-4..4))
}

pub fn bool_cells(seed: u64, shape: &CellShape) -> Vec<Cell<bool>> {
    generate_cells(seed, shape, |rng| rng.bool())
}

/// Byte string cells, including empty strings and strings longer than 255 bytes.
pub fn bytes_cells(seed: u64, shape: &CellShape) -> Vec<Cell<Vec<u8>>> {
    generate_cells(seed, shape, |rng| {
        let len = match rng.u8(0..10) {
            0 => 0,
            1 => rng.usize(256..600),
            _ => rng.usize(1..12),
        };
        let fill = rng.alphanumeric() as u8;
        vec![fill; len]
    })
}
