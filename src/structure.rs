use crate::error::{LabelError, Result};
use serde::{Deserialize, Serialize};

/// 3x3 adjacency kernel deciding which neighbours connect two foreground
/// pixels. The centre element is ignored. Kernels must be centrosymmetric so
/// that connectivity is a symmetric relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<bool>>", into = "Vec<Vec<bool>>")]
pub struct Structure {
    kernel: [[bool; 3]; 3],
}

impl Structure {
    /// Horizontal and vertical neighbours only.
    pub fn four_connected() -> Self {
        Self {
            kernel: [
                [false, true, false],
                [true, true, true],
                [false, true, false],
            ],
        }
    }

    /// All eight neighbours.
    pub fn eight_connected() -> Self {
        Self {
            kernel: [[true; 3]; 3],
        }
    }

    pub fn new(kernel: [[bool; 3]; 3]) -> Result<Self> {
        for (row, cells) in kernel.iter().enumerate() {
            for (col, &cell) in cells.iter().enumerate() {
                if cell != kernel[2 - row][2 - col] {
                    return Err(LabelError::InvalidConfig(format!(
                        "structure must be centrosymmetric: element ({row},{col}) differs from ({},{})",
                        2 - row,
                        2 - col
                    )));
                }
            }
        }
        Ok(Self { kernel })
    }

    /// Parse the `four`/`eight` shorthands (also `4`/`8`).
    pub fn from_connectivity(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "4" | "four" => Ok(Self::four_connected()),
            "8" | "eight" => Ok(Self::eight_connected()),
            other => Err(LabelError::InvalidConfig(format!(
                "unknown connectivity '{other}', use four or eight"
            ))),
        }
    }

    pub fn kernel(&self) -> [[bool; 3]; 3] {
        self.kernel
    }

    /// Neighbour offsets `(d_row, d_col)` that precede the centre in raster
    /// order. A raster scan only needs these to discover every connection.
    pub(crate) fn causal_offsets(&self) -> Vec<(isize, isize)> {
        let mut offsets = Vec::with_capacity(4);
        for (row, cells) in self.kernel.iter().enumerate() {
            for (col, &cell) in cells.iter().enumerate() {
                let offset = (row as isize - 1, col as isize - 1);
                let precedes = offset.0 < 0 || (offset.0 == 0 && offset.1 < 0);
                if cell && precedes {
                    offsets.push(offset);
                }
            }
        }
        offsets
    }
}

impl Default for Structure {
    fn default() -> Self {
        Self::eight_connected()
    }
}

impl TryFrom<Vec<Vec<bool>>> for Structure {
    type Error = LabelError;

    fn try_from(rows: Vec<Vec<bool>>) -> Result<Self> {
        if rows.len() != 3 || rows.iter().any(|row| row.len() != 3) {
            return Err(LabelError::InvalidConfig(format!(
                "structure must be 3x3, got {} rows of lengths {:?}",
                rows.len(),
                rows.iter().map(Vec::len).collect::<Vec<_>>()
            )));
        }
        let mut kernel = [[false; 3]; 3];
        for (target, source) in kernel.iter_mut().zip(&rows) {
            target.copy_from_slice(source);
        }
        Self::new(kernel)
    }
}

impl From<Structure> for Vec<Vec<bool>> {
    fn from(structure: Structure) -> Self {
        structure.kernel.iter().map(|row| row.to_vec()).collect()
    }
}
