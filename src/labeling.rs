//! Connected-component labeling with the two-pass size filter.
//!
//! `label` is a raster-scan union-find: provisional labels are merged through
//! an equivalence forest, then renumbered in order of first appearance so the
//! output ids are dense (`1..=count`) and deterministic for a given mask.

use crate::config::SizeBounds;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::mask::Mask;
use crate::structure::Structure;
use serde::Serialize;

/// Per-pixel component ids; `0` is background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    width: usize,
    height: usize,
    labels: Vec<u32>,
    count: usize,
}

/// Smallest axis-aligned rectangle holding a component. `x` is the column,
/// `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl LabelMap {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Number of components; ids run `1..=count`.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn get(&self, row: usize, col: usize) -> u32 {
        self.labels[row * self.width + col]
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> {
        1..=self.count as u32
    }

    /// Pixel count per id, indexed by id. Entry `0` counts background.
    pub fn pixel_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.count + 1];
        for &id in &self.labels {
            counts[id as usize] += 1;
        }
        counts
    }

    /// `(row, col)` coordinates of every component in raster order, indexed
    /// by `id - 1`.
    pub fn pixels_by_id(&self) -> Vec<Vec<(usize, usize)>> {
        let mut pixels = vec![Vec::new(); self.count];
        for (idx, &id) in self.labels.iter().enumerate() {
            if id > 0 {
                pixels[id as usize - 1].push((idx / self.width, idx % self.width));
            }
        }
        pixels
    }

    pub fn pixels(&self, id: u32) -> Vec<(usize, usize)> {
        self.labels
            .iter()
            .enumerate()
            .filter(|&(_, &label)| label == id && id > 0)
            .map(|(idx, _)| (idx / self.width, idx % self.width))
            .collect()
    }

    /// Bounding box per id, indexed by `id - 1`.
    pub fn bounding_boxes(&self) -> Vec<BoundingBox> {
        // (min_row, min_col, max_row, max_col)
        let mut extents = vec![(usize::MAX, usize::MAX, 0usize, 0usize); self.count];
        for (idx, &id) in self.labels.iter().enumerate() {
            if id == 0 {
                continue;
            }
            let (row, col) = (idx / self.width, idx % self.width);
            let entry = &mut extents[id as usize - 1];
            entry.0 = entry.0.min(row);
            entry.1 = entry.1.min(col);
            entry.2 = entry.2.max(row);
            entry.3 = entry.3.max(col);
        }
        extents
            .into_iter()
            .map(|(min_row, min_col, max_row, max_col)| BoundingBox {
                x: min_col,
                y: min_row,
                width: max_col - min_col + 1,
                height: max_row - min_row + 1,
            })
            .collect()
    }

    pub fn to_mask(&self) -> Mask {
        let data = self.labels.iter().map(|&id| id > 0).collect();
        Mask::from_parts(self.width, self.height, data)
    }
}

/// Label the connected foreground regions of `mask` under `structure`.
pub fn label(mask: &Mask, structure: &Structure) -> LabelMap {
    let width = mask.width();
    let height = mask.height();
    let offsets = structure.causal_offsets();

    let mut labels = vec![0u32; width * height];
    // parent[0] is unused so provisional labels index directly
    let mut parent: Vec<u32> = vec![0];

    // First pass - provisional labels and equivalences
    for row in 0..height {
        for col in 0..width {
            let idx = row * width + col;
            if !mask.data()[idx] {
                continue;
            }

            let mut current = 0u32;
            for &(d_row, d_col) in &offsets {
                let n_row = row as isize + d_row;
                let n_col = col as isize + d_col;
                if n_row < 0 || n_col < 0 || n_col >= width as isize {
                    continue;
                }
                let neighbor = labels[n_row as usize * width + n_col as usize];
                if neighbor == 0 {
                    continue;
                }
                if current == 0 {
                    current = find_root(&mut parent, neighbor);
                } else {
                    current = union(&mut parent, current, neighbor);
                }
            }

            if current == 0 {
                current = parent.len() as u32;
                parent.push(current);
            }
            labels[idx] = current;
        }
    }

    // Second pass - resolve roots and renumber by first appearance
    let mut final_ids = vec![0u32; parent.len()];
    let mut count = 0u32;
    for label in labels.iter_mut() {
        if *label == 0 {
            continue;
        }
        let root = find_root(&mut parent, *label) as usize;
        if final_ids[root] == 0 {
            count += 1;
            final_ids[root] = count;
        }
        *label = final_ids[root];
    }

    LabelMap {
        width,
        height,
        labels,
        count: count as usize,
    }
}

fn find_root(parent: &mut [u32], label: u32) -> u32 {
    let mut current = label;
    while parent[current as usize] != current {
        // Path halving
        let grandparent = parent[parent[current as usize] as usize];
        parent[current as usize] = grandparent;
        current = grandparent;
    }
    current
}

/// Merge the sets holding `a` and `b`; the smaller root wins.
fn union(parent: &mut [u32], a: u32, b: u32) -> u32 {
    let root_a = find_root(parent, a);
    let root_b = find_root(parent, b);
    let (keep, merge) = if root_a <= root_b {
        (root_a, root_b)
    } else {
        (root_b, root_a)
    };
    parent[merge as usize] = keep;
    keep
}

/// Keep only components whose pixel count falls strictly inside `bounds`.
///
/// The single largest id (background included, ties to the lowest id) is
/// always dropped. Normally that is the background itself; when a foreground
/// blob outgrows the background it is assumed to be a saturated or inverted
/// region rather than a cosmic ray.
pub fn size_filter(labels: &LabelMap, bounds: SizeBounds, diagnostics: &dyn Diagnostics) -> Mask {
    let mut counts = labels.pixel_counts();

    let mut largest = 0usize;
    for (id, &count) in counts.iter().enumerate() {
        if count > counts[largest] {
            largest = id;
        }
    }
    if largest != 0 {
        diagnostics.report(Diagnostic::DominantComponentDiscarded {
            id: largest as u32,
            pixels: counts[largest],
        });
    }
    counts[largest] = 0;

    let keep: Vec<bool> = counts
        .iter()
        .enumerate()
        .map(|(id, &count)| id != 0 && bounds.contains(count))
        .collect();

    let data = labels
        .labels()
        .iter()
        .map(|&id| keep[id as usize])
        .collect();
    Mask::from_parts(labels.width(), labels.height(), data)
}

/// Label, drop components outside `bounds`, then label again so the final
/// ids are contiguous.
pub fn label_and_filter(
    mask: &Mask,
    structure: &Structure,
    bounds: SizeBounds,
    deblend: bool,
    diagnostics: &dyn Diagnostics,
) -> LabelMap {
    let initial = label(mask, structure);
    if initial.count() == 0 {
        diagnostics.report(Diagnostic::EmptyImage);
        return initial;
    }

    let filtered = size_filter(&initial, bounds, diagnostics);
    let labels = label(&filtered, structure);
    let labels = deblend_components(labels, deblend, diagnostics);

    diagnostics.report(Diagnostic::LabelingSummary {
        initial: initial.count(),
        kept: labels.count(),
    });
    labels
}

/// Extension point for splitting overlapping strikes. No deblender exists
/// yet, so requested deblending is reported and the labels pass through.
fn deblend_components(labels: LabelMap, deblend: bool, diagnostics: &dyn Diagnostics) -> LabelMap {
    if deblend {
        diagnostics.report(Diagnostic::DeblendUnavailable);
    }
    labels
}
