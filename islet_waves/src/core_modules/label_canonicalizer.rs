// THEORY:
// Raw labels leave the labeler sparse: every fresh label absorbed by a merge is a
// hole in the numbering. The canonicalizer renumbers the labels actually present
// to a dense 1..K, keeping their relative (ascending) order and leaving zeros
// untouched. Renumbering an already dense matrix changes nothing.

use crate::core_modules::activity::LabelMatrix;
use std::collections::BTreeMap;

/// Remaps the distinct nonzero labels of `raw` to 1..K in ascending order.
pub fn canonicalize(raw: &LabelMatrix) -> LabelMatrix {
    let mut mapping: BTreeMap<u32, u32> = raw
        .iter()
        .filter(|&&label| label != 0)
        .map(|&label| (label, 0))
        .collect();
    for (next, dense) in mapping.values_mut().enumerate() {
        *dense = next as u32 + 1;
    }
    raw.mapv(|label| if label == 0 { 0 } else { mapping[&label] })
}

/// Number of distinct nonzero labels.
pub fn event_count(labels: &LabelMatrix) -> usize {
    let mut present: Vec<u32> = labels.iter().copied().filter(|&l| l != 0).collect();
    present.sort_unstable();
    present.dedup();
    present.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn closes_gaps_in_ascending_order() {
        let raw: LabelMatrix = array![[0, 7, 7], [3, 0, 12], [3, 3, 0]];
        let canonical = canonicalize(&raw);
        assert_eq!(canonical, array![[0, 2, 2], [1, 0, 3], [1, 1, 0]]);
        assert_eq!(event_count(&canonical), 3);
    }

    #[test]
    fn is_idempotent() {
        let raw: LabelMatrix = array![[5, 0], [9, 5], [0, 40]];
        let once = canonicalize(&raw);
        assert_eq!(canonicalize(&once), once);
    }

    #[test]
    fn all_zero_stays_zero() {
        let raw = LabelMatrix::zeros((3, 2));
        assert_eq!(canonicalize(&raw), raw);
        assert_eq!(event_count(&raw), 0);
    }
}
