// THEORY:
// `LabelForest` is a disjoint-set (union-find) structure over wave labels. The
// labeler hands out a fresh label for every newly active cell and then records
// "these labels are the same wave" as unions. The root of every set is its
// smallest label, so resolving a label always yields the oldest wave id in its
// group. That makes the outcome of a frame independent of the order in which
// neighbor pairs are visited.

/// Union-find over labels `1..`; index 0 is the "no wave" sentinel and never joins a set.
#[derive(Debug, Clone)]
pub struct LabelForest {
    parent: Vec<u32>,
}

impl Default for LabelForest {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelForest {
    pub fn new() -> Self {
        Self { parent: vec![0] }
    }

    /// Allocates the next label as its own root and returns it.
    pub fn fresh(&mut self) -> u32 {
        let label = self.parent.len() as u32;
        self.parent.push(label);
        label
    }

    /// Number of labels handed out so far.
    pub fn issued(&self) -> usize {
        self.parent.len() - 1
    }

    /// Root of `label`, compressing the path on the way up.
    pub fn find(&mut self, label: u32) -> u32 {
        let mut current = label as usize;
        while current != self.parent[current] as usize {
            // Point to the grandparent
            self.parent[current] = self.parent[self.parent[current] as usize];
            current = self.parent[current] as usize;
        }
        current as u32
    }

    /// Merges the sets of `a` and `b`; the smaller root wins. Returns the merged root.
    pub fn union(&mut self, a: u32, b: u32) -> u32 {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return root_a;
        }
        let (low, high) = if root_a < root_b { (root_a, root_b) } else { (root_b, root_a) };
        self.parent[high as usize] = low;
        low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_labels_start_at_one() {
        let mut forest = LabelForest::new();
        assert_eq!(forest.fresh(), 1);
        assert_eq!(forest.fresh(), 2);
        assert_eq!(forest.issued(), 2);
        assert_eq!(forest.find(2), 2);
    }

    #[test]
    fn union_keeps_minimum_root() {
        let mut forest = LabelForest::new();
        let labels: Vec<u32> = (0..5).map(|_| forest.fresh()).collect();
        forest.union(labels[4], labels[2]);
        forest.union(labels[2], labels[3]);
        assert_eq!(forest.find(labels[4]), 3);
        assert_eq!(forest.union(labels[3], labels[0]), 1);
        assert_eq!(forest.find(labels[4]), 1);
        assert_eq!(forest.find(labels[1]), 2);
    }
}
