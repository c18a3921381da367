//! Qubit connectivity.
//!
//! Edges are stored undirected (each pair once, smaller index first). The
//! REST documents expect the directed form, so [`CouplingMap::directed`]
//! emits both directions.

use serde::{Deserialize, Serialize};

/// Undirected coupling graph of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouplingMap {
    num_qubits: u32,
    edges: Vec<(u32, u32)>,
}

impl CouplingMap {
    /// Linear chain `0 - 1 - ... - n-1`.
    pub fn linear(n: u32) -> Self {
        let edges = (0..n.saturating_sub(1)).map(|i| (i, i + 1)).collect();
        Self {
            num_qubits: n,
            edges,
        }
    }

    /// Five-qubit T layout used by the Falcon r4T family.
    ///
    /// ```text
    /// 0 - 1 - 2
    ///     |
    ///     3
    ///     |
    ///     4
    /// ```
    pub fn t_shape() -> Self {
        Self::custom(5, &[(0, 1), (1, 2), (1, 3), (3, 4)])
    }

    /// Seven-qubit H layout used by the Falcon r5.11H family.
    ///
    /// ```text
    /// 0 - 1 - 2
    ///     |
    ///     3
    ///     |
    /// 4 - 5 - 6
    /// ```
    pub fn h_shape() -> Self {
        Self::custom(7, &[(0, 1), (1, 2), (1, 3), (3, 5), (4, 5), (5, 6)])
    }

    /// Sixteen-qubit heavy-hex fragment (Falcon r4P).
    pub fn heavy_hex_16() -> Self {
        Self::custom(
            16,
            &[
                (0, 1),
                (1, 2),
                (1, 4),
                (2, 3),
                (3, 5),
                (4, 7),
                (5, 8),
                (6, 7),
                (7, 10),
                (8, 9),
                (8, 11),
                (10, 12),
                (11, 14),
                (12, 13),
                (12, 15),
                (13, 14),
            ],
        )
    }

    /// Twenty-seven-qubit heavy-hex lattice (Falcon r5.11).
    pub fn heavy_hex_27() -> Self {
        Self::custom(
            27,
            &[
                (0, 1),
                (1, 2),
                (1, 4),
                (2, 3),
                (3, 5),
                (4, 7),
                (5, 8),
                (6, 7),
                (7, 10),
                (8, 9),
                (8, 11),
                (10, 12),
                (11, 14),
                (12, 13),
                (12, 15),
                (13, 14),
                (14, 16),
                (15, 18),
                (16, 19),
                (17, 18),
                (18, 21),
                (19, 20),
                (19, 22),
                (21, 23),
                (22, 25),
                (23, 24),
                (24, 25),
                (25, 26),
            ],
        )
    }

    /// Build a map from an explicit edge list.
    ///
    /// Pairs are normalized to `(low, high)`; self-loops and duplicates are
    /// dropped.
    pub fn custom(num_qubits: u32, edges: &[(u32, u32)]) -> Self {
        let mut normalized: Vec<(u32, u32)> = edges
            .iter()
            .filter(|(a, b)| a != b)
            .map(|&(a, b)| (a.min(b), a.max(b)))
            .collect();
        normalized.sort_unstable();
        normalized.dedup();
        Self {
            num_qubits,
            edges: normalized,
        }
    }

    /// Number of qubits covered by the map.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Undirected edges, each listed once.
    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    /// Directed edge list in the `[[control, target], ...]` wire form.
    pub fn directed(&self) -> Vec<[u32; 2]> {
        self.edges
            .iter()
            .flat_map(|&(a, b)| [[a, b], [b, a]])
            .collect()
    }

    /// Check whether two qubits share an edge.
    pub fn is_connected(&self, q1: u32, q2: u32) -> bool {
        let key = (q1.min(q2), q1.max(q2));
        self.edges.binary_search(&key).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear() {
        let map = CouplingMap::linear(5);
        assert_eq!(map.edges().len(), 4);
        assert!(map.is_connected(3, 2));
        assert!(!map.is_connected(0, 4));
    }

    #[test]
    fn test_directed_emits_both_directions() {
        let map = CouplingMap::t_shape();
        let directed = map.directed();
        assert_eq!(directed.len(), 8);
        assert!(directed.contains(&[1, 3]));
        assert!(directed.contains(&[3, 1]));
    }

    #[test]
    fn test_custom_normalizes() {
        let map = CouplingMap::custom(3, &[(1, 0), (0, 1), (2, 2), (2, 1)]);
        assert_eq!(map.edges(), &[(0, 1), (1, 2)]);
    }

    #[test]
    fn test_heavy_hex_sizes() {
        assert_eq!(CouplingMap::heavy_hex_16().edges().len(), 16);
        assert_eq!(CouplingMap::heavy_hex_27().edges().len(), 28);
        assert!(CouplingMap::heavy_hex_27().is_connected(25, 26));
    }

    #[test]
    fn test_empty_linear() {
        assert!(CouplingMap::linear(0).edges().is_empty());
        assert!(CouplingMap::linear(1).edges().is_empty());
    }
}
