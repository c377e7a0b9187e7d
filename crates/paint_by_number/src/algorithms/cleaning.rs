use tracing::debug;

use crate::{config::CleanupConfig, traits::EdgeCleaner, types::EdgeMask};

/// Drops edge pixels with too few edge neighbours in their 8-neighbourhood.
///
/// Each pass decides every pixel from the pass's input only, so removals
/// never cascade within a pass.
#[derive(Debug, Clone)]
pub struct NeighborCountCleaner {
    pub min_neighbors: u8,
    pub passes: u32,
}

impl Default for NeighborCountCleaner {
    fn default() -> Self {
        Self::from(&CleanupConfig::default())
    }
}

impl From<&CleanupConfig> for NeighborCountCleaner {
    fn from(config: &CleanupConfig) -> Self {
        Self {
            min_neighbors: config.min_neighbors,
            passes: config.passes,
        }
    }
}

impl NeighborCountCleaner {
    fn clean_once(&self, input: &EdgeMask) -> (EdgeMask, usize) {
        let mut output = input.clone();
        let mut removed = 0;

        for y in 0..input.height() {
            for x in 0..input.width() {
                if input.is_edge(x, y) && input.edge_neighbors(x, y) < self.min_neighbors {
                    output.set_edge(x, y, false);
                    removed += 1;
                }
            }
        }

        (output, removed)
    }
}

impl EdgeCleaner for NeighborCountCleaner {
    fn clean(&self, mask: &EdgeMask) -> EdgeMask {
        let mut current = mask.clone();

        for pass in 0..self.passes {
            let (cleaned, removed) = self.clean_once(&current);
            debug!(pass, removed, "Edge cleanup pass");
            current = cleaned;
            if removed == 0 {
                break;
            }
        }

        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(width: u32, height: u32, edges: &[(u32, u32)]) -> EdgeMask {
        let mut mask = EdgeMask::blank(width, height);
        for &(x, y) in edges {
            mask.set_edge(x, y, true);
        }
        mask
    }

    #[test]
    fn test_isolated_pixels_and_pairs_removed() {
        let mask = mask_with(10, 10, &[(2, 2), (6, 6), (7, 6)]);
        let cleaned = NeighborCountCleaner::default().clean(&mask);
        assert_eq!(cleaned.edge_count(), 0);
    }

    #[test]
    fn test_connected_corner_kept() {
        let mask = mask_with(10, 10, &[(3, 3), (4, 3), (3, 4)]);
        let cleaned = NeighborCountCleaner::default().clean(&mask);
        assert_eq!(cleaned, mask);
    }

    #[test]
    fn test_single_pass_reads_original_input() {
        // A straight three-pixel stroke: both ends have one neighbour and go,
        // the middle had two in the input and must survive this pass.
        let mask = mask_with(10, 10, &[(2, 5), (3, 5), (4, 5)]);
        let cleaned = NeighborCountCleaner::default().clean(&mask);

        assert!(cleaned.is_edge(3, 5));
        assert!(!cleaned.is_edge(2, 5));
        assert!(!cleaned.is_edge(4, 5));
        // Input is untouched
        assert_eq!(mask.edge_count(), 3);
    }

    #[test]
    fn test_extra_passes_reach_fixpoint() {
        let mask = mask_with(10, 10, &[(2, 5), (3, 5), (4, 5)]);
        let cleaner = NeighborCountCleaner { min_neighbors: 2, passes: 5 };
        let cleaned = cleaner.clean(&mask);
        assert_eq!(cleaned.edge_count(), 0);
    }

    #[test]
    fn test_idempotent_without_isolated_pixels() {
        let mut edges = Vec::new();
        for x in 1..9 {
            edges.push((x, 4));
            edges.push((x, 5));
        }
        edges.extend([(4, 1), (5, 1), (4, 2), (5, 2)]);
        let mask = mask_with(10, 10, &edges);

        let cleaner = NeighborCountCleaner::default();
        let once = cleaner.clean(&mask);
        let twice = cleaner.clean(&once);
        assert_eq!(once, twice);
        assert_eq!(once, mask);
    }
}
