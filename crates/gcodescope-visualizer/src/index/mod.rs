//! Progress percentage index
//!
//! Maps a cumulative byte percentage to the `(layer, command)` executing at
//! that point of the file. Two structures are available, selected with the
//! reader option `indexStrategy`:
//! - `PercentageTree`, a balanced tree with one node per distinct percentage
//! - `LayerRangeIndex`, a table of per-layer runs with binary search

pub mod ranges;
pub mod tree;

pub use ranges::LayerRangeIndex;
pub use tree::PercentageTree;

use gcodescope_settings::IndexStrategy;
use tracing::debug;

use crate::gcode::{Layer, Locator};

#[derive(Debug, Clone)]
pub enum PercentageIndex {
    Tree(PercentageTree),
    LayerRanges(LayerRangeIndex),
}

impl Default for PercentageIndex {
    fn default() -> Self {
        Self::Tree(PercentageTree::new())
    }
}

impl PercentageIndex {
    /// Index every command of a dense model
    pub fn build(strategy: IndexStrategy, layers: &[Layer]) -> Self {
        let index = match strategy {
            IndexStrategy::Tree => {
                let mut tree = PercentageTree::new();
                for (l, layer) in layers.iter().enumerate() {
                    for (c, cmd) in layer.commands.iter().enumerate() {
                        tree.insert(cmd.percentage, Locator::new(l, c));
                    }
                }
                Self::Tree(tree)
            }
            IndexStrategy::LayerRanges => Self::LayerRanges(LayerRangeIndex::build(layers)),
        };
        debug!("Built {} index with {} entries", strategy, index.len());
        index
    }

    pub fn strategy(&self) -> IndexStrategy {
        match self {
            Self::Tree(_) => IndexStrategy::Tree,
            Self::LayerRanges(_) => IndexStrategy::LayerRanges,
        }
    }

    /// Locate a percentage; `None` repeats the previous answer
    pub fn find(&mut self, key: Option<f64>) -> Option<Locator> {
        match self {
            Self::Tree(tree) => tree.find_best(key),
            Self::LayerRanges(ranges) => ranges.find(key),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Tree(tree) => tree.len(),
            Self::LayerRanges(ranges) => ranges.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::Command;

    fn model() -> Vec<Layer> {
        let layer = |start: f64| {
            let commands = (0..4)
                .map(|i| Command {
                    percentage: start + i as f64 * 5.0,
                    ..Default::default()
                })
                .collect();
            Layer::new(0, 0.0, commands)
        };
        vec![layer(0.0), layer(25.0), layer(50.0), layer(75.0)]
    }

    #[test]
    fn test_strategies_agree_on_exact_keys() {
        let layers = model();
        let mut tree = PercentageIndex::build(IndexStrategy::Tree, &layers);
        let mut ranges = PercentageIndex::build(IndexStrategy::LayerRanges, &layers);
        assert_eq!(tree.len(), 16);
        assert_eq!(ranges.len(), 16);

        for (l, layer) in layers.iter().enumerate() {
            for (c, cmd) in layer.commands.iter().enumerate() {
                let expected = Some(Locator::new(l, c));
                assert_eq!(tree.find(Some(cmd.percentage)), expected);
                assert_eq!(ranges.find(Some(cmd.percentage)), expected);
            }
        }
    }

    #[test]
    fn test_strategies_agree_on_interleaved_layers() {
        let layer = |percentages: &[f64]| {
            let commands = percentages
                .iter()
                .map(|p| Command {
                    percentage: *p,
                    ..Default::default()
                })
                .collect();
            Layer::new(0, 0.0, commands)
        };
        // Z hops send the file back to layer 0 twice
        let layers = vec![
            layer(&[5.0, 10.0, 40.0, 45.0, 80.0]),
            layer(&[20.0, 30.0, 60.0, 70.0]),
            layer(&[50.0, 90.0, 100.0]),
        ];
        let mut tree = PercentageIndex::build(IndexStrategy::Tree, &layers);
        let mut ranges = PercentageIndex::build(IndexStrategy::LayerRanges, &layers);

        for (l, layer) in layers.iter().enumerate() {
            for (c, cmd) in layer.commands.iter().enumerate() {
                let expected = Some(Locator::new(l, c));
                assert_eq!(tree.find(Some(cmd.percentage)), expected);
                assert_eq!(ranges.find(Some(cmd.percentage)), expected);
            }
        }
    }

    #[test]
    fn test_default_is_empty_tree() {
        let mut index = PercentageIndex::default();
        assert!(index.is_empty());
        assert_eq!(index.strategy(), IndexStrategy::Tree);
        assert_eq!(index.find(Some(10.0)), None);
    }
}
