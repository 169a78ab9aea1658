//! Per-layer percentage runs
//!
//! A flat table of layer runs ordered by their first percentage, each
//! carrying its commands' percentages sorted for binary search. A run is a
//! stretch of the file spent in one layer; a layer revisited after a Z hop
//! gets one run per visit, so runs never overlap. Built in one pass; it has
//! no incremental insert and must be rebuilt when the model changes.

use crate::gcode::{Layer, Locator};

#[derive(Debug, Clone)]
struct LayerRun {
    layer: usize,
    start: f64,
    end: f64,
    /// (percentage, command index), sorted by percentage
    commands: Vec<(f64, usize)>,
}

#[derive(Debug, Clone, Default)]
pub struct LayerRangeIndex {
    runs: Vec<LayerRun>,
    entries: usize,
    last_found: Option<Locator>,
}

impl LayerRangeIndex {
    pub fn build(layers: &[Layer]) -> Self {
        let mut ordered: Vec<(f64, Locator)> = layers
            .iter()
            .enumerate()
            .flat_map(|(l, layer)| {
                layer
                    .commands
                    .iter()
                    .enumerate()
                    .map(move |(c, cmd)| (cmd.percentage, Locator::new(l, c)))
            })
            .collect();
        // stable: equal percentages keep model order
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

        let entries = ordered.len();
        let mut runs: Vec<LayerRun> = Vec::new();
        for (pct, loc) in ordered {
            match runs.last_mut() {
                Some(run) if run.layer == loc.layer => {
                    run.end = pct;
                    run.commands.push((pct, loc.cmd));
                }
                _ => runs.push(LayerRun {
                    layer: loc.layer,
                    start: pct,
                    end: pct,
                    commands: vec![(pct, loc.cmd)],
                }),
            }
        }

        Self {
            runs,
            entries,
            last_found: None,
        }
    }

    /// Number of contiguous layer runs
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Locate the first command at or after a percentage
    ///
    /// Picks the last run starting at or before the key, then the first
    /// command in it whose percentage is not below the key (its last command
    /// if the key is past its end). A `None` key returns the previous answer.
    pub fn find(&mut self, key: Option<f64>) -> Option<Locator> {
        let Some(key) = key else {
            return self.last_found;
        };

        let after = self.runs.partition_point(|r| r.start <= key);
        let run = self.runs.get(after.saturating_sub(1))?;

        let pos = if key > run.end {
            run.commands.len() - 1
        } else {
            run.commands.partition_point(|(pct, _)| *pct < key)
        };
        let found = run
            .commands
            .get(pos)
            .map(|(_, cmd)| Locator::new(run.layer, *cmd));

        if found.is_some() {
            self.last_found = found;
        }
        found
    }

    pub fn last_found(&self) -> Option<Locator> {
        self.last_found
    }
}
