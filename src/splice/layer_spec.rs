use std::fmt;

use serde::{Deserialize, Serialize};

/// Temporal offsets consumed by one hidden layer.
///
/// Fields:
/// - `splice_offsets`     — frames of the layer below to append, strictly
///                          ascending (layer 1 reads the raw input instead)
/// - `recurrence_offsets` — frames of this layer's own output to feed back;
///                          empty for a purely feed-forward layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub splice_offsets: Vec<i32>,
    pub recurrence_offsets: Vec<i32>,
}

impl LayerSpec {
    pub fn is_recurrent(&self) -> bool {
        !self.recurrence_offsets.is_empty()
    }

    /// How many frames into the past this layer reaches. Negative when every
    /// offset lies in the future.
    pub fn left_span(&self) -> i64 {
        -(self.splice_offsets.first().copied().unwrap_or(0) as i64)
    }

    /// How many frames into the future this layer reaches.
    pub fn right_span(&self) -> i64 {
        self.splice_offsets.last().copied().unwrap_or(0) as i64
    }

    /// Number of frames appended at the layer input, recurrences included.
    pub fn num_inputs(&self) -> usize {
        self.splice_offsets.len() + self.recurrence_offsets.len()
    }
}

impl fmt::Display for LayerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join_offsets(&self.splice_offsets))?;
        if self.is_recurrent() {
            write!(f, ":{}", join_offsets(&self.recurrence_offsets))?;
        }
        Ok(())
    }
}

/// A fully validated `--splice-indexes` value plus the context it implies.
///
/// `left_context` / `right_context` are the per-layer spans summed over all
/// layers and clamped at zero; they are what the training scripts need to
/// know how many frames to pad each chunk with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpliceSpec {
    pub layers: Vec<LayerSpec>,
    pub left_context: usize,
    pub right_context: usize,
}

impl SpliceSpec {
    /// Builds the spec and accumulates context from already-validated layers.
    pub fn from_layers(layers: Vec<LayerSpec>) -> SpliceSpec {
        let left: i64 = layers.iter().map(LayerSpec::left_span).sum();
        let right: i64 = layers.iter().map(LayerSpec::right_span).sum();
        SpliceSpec {
            layers,
            left_context: left.max(0) as usize,
            right_context: right.max(0) as usize,
        }
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn splice_array(&self) -> Vec<Vec<i32>> {
        self.layers.iter().map(|l| l.splice_offsets.clone()).collect()
    }

    pub fn recurrence_array(&self) -> Vec<Vec<i32>> {
        self.layers.iter().map(|l| l.recurrence_offsets.clone()).collect()
    }
}

/// Canonical form: one field per layer, separated by single spaces.
impl fmt::Display for SpliceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, layer) in self.layers.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{layer}")?;
        }
        Ok(())
    }
}

fn join_offsets(offsets: &[i32]) -> String {
    offsets
        .iter()
        .map(|o| o.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
