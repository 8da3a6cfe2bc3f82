use serde::{Deserialize, Serialize};

use crate::error::{Result, TopologyError};
use crate::network::options::JesusOptions;
use crate::splice::SpliceSpec;

/// A width that had to be rounded up to a multiple of the block count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimAdjustment {
    pub option: String,
    pub from: usize,
    pub to: usize,
}

/// Block-aligned widths shared by every hidden layer.
///
/// `jesus_hidden_dim`, `jesus_output_dim` and `affine_output_dim` are all
/// multiples of `num_jesus_blocks`, and
/// `jesus_part_dim * num_jesus_blocks == jesus_hidden_dim`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDims {
    /// Width of the spliced raw input (plus iVector) seen by layer 1.
    pub input_dim: usize,
    pub jesus_hidden_dim: usize,
    pub jesus_output_dim: usize,
    pub affine_output_dim: usize,
    pub num_jesus_blocks: usize,
    pub jesus_part_dim: usize,
    pub adjustments: Vec<DimAdjustment>,
}

impl ResolvedDims {
    /// Per-block bottleneck width.
    pub fn block_bottleneck_dim(&self) -> usize {
        self.affine_output_dim / self.num_jesus_blocks
    }

    /// Per-block output width; the recombined output is `num_jesus_blocks` of these.
    pub fn block_output_dim(&self) -> usize {
        self.jesus_output_dim / self.num_jesus_blocks
    }
}

/// Rounds `width` up to the nearest multiple of `blocks`, or `None` if that
/// multiple does not fit in a `usize`.
pub fn round_up_to_multiple(width: usize, blocks: usize) -> Option<usize> {
    match width % blocks {
        0 => Some(width),
        rem => width.checked_add(blocks - rem),
    }
}

fn too_wide(option: &'static str, what: &str) -> TopologyError {
    TopologyError::InvalidArgument { option, reason: format!("{what} overflows the index range") }
}

/// Resolves the block-aligned widths and the network input width.
///
/// Expects `options` to have passed [`JesusOptions::validate`], so
/// `num_jesus_blocks` is at least 1.
///
/// # Errors
/// `DivisibilityViolation` when an explicit `jesus_part_dim` does not split
/// the resolved hidden width into exactly `num_jesus_blocks` parts.
/// `InvalidArgument` when a width is so large that rounding it, or the
/// input width of some layer, no longer fits in a `usize`.
pub fn resolve_dims(options: &JesusOptions, splices: &SpliceSpec) -> Result<ResolvedDims> {
    let blocks = options.num_jesus_blocks;
    let mut adjustments = Vec::new();
    let mut round = |option: &'static str, width: usize| -> Result<usize> {
        let rounded = round_up_to_multiple(width, blocks)
            .ok_or_else(|| too_wide(option, "rounding up to a multiple of --num-jesus-blocks"))?;
        if rounded != width {
            log::info!(
                "Rounding up --{option} to {rounded} to be a multiple of --num-jesus-blocks={blocks}"
            );
            adjustments.push(DimAdjustment { option: option.to_owned(), from: width, to: rounded });
        }
        Ok(rounded)
    };

    let jesus_output_dim = round("jesus-output-dim", options.jesus_output_dim)?;
    let jesus_hidden_dim = round("jesus-hidden-dim", options.jesus_hidden_dim)?;
    let affine_output_dim = round("affine-output-dim", options.affine_output_dim)?;

    let jesus_part_dim = match options.jesus_part_dim {
        None => jesus_hidden_dim / blocks,
        Some(part) => {
            if part == 0 || jesus_hidden_dim % part != 0 {
                return Err(TopologyError::DivisibilityViolation {
                    what: format!(
                        "--jesus-part-dim={part} must divide --jesus-hidden-dim={jesus_hidden_dim}"
                    ),
                });
            }
            if jesus_hidden_dim / part != blocks {
                return Err(TopologyError::DivisibilityViolation {
                    what: format!(
                        "--jesus-hidden-dim={jesus_hidden_dim} / --jesus-part-dim={part} = {} \
                         does not match --num-jesus-blocks={blocks}",
                        jesus_hidden_dim / part
                    ),
                });
            }
            part
        }
    };

    let first_layer_splices = splices.layers.first().map_or(0, |l| l.splice_offsets.len());
    let input_dim = first_layer_splices
        .checked_mul(options.feat_dim)
        .ok_or_else(|| too_wide("feat-dim", "the spliced feature width"))?
        .checked_add(options.ivector_dim)
        .ok_or_else(|| too_wide("ivector-dim", "the spliced input width"))?;

    // Layers after the first read spliced and recurrent copies of a
    // jesus_output_dim-wide vector.
    for layer in splices.layers.iter().skip(1) {
        if layer.num_inputs().checked_mul(jesus_output_dim).is_none() {
            return Err(too_wide("jesus-output-dim", &format!("the input width of layer \"{layer}\"")));
        }
    }

    Ok(ResolvedDims {
        input_dim,
        jesus_hidden_dim,
        jesus_output_dim,
        affine_output_dim,
        num_jesus_blocks: blocks,
        jesus_part_dim,
        adjustments,
    })
}
