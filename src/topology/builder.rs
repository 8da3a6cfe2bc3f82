use serde::Serialize;

use crate::error::{Result, TopologyError};
use crate::network::NetworkPlan;
use crate::topology::descriptor::{Descriptor, NodeDescriptor, NodeKind, Nonlinearity};

pub const INPUT_NODE: &str = "input";
pub const IVECTOR_NODE: &str = "ivector";
pub const OUTPUT_NODE: &str = "output";

/// Stddev of the output affine; kept small so re-adding it after each new
/// layer does not disturb the natural-gradient block transforms.
const FINAL_AFFINE_PARAM_STDDEV: f64 = 0.001;

/// The only state carried from one layer to the next: the name and width of
/// the previous layer's normalized output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriorLayer {
    pub name: String,
    pub dim: usize,
}

/// What a layer reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerSource {
    /// The spliced features (and iVector) of the network input; layer 1 only.
    RawInput,
    Hidden(PriorLayer),
}

/// Ordered node descriptors for one hidden layer, plus what the next layer
/// needs to know about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerGraph {
    pub index: usize,
    pub nodes: Vec<NodeDescriptor>,
    pub output: PriorLayer,
}

// ---------------------------------------------------------------------------
// Initialization graph
// ---------------------------------------------------------------------------

/// Nodes for `init.config`: the network inputs and an output that exposes
/// the spliced input, which is what the LDA matrix gets estimated on.
pub fn build_init(plan: &NetworkPlan) -> Vec<NodeDescriptor> {
    let opts = &plan.options;
    let mut nodes = vec![NodeDescriptor::input_node(INPUT_NODE, opts.feat_dim)];
    if opts.ivector_dim > 0 {
        nodes.push(NodeDescriptor::input_node(IVECTOR_NODE, opts.ivector_dim));
    }
    nodes.push(NodeDescriptor::output_node(OUTPUT_NODE, spliced_raw_input(plan), plan.dims.input_dim));
    nodes
}

fn spliced_raw_input(plan: &NetworkPlan) -> Descriptor {
    let offsets = plan.layers.first().map(|l| l.splice_offsets.as_slice()).unwrap_or(&[]);
    let mut parts = Descriptor::splice(INPUT_NODE, offsets);
    if plan.options.ivector_dim > 0 {
        parts.push(Descriptor::time_invariant(IVECTOR_NODE));
    }
    Descriptor::append(parts)
}

// ---------------------------------------------------------------------------
// Hidden layers
// ---------------------------------------------------------------------------

/// Builds every hidden layer in order, threading each layer's output into
/// the next.
pub fn build_all_layers(plan: &NetworkPlan) -> Result<Vec<LayerGraph>> {
    let mut graphs = Vec::with_capacity(plan.num_hidden_layers());
    let mut source = LayerSource::RawInput;
    for index in 1..=plan.num_hidden_layers() {
        let graph = build_layer(index, &source, plan)?;
        log::debug!("layer {index}: {} nodes, output {}", graph.nodes.len(), graph.output.name);
        source = LayerSource::Hidden(graph.output.clone());
        graphs.push(graph);
    }
    Ok(graphs)
}

/// Builds the complete unit for hidden layer `index` (1-based): the spliced
/// input transform, the Jesus block sub-graph, normalization, and the
/// output tail.
///
/// The output tail (`final-affine`, optional `final-log-softmax`, `output`)
/// is emitted for every layer so each unit can be trained on its own; later
/// units simply redefine those nodes.
///
/// # Errors
/// `LayerOutOfRange` if `index` is 0 or beyond the plan, or if `source`
/// does not match the position (layer 1 reads the raw input, every other
/// layer reads a hidden layer).
pub fn build_layer(index: usize, source: &LayerSource, plan: &NetworkPlan) -> Result<LayerGraph> {
    let spec = plan.layer(index).ok_or(TopologyError::LayerOutOfRange {
        index,
        num_layers: plan.num_hidden_layers(),
    })?;
    let dims = &plan.dims;
    let opts = &plan.options;
    let renorm = format!("renorm{index}");
    let clip = format!("clip-gradient{index}");
    let clipped = spec.is_recurrent() && opts.clipping_threshold > 0.0;

    let mut nodes = Vec::new();

    // Spliced input of the layer and its width.
    let (affine_input, affine_input_dim) = match (index, source) {
        (1, LayerSource::RawInput) => {
            nodes.push(NodeDescriptor::component(
                "lda",
                NodeKind::FixedTransform { matrix: opts.lda_matrix_path() },
                spliced_raw_input(plan),
                dims.input_dim,
                dims.input_dim,
            ));
            (Descriptor::node("lda"), dims.input_dim)
        }
        (i, LayerSource::Hidden(prior)) if i > 1 => {
            let mut parts = Descriptor::splice(&prior.name, &spec.splice_offsets);
            let feedback = if clipped { &clip } else { &renorm };
            parts.extend(
                spec.recurrence_offsets
                    .iter()
                    .map(|&r| Descriptor::if_defined(Descriptor::offset(feedback, r))),
            );
            let dim = spec.splice_offsets.len() * prior.dim
                + spec.recurrence_offsets.len() * dims.jesus_output_dim;
            (Descriptor::append(parts), dim)
        }
        _ => {
            return Err(TopologyError::LayerOutOfRange {
                index,
                num_layers: plan.num_hidden_layers(),
            })
        }
    };

    let affine = format!("affine{index}");
    nodes.push(affine_node(&affine, affine_input, affine_input_dim, dims.jesus_hidden_dim));

    let jesus_output = push_jesus_blocks(&mut nodes, index, &affine, plan);

    let mut last = jesus_output;
    if opts.include_relu {
        let relu = format!("jesus{index}-relu");
        nodes.push(rectifier(&relu, &last, dims.jesus_output_dim));
        last = relu;
    }

    nodes.push(NodeDescriptor::component(
        renorm.as_str(),
        NodeKind::RmsNormalize { target_rms: plan.target_rms(index) },
        Descriptor::node(&last),
        dims.jesus_output_dim,
        dims.jesus_output_dim,
    ));

    if clipped {
        nodes.push(NodeDescriptor::component(
            clip.as_str(),
            NodeKind::ClipGradient { threshold: opts.clipping_threshold },
            Descriptor::node(&renorm),
            dims.jesus_output_dim,
            dims.jesus_output_dim,
        ));
    }

    push_output_tail(&mut nodes, &renorm, plan);

    Ok(LayerGraph {
        index,
        nodes,
        output: PriorLayer { name: renorm, dim: dims.jesus_output_dim },
    })
}

/// Distribute, per-block bottleneck, recombine. Returns the name of the
/// recombined node.
fn push_jesus_blocks(
    nodes: &mut Vec<NodeDescriptor>,
    index: usize,
    input: &str,
    plan: &NetworkPlan,
) -> String {
    let dims = &plan.dims;
    let blocks = dims.num_jesus_blocks;
    let bottleneck = dims.block_bottleneck_dim();
    let block_out = dims.block_output_dim();

    let distribute = format!("jesus{index}-distribute");
    nodes.push(NodeDescriptor::component(
        distribute.as_str(),
        NodeKind::BlockDistribute { blocks },
        Descriptor::node(input),
        dims.jesus_hidden_dim,
        dims.jesus_part_dim,
    ));

    let mut block_outputs = Vec::with_capacity(blocks);
    for block in 0..blocks {
        let affine_a = format!("jesus{index}-block{block}-affine-a");
        let relu = format!("jesus{index}-block{block}-relu");
        let affine_b = format!("jesus{index}-block{block}-affine-b");

        nodes.push(affine_node(
            &affine_a,
            Descriptor::block(&distribute, block),
            dims.jesus_part_dim,
            bottleneck,
        ));
        nodes.push(rectifier(&relu, &affine_a, bottleneck));
        nodes.push(affine_node(&affine_b, Descriptor::node(&relu), bottleneck, block_out));
        block_outputs.push(Descriptor::node(affine_b));
    }

    let recombine = format!("jesus{index}-recombine");
    nodes.push(NodeDescriptor::component(
        recombine.as_str(),
        NodeKind::BlockRecombine { blocks },
        Descriptor::append(block_outputs),
        dims.jesus_output_dim,
        dims.jesus_output_dim,
    ));
    recombine
}

fn push_output_tail(nodes: &mut Vec<NodeDescriptor>, renorm: &str, plan: &NetworkPlan) {
    let targets = plan.options.num_targets;
    nodes.push(NodeDescriptor::component(
        "final-affine",
        NodeKind::AffineTransform { param_stddev: FINAL_AFFINE_PARAM_STDDEV, bias_stddev: 0.0 },
        Descriptor::node(renorm),
        plan.dims.jesus_output_dim,
        targets,
    ));

    let output_input = if plan.options.include_log_softmax {
        nodes.push(NodeDescriptor::component(
            "final-log-softmax",
            NodeKind::Nonlinearity { function: Nonlinearity::LogSoftmax },
            Descriptor::node("final-affine"),
            targets,
            targets,
        ));
        "final-log-softmax"
    } else {
        "final-affine"
    };
    nodes.push(NodeDescriptor::output_node(OUTPUT_NODE, Descriptor::node(output_input), targets));
}

/// Natural-gradient affine with zero bias and the default `1/sqrt(input_dim)`
/// weight stddev.
fn affine_node(name: &str, input: Descriptor, input_dim: usize, output_dim: usize) -> NodeDescriptor {
    NodeDescriptor::component(
        name,
        NodeKind::AffineTransform {
            param_stddev: 1.0 / (input_dim as f64).sqrt(),
            bias_stddev: 0.0,
        },
        input,
        input_dim,
        output_dim,
    )
}

fn rectifier(name: &str, input: &str, dim: usize) -> NodeDescriptor {
    NodeDescriptor::component(
        name,
        NodeKind::Nonlinearity { function: Nonlinearity::Rectifier },
        Descriptor::node(input),
        dim,
        dim,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::JesusOptions;
    use std::collections::{HashMap, HashSet};

    const TDNN_SPEC: &str = "-3,-2,-1,0,1,2,3 -3,0:-3 -3,0:-3 -6,-3,0:-6,-3";

    fn small_options() -> JesusOptions {
        JesusOptions {
            ivector_dim: 100,
            jesus_hidden_dim: 400,
            jesus_output_dim: 200,
            final_layer_normalize_target: 0.5,
            ..JesusOptions::new(TDNN_SPEC, 40, 3000, 4, 120, "exp/cfg")
        }
    }

    fn plan() -> NetworkPlan {
        NetworkPlan::from_options(&small_options()).unwrap()
    }

    fn find<'a>(graph: &'a LayerGraph, name: &str) -> &'a NodeDescriptor {
        graph
            .nodes
            .iter()
            .find(|n| n.name == name)
            .unwrap_or_else(|| panic!("no node named {name}"))
    }

    #[test]
    fn init_graph_splices_input_and_ivector() {
        let nodes = build_init(&plan());
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0], NodeDescriptor::input_node("input", 40));
        assert_eq!(nodes[1], NodeDescriptor::input_node("ivector", 100));
        let output = &nodes[2];
        assert_eq!(output.kind, NodeKind::Output);
        assert_eq!(output.output_dim, 7 * 40 + 100);
        assert_eq!(
            output.input.as_ref().unwrap().to_string(),
            "Append(Offset(input, -3), Offset(input, -2), Offset(input, -1), input, \
             Offset(input, 1), Offset(input, 2), Offset(input, 3), ReplaceIndex(ivector, t, 0))"
        );
    }

    #[test]
    fn init_graph_without_ivector() {
        let opts = JesusOptions { ivector_dim: 0, ..small_options() };
        let nodes = build_init(&NetworkPlan::from_options(&opts).unwrap());
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].output_dim, 7 * 40);
    }

    #[test]
    fn first_layer_starts_with_fixed_lda() {
        let plan = plan();
        let graph = build_layer(1, &LayerSource::RawInput, &plan).unwrap();

        let lda = &graph.nodes[0];
        assert_eq!(lda.name, "lda");
        assert_eq!(
            lda.kind,
            NodeKind::FixedTransform { matrix: "exp/cfg/lda.mat".into() }
        );
        assert_eq!((lda.input_dim, lda.output_dim), (380, 380));

        let affine = find(&graph, "affine1");
        assert_eq!(affine.input, Some(Descriptor::node("lda")));
        assert_eq!((affine.input_dim, affine.output_dim), (380, 400));
        assert_eq!(
            affine.kind,
            NodeKind::AffineTransform { param_stddev: 1.0 / 380f64.sqrt(), bias_stddev: 0.0 }
        );
        assert_eq!(graph.output, PriorLayer { name: "renorm1".into(), dim: 200 });
    }

    #[test]
    fn jesus_blocks_distribute_bottleneck_and_recombine() {
        let plan = plan();
        let graph = build_layer(1, &LayerSource::RawInput, &plan).unwrap();

        let distribute = find(&graph, "jesus1-distribute");
        assert_eq!(distribute.kind, NodeKind::BlockDistribute { blocks: 4 });
        assert_eq!((distribute.input_dim, distribute.output_dim), (400, 100));

        for block in 0..4 {
            let a = find(&graph, &format!("jesus1-block{block}-affine-a"));
            assert_eq!(a.input, Some(Descriptor::block("jesus1-distribute", block)));
            assert_eq!((a.input_dim, a.output_dim), (100, 30));
            let b = find(&graph, &format!("jesus1-block{block}-affine-b"));
            assert_eq!((b.input_dim, b.output_dim), (30, 50));
        }

        let recombine = find(&graph, "jesus1-recombine");
        assert_eq!(recombine.kind, NodeKind::BlockRecombine { blocks: 4 });
        assert_eq!(recombine.output_dim, 200);
        assert_eq!(
            recombine.input.as_ref().unwrap().to_string(),
            "Append(jesus1-block0-affine-b, jesus1-block1-affine-b, \
             jesus1-block2-affine-b, jesus1-block3-affine-b)"
        );

        let relu = find(&graph, "jesus1-relu");
        assert_eq!(relu.input, Some(Descriptor::node("jesus1-recombine")));
        assert_eq!(find(&graph, "renorm1").input, Some(Descriptor::node("jesus1-relu")));
    }

    #[test]
    fn later_layer_splices_previous_renorm_and_feeds_back_through_clip() {
        let plan = plan();
        let layers = build_all_layers(&plan).unwrap();
        let layer4 = &layers[3];

        let affine = find(layer4, "affine4");
        assert_eq!(
            affine.input.as_ref().unwrap().to_string(),
            "Append(Offset(renorm3, -6), Offset(renorm3, -3), renorm3, \
             IfDefined(Offset(clip-gradient4, -6)), IfDefined(Offset(clip-gradient4, -3)))"
        );
        assert_eq!(affine.input_dim, 5 * 200);

        let clip = find(layer4, "clip-gradient4");
        assert_eq!(clip.kind, NodeKind::ClipGradient { threshold: 15.0 });
        assert_eq!(clip.input, Some(Descriptor::node("renorm4")));
    }

    #[test]
    fn recurrence_reads_renorm_directly_when_clipping_is_disabled() {
        let opts = JesusOptions { clipping_threshold: 0.0, ..small_options() };
        let plan = NetworkPlan::from_options(&opts).unwrap();
        let layers = build_all_layers(&plan).unwrap();
        let layer2 = &layers[1];

        assert!(layer2.nodes.iter().all(|n| !matches!(n.kind, NodeKind::ClipGradient { .. })));
        assert_eq!(
            find(layer2, "affine2").input.as_ref().unwrap().to_string(),
            "Append(Offset(renorm1, -3), renorm1, IfDefined(Offset(renorm2, -3)))"
        );
    }

    #[test]
    fn only_last_layer_uses_final_normalize_target() {
        let layers = build_all_layers(&plan()).unwrap();
        for graph in &layers {
            let expected = if graph.index == 4 { 0.5 } else { 1.0 };
            let renorm = find(graph, &format!("renorm{}", graph.index));
            assert_eq!(renorm.kind, NodeKind::RmsNormalize { target_rms: expected });
        }
    }

    #[test]
    fn every_layer_ends_with_the_output_tail() {
        for graph in build_all_layers(&plan()).unwrap() {
            let n = graph.nodes.len();
            assert_eq!(graph.nodes[n - 3].name, "final-affine");
            assert_eq!(graph.nodes[n - 3].output_dim, 3000);
            assert_eq!(
                graph.nodes[n - 3].kind,
                NodeKind::AffineTransform { param_stddev: 0.001, bias_stddev: 0.0 }
            );
            assert_eq!(graph.nodes[n - 2].name, "final-log-softmax");
            assert_eq!(graph.nodes[n - 1].name, "output");
            assert_eq!(graph.nodes[n - 1].input, Some(Descriptor::node("final-log-softmax")));
        }
    }

    #[test]
    fn output_reads_affine_without_log_softmax_or_relu() {
        let opts = JesusOptions { include_log_softmax: false, include_relu: false, ..small_options() };
        let plan = NetworkPlan::from_options(&opts).unwrap();
        let graph = build_layer(1, &LayerSource::RawInput, &plan).unwrap();

        assert!(graph.nodes.iter().all(|n| n.name != "final-log-softmax"));
        assert!(graph.nodes.iter().all(|n| n.name != "jesus1-relu"));
        assert_eq!(find(&graph, "renorm1").input, Some(Descriptor::node("jesus1-recombine")));
        assert_eq!(find(&graph, "output").input, Some(Descriptor::node("final-affine")));
    }

    #[test]
    fn names_are_unique_and_widths_line_up() {
        for graph in build_all_layers(&plan()).unwrap() {
            let mut seen = HashSet::new();
            let mut widths: HashMap<&str, usize> = HashMap::new();
            for node in &graph.nodes {
                assert!(seen.insert(node.name.as_str()), "duplicate node {}", node.name);
                widths.insert(node.name.as_str(), node.output_dim);
            }
            for node in &graph.nodes {
                // Single-reference inputs read the full width of their source.
                if let Some(Descriptor::Node(src)) = &node.input {
                    if let Some(&w) = widths.get(src.as_str()) {
                        assert_eq!(node.input_dim, w, "{} reads {src}", node.name);
                    }
                }
            }
        }
    }

    #[test]
    fn source_must_match_layer_position() {
        let plan = plan();
        let prior = LayerSource::Hidden(PriorLayer { name: "renorm1".into(), dim: 200 });
        assert!(matches!(
            build_layer(1, &prior, &plan),
            Err(TopologyError::LayerOutOfRange { .. })
        ));
        assert!(matches!(
            build_layer(2, &LayerSource::RawInput, &plan),
            Err(TopologyError::LayerOutOfRange { .. })
        ));
        assert!(matches!(
            build_layer(5, &prior, &plan),
            Err(TopologyError::LayerOutOfRange { index: 5, num_layers: 4 })
        ));
        assert!(build_layer(2, &prior, &plan).is_ok());
    }
}
