use std::fmt::Write as _;

use crate::network::NetworkPlan;
use crate::topology::{LayerGraph, NodeDescriptor, NodeKind, Nonlinearity};

/// `vars`: the summary the training scripts source as shell variables.
pub fn render_vars(plan: &NetworkPlan) -> String {
    format!(
        "left_context={}\nright_context={}\nnum_hidden_layers={}\n",
        plan.left_context,
        plan.right_context,
        plan.num_hidden_layers()
    )
}

/// `init.config`: inputs plus the spliced-input output used to estimate LDA.
pub fn render_init(nodes: &[NodeDescriptor]) -> String {
    let mut out = String::new();
    out.push_str("# Config file for initializing neural network prior to\n");
    out.push_str("# preconditioning matrix computation\n");
    render_nodes(&mut out, nodes);
    out
}

/// `layer<l>.config`.
pub fn render_layer(graph: &LayerGraph) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Config file for layer {} of the network", graph.index);
    render_nodes(&mut out, &graph.nodes);
    out
}

fn render_nodes(out: &mut String, nodes: &[NodeDescriptor]) {
    for node in nodes {
        let input = node.input.as_ref().map(|d| d.to_string()).unwrap_or_default();
        if node.is_component() {
            let _ = writeln!(out, "component name={} {}", node.name, component_params(node));
            let _ = writeln!(out, "component-node name={0} component={0} input={input}", node.name);
        } else if matches!(node.kind, NodeKind::Input) {
            let _ = writeln!(out, "input-node name={} dim={}", node.name, node.output_dim);
        } else {
            let _ = writeln!(out, "output-node name={} input={input}", node.name);
        }
    }
}

/// The `type=... key=value` part of a `component` line.
fn component_params(node: &NodeDescriptor) -> String {
    let (i, o) = (node.input_dim, node.output_dim);
    match &node.kind {
        NodeKind::FixedTransform { matrix } => {
            format!("type=FixedAffineComponent matrix={}", matrix.display())
        }
        NodeKind::AffineTransform { param_stddev, bias_stddev } => format!(
            "type=NaturalGradientAffineComponent input-dim={i} output-dim={o} \
             param-stddev={param_stddev} bias-stddev={bias_stddev}"
        ),
        NodeKind::BlockDistribute { .. } => {
            format!("type=DistributeComponent input-dim={i} output-dim={o}")
        }
        NodeKind::BlockRecombine { .. } => format!("type=NoOpComponent dim={o}"),
        NodeKind::Nonlinearity { function: Nonlinearity::Rectifier } => {
            format!("type=RectifiedLinearComponent dim={o}")
        }
        NodeKind::Nonlinearity { function: Nonlinearity::LogSoftmax } => {
            format!("type=LogSoftmaxComponent dim={o}")
        }
        NodeKind::RmsNormalize { target_rms } => {
            format!("type=NormalizeComponent dim={o} target-rms={target_rms}")
        }
        NodeKind::ClipGradient { threshold } => {
            format!("type=ClipGradientComponent dim={o} clipping-threshold={threshold}")
        }
        // Declared with their own line kinds in `render_nodes`.
        NodeKind::Input | NodeKind::Output => String::new(),
    }
}
