/// Prints the topology of a small recurrent TDNN built from Jesus layers.
///
/// Layers:   4 hidden layers, the last three with recurrence
/// Blocks:   8 blocks of 250 → 25 → 40
/// Output:   log-softmax over 2000 targets
///
/// Run with:
///   cargo run --example tdnn_topology
///
/// Nothing is written to disk; use the `make-jesus-configs` binary for that.

use jesus_configs::{generate, JesusOptions, NodeKind};

fn main() {
    let options = JesusOptions {
        ivector_dim: 100,
        jesus_hidden_dim: 2000,
        jesus_output_dim: 320,
        ..JesusOptions::new(
            "-2,-1,0,1,2 -3,0:-3 -3,0:-3 -6,-3,0:-6,-3",
            40,
            2000,
            8,
            200,
            "exp/nnet3/jesus/configs",
        )
    };

    let generated = match generate(&options) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let plan = &generated.plan;
    println!("splice indexes: {}", options.splice_indexes);
    println!(
        "left_context={} right_context={} input_dim={}",
        plan.left_context, plan.right_context, plan.dims.input_dim
    );

    for graph in &generated.layers {
        let affines = graph
            .nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::AffineTransform { .. }))
            .count();
        println!(
            "layer {}: {} nodes ({} affine), output {} (dim {})",
            graph.index,
            graph.nodes.len(),
            affines,
            graph.output.name,
            graph.output.dim
        );
    }

    // vars, init.config and the first layer unit.
    for unit in generated.units().iter().take(3) {
        println!("==> {} <==\n{}", unit.file_name, unit.contents);
    }
}
