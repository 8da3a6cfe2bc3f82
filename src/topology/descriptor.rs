use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize, Serializer};

/// Index variable that `ReplaceIndex` rewrites: `t` is time, `x` is the
/// block index introduced by a distribute node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexVar {
    T,
    X,
}

impl fmt::Display for IndexVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexVar::T => f.write_str("t"),
            IndexVar::X => f.write_str("x"),
        }
    }
}

/// Where a node reads its input from, in nnet3 descriptor syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    Node(String),
    Offset(Box<Descriptor>, i32),
    Append(Vec<Descriptor>),
    ReplaceIndex(Box<Descriptor>, IndexVar, i32),
    /// Reads zero where the referenced frame does not exist yet; used for
    /// recurrent connections.
    IfDefined(Box<Descriptor>),
}

impl Descriptor {
    pub fn node(name: impl Into<String>) -> Descriptor {
        Descriptor::Node(name.into())
    }

    /// `name` shifted by `offset` frames; offset 0 is the plain name.
    pub fn offset(name: &str, offset: i32) -> Descriptor {
        if offset == 0 {
            Descriptor::node(name)
        } else {
            Descriptor::Offset(Box::new(Descriptor::node(name)), offset)
        }
    }

    /// Appends `name` at every offset, in order.
    pub fn splice(name: &str, offsets: &[i32]) -> Vec<Descriptor> {
        offsets.iter().map(|&o| Descriptor::offset(name, o)).collect()
    }

    /// Picks a single block out of a distributed stream.
    pub fn block(name: &str, index: usize) -> Descriptor {
        Descriptor::ReplaceIndex(Box::new(Descriptor::node(name)), IndexVar::X, index as i32)
    }

    /// A time-invariant input such as an iVector, always read at `t = 0`.
    pub fn time_invariant(name: &str) -> Descriptor {
        Descriptor::ReplaceIndex(Box::new(Descriptor::node(name)), IndexVar::T, 0)
    }

    pub fn if_defined(inner: Descriptor) -> Descriptor {
        Descriptor::IfDefined(Box::new(inner))
    }

    /// `Append(..)` of several parts, or the part itself when there is only one.
    pub fn append(mut parts: Vec<Descriptor>) -> Descriptor {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Descriptor::Append(parts)
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Node(name) => f.write_str(name),
            Descriptor::Offset(inner, offset) => write!(f, "Offset({inner}, {offset})"),
            Descriptor::Append(parts) => {
                f.write_str("Append(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{part}")?;
                }
                f.write_str(")")
            }
            Descriptor::ReplaceIndex(inner, var, value) => {
                write!(f, "ReplaceIndex({inner}, {var}, {value})")
            }
            Descriptor::IfDefined(inner) => write!(f, "IfDefined({inner})"),
        }
    }
}

/// Descriptors are stored in JSON dumps in the same text form the config
/// files use.
impl Serialize for Descriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nonlinearity {
    Rectifier,
    LogSoftmax,
}

/// What a node computes, with its kind-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// A network input fed by the trainer (features or iVectors).
    Input,
    /// Linear transform loaded from a matrix file and never trained.
    FixedTransform { matrix: PathBuf },
    /// Trainable affine transform; weights drawn with `param_stddev`.
    AffineTransform { param_stddev: f64, bias_stddev: f64 },
    /// Splits its input into `blocks` equal slices indexed by `x`.
    BlockDistribute { blocks: usize },
    /// Concatenates `blocks` block outputs back into one vector.
    BlockRecombine { blocks: usize },
    Nonlinearity { function: Nonlinearity },
    RmsNormalize { target_rms: f64 },
    /// Identity in the forward pass, clips gradients on recurrent paths.
    ClipGradient { threshold: f64 },
    /// A network output read by the trainer.
    Output,
}

/// One computation node of a layer unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDescriptor {
    pub name: String,
    pub kind: NodeKind,
    /// `None` only for input nodes.
    pub input: Option<Descriptor>,
    pub input_dim: usize,
    pub output_dim: usize,
}

impl NodeDescriptor {
    pub fn input_node(name: &str, dim: usize) -> NodeDescriptor {
        NodeDescriptor {
            name: name.to_owned(),
            kind: NodeKind::Input,
            input: None,
            input_dim: dim,
            output_dim: dim,
        }
    }

    pub fn output_node(name: &str, input: Descriptor, dim: usize) -> NodeDescriptor {
        NodeDescriptor {
            name: name.to_owned(),
            kind: NodeKind::Output,
            input: Some(input),
            input_dim: dim,
            output_dim: dim,
        }
    }

    pub fn component(
        name: impl Into<String>,
        kind: NodeKind,
        input: Descriptor,
        input_dim: usize,
        output_dim: usize,
    ) -> NodeDescriptor {
        NodeDescriptor { name: name.into(), kind, input: Some(input), input_dim, output_dim }
    }

    /// Input and output nodes are declared directly; everything else needs
    /// a component definition as well as a node.
    pub fn is_component(&self) -> bool {
        !matches!(self.kind, NodeKind::Input | NodeKind::Output)
    }
}
