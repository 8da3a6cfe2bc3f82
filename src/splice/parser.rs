use crate::error::{Result, TopologyError};
use crate::splice::layer_spec::{LayerSpec, SpliceSpec};

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Parses a `--splice-indexes` value such as
/// `"-3,-2,-1,0,1,2,3 -3,0:-3 -3,0:-3 -6,-3,0:-6,-3"`.
///
/// Each whitespace-separated field describes one hidden layer: a
/// comma-separated splice list, optionally followed by `:` and a
/// comma-separated recurrence list.
///
/// # Errors
/// - `MalformedSpecification` — fewer than two layers, a colon on the first
///   layer, more than one colon in a field, an empty recurrence list after a
///   colon, or an offset that is not a signed decimal integer
/// - `OrderingViolation`      — a splice list is not strictly ascending
/// - `SignViolation`          — a recurrence list contains zero or mixes signs
pub fn parse_splice_indexes(spec: &str) -> Result<SpliceSpec> {
    let fields: Vec<&str> = spec.split_whitespace().collect();
    if fields.len() < 2 {
        return Err(malformed(spec, "too short, at least 2 layers are required"));
    }

    let mut layers = Vec::with_capacity(fields.len());
    for (index, field) in fields.iter().enumerate() {
        layers.push(parse_layer(spec, index, field)?);
    }

    let parsed = SpliceSpec::from_layers(layers);
    log::info!("splice_array is: {:?}", parsed.splice_array());
    log::info!("recurrence_array is: {:?}", parsed.recurrence_array());
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Per-field parsing
// ---------------------------------------------------------------------------

fn parse_layer(spec: &str, index: usize, field: &str) -> Result<LayerSpec> {
    let mut parts = field.split(':');
    let splice_part = parts.next().unwrap_or("");
    let recurrence_part = parts.next();
    if parts.next().is_some() {
        return Err(malformed(spec, &format!("field {field:?} has more than one ':'")));
    }
    if index == 0 && recurrence_part.is_some() {
        return Err(malformed(
            spec,
            &format!("recurrence is not allowed on the first layer ({field:?})"),
        ));
    }

    let splice_offsets = parse_offsets(spec, field, splice_part)?;
    if !is_strictly_ascending(&splice_offsets) {
        return Err(TopologyError::OrderingViolation {
            spec: spec.to_owned(),
            field: field.to_owned(),
        });
    }

    let recurrence_offsets = match recurrence_part {
        Some(part) => {
            let offsets = parse_offsets(spec, field, part)?;
            if !is_single_signed(&offsets) {
                return Err(TopologyError::SignViolation {
                    spec: spec.to_owned(),
                    field: field.to_owned(),
                });
            }
            offsets
        }
        None => Vec::new(),
    };

    Ok(LayerSpec { splice_offsets, recurrence_offsets })
}

/// Parses a comma-separated list. An empty list is a parse failure, matching
/// the behaviour for any other non-integer element.
fn parse_offsets(spec: &str, field: &str, list: &str) -> Result<Vec<i32>> {
    list.split(',')
        .map(|item| {
            item.parse::<i32>().map_err(|e| {
                malformed(spec, &format!("cannot parse {item:?} in field {field:?}: {e}"))
            })
        })
        .collect()
}

fn is_strictly_ascending(offsets: &[i32]) -> bool {
    offsets.windows(2).all(|w| w[0] < w[1])
}

/// True when no element is zero and all elements share the sign of the first.
fn is_single_signed(offsets: &[i32]) -> bool {
    match offsets.first() {
        Some(&first) if first != 0 => offsets.iter().all(|&o| o.signum() == first.signum()),
        _ => false,
    }
}

fn malformed(spec: &str, reason: &str) -> TopologyError {
    TopologyError::MalformedSpecification {
        spec: spec.to_owned(),
        reason: reason.to_owned(),
    }
}
