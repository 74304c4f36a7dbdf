use std::collections::HashSet;

use crate::composition::model::{OverlayDef, SLIDE_LAYER_ID};

/// One entry of a slide's validated bottom-to-top draw order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
    /// The slide visual (with its Ken Burns motion).
    Slide,
    /// Index into the slide's overlay list.
    Overlay(usize),
}

/// Turn an authored layer order into a draw list holding [`Layer::Slide`] exactly once and every
/// overlay exactly once.
///
/// Unknown ids and repeats are dropped. Without the slide marker the visual goes to the bottom;
/// overlays missing from the order are appended on top in declaration order.
pub fn normalize_layer_order(order: &[String], overlays: &[OverlayDef]) -> Vec<Layer> {
    let mut out = Vec::with_capacity(overlays.len() + 1);
    let mut seen = HashSet::with_capacity(overlays.len() + 1);

    for id in order {
        let layer = if id == SLIDE_LAYER_ID {
            Some(Layer::Slide)
        } else {
            overlays.iter().position(|o| &o.id == id).map(Layer::Overlay)
        };
        match layer {
            Some(layer) if seen.insert(layer) => out.push(layer),
            Some(_) => {}
            None => tracing::debug!(id = %id, "dropping unknown layer id"),
        }
    }

    if seen.insert(Layer::Slide) {
        out.insert(0, Layer::Slide);
    }
    for idx in 0..overlays.len() {
        if seen.insert(Layer::Overlay(idx)) {
            out.push(Layer::Overlay(idx));
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/composition/layers.rs"]
mod tests;
