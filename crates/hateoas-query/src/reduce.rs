//! Result reducer: flattens fan-out nesting into a single sequence.

use crate::types::{Hit, Outcome, Traversal};

/// Collapse a raw traversal into an [`Outcome`].
///
/// Branches are concatenated in branch order, nested branches included;
/// pruned branches vanish. Single nodes and absent results pass through.
pub fn reduce(raw: Traversal) -> Outcome {
    match raw {
        Traversal::Absent => Outcome::Absent,
        Traversal::Node(hit) => Outcome::One(hit),
        Traversal::Branches(branches) => {
            Outcome::Many(branches.into_iter().fold(Vec::new(), concat))
        }
    }
}

fn concat(mut acc: Vec<Hit>, branch: Traversal) -> Vec<Hit> {
    match branch {
        Traversal::Absent => acc,
        Traversal::Node(hit) => {
            acc.push(hit);
            acc
        }
        Traversal::Branches(nested) => nested.into_iter().fold(acc, concat),
    }
}
