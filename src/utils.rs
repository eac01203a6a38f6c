use std::collections::VecDeque;

use petgraph::{
    graph::{Graph, NodeIndex},
    EdgeType,
};

/// Partition the nodes of `g` into connected components.
///
/// Components are listed in order of their smallest node index and the nodes
/// of each component are sorted.
pub fn connected_components<N, E, Ty>(g: &Graph<N, E, Ty>) -> Vec<Vec<NodeIndex>>
where
    Ty: EdgeType,
{
    let mut seen = vec![false; g.node_count()];
    let mut components = Vec::new();

    for start in g.node_indices() {
        if seen[start.index()] {
            continue;
        }
        seen[start.index()] = true;

        let mut component = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(v) = queue.pop_front() {
            for n in g.neighbors(v) {
                if !seen[n.index()] {
                    seen[n.index()] = true;
                    component.push(n);
                    queue.push_back(n);
                }
            }
        }
        component.sort();
        components.push(component);
    }
    components
}

/// Sum floating-point terms in ascending order so the result does not depend
/// on the order the terms were produced in.
pub fn ordered_sum(mut terms: Vec<f64>) -> f64 {
    terms.sort_by(f64::total_cmp);
    terms.into_iter().fold(0.0, |acc, t| acc + t)
}

/// Shannon entropy (in bits) of the distribution given by `counts`.
///
/// `counts` must be listed in an order that does not depend on atom labels
/// (e.g. the iteration order of a `BTreeMap` keyed by invariants).
pub fn entropy<I>(counts: I) -> f64
where
    I: IntoIterator<Item = usize>,
{
    let counts: Vec<usize> = counts.into_iter().filter(|&c| c > 0).collect();
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    // Subtracting from zero keeps a single-valued distribution at 0.0, not -0.0.
    0.0 - ordered_sum(
        counts
            .into_iter()
            .map(|c| {
                let p = c as f64 / total;
                p * p.log2()
            })
            .collect(),
    )
}
