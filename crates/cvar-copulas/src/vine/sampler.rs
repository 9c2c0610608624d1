//! Sampling from a fitted vine by recursive conditional inversion.
//!
//! Works for any regular vine, so the direct, central, and regular
//! topologies all share this path.  A sampling order is read off the trees
//! by peeling the top edge's conditioned variable; each variable is then
//! drawn by inverting the chain of h-functions that conditions it on the
//! variables drawn before it.

use super::{Edge, Vine};
use crate::marginal::UniformMatrix;
use cvar_core::errors::{Error, Result};
use cvar_core::Real;
use cvar_math::random_numbers::MersenneTwisterUniformRng;
use nalgebra::DMatrix;
use std::collections::{BTreeSet, HashMap};

/// Memoised conditional values F(a | S) of one joint draw, keyed by the
/// variable and its sorted conditioning set.
type CondMemo = HashMap<(usize, Vec<usize>), Real>;

pub(super) fn sample(vine: &Vine, m: usize, seed: u64) -> Result<UniformMatrix> {
    let n = vine.n_vars();
    let order = sampling_order(vine)?;
    let mut rng = MersenneTwisterUniformRng::new(seed);
    let mut out = DMatrix::<Real>::zeros(m, n);
    for row in 0..m {
        let w: Vec<Real> = (0..n).map(|_| rng.next_open01()).collect();
        let x = draw_one(vine, &order, &w)?;
        for j in 0..n {
            out[(row, j)] = x[j];
        }
    }
    UniformMatrix::new(out)
}

/// Read a valid sampling order off the trees.
///
/// The top tree has one edge; its right conditioned variable is placed last
/// and every edge conditioning on it is discarded, leaving a vine on one
/// variable fewer.  Repeating down to tree 0 yields the full order.
pub(super) fn sampling_order(vine: &Vine) -> Result<Vec<usize>> {
    let n = vine.n_vars();
    let mut active: Vec<Vec<&Edge>> = vine.trees().iter().map(|t| t.iter().collect()).collect();
    let mut order = vec![0usize; n];
    let mut first = 0usize;
    for pos in (1..n).rev() {
        let level = pos - 1;
        let edge = match active[level].as_slice() {
            [edge] => *edge,
            other => {
                return Err(Error::Runtime(format!(
                    "vine tree {level} has {} unassigned edges, expected 1",
                    other.len()
                )))
            }
        };
        let peeled = edge.right;
        order[pos] = peeled;
        first = edge.left;
        for tree in active.iter_mut() {
            tree.retain(|e| e.left != peeled && e.right != peeled);
        }
    }
    order[0] = first;
    Ok(order)
}

fn draw_one(vine: &Vine, order: &[usize], w: &[Real]) -> Result<Vec<Real>> {
    let n = order.len();
    let mut x = vec![0.0; n];
    let mut memo = CondMemo::new();
    x[order[0]] = w[0];
    for i in 1..n {
        let z = order[i];
        let mut t = w[i];
        let mut set: BTreeSet<usize> = order[..i].iter().copied().collect();
        // Invert F(z | drawn vars) one conditioning variable at a time,
        // from the deepest tree down to tree 0.
        for level in (0..i).rev() {
            let edge = find_edge(vine, level, z, &set)?;
            let partner = if edge.left == z { edge.right } else { edge.left };
            let inner: BTreeSet<usize> = edge.conditioning.iter().copied().collect();
            let v = cond_value(vine, partner, &inner, &x, &mut memo)?;
            t = edge.copula.h_inverse(t, v)?;
            set = inner;
        }
        x[z] = t;
    }
    Ok(x)
}

/// The conditional value F(a | s) for a partially drawn vector `x`.
fn cond_value(
    vine: &Vine,
    a: usize,
    s: &BTreeSet<usize>,
    x: &[Real],
    memo: &mut CondMemo,
) -> Result<Real> {
    if s.is_empty() {
        return Ok(x[a]);
    }
    let key = (a, s.iter().copied().collect::<Vec<usize>>());
    if let Some(&v) = memo.get(&key) {
        return Ok(v);
    }
    let edge = find_edge(vine, s.len() - 1, a, s)?;
    let partner = if edge.left == a { edge.right } else { edge.left };
    let inner: BTreeSet<usize> = edge.conditioning.iter().copied().collect();
    let u = cond_value(vine, a, &inner, x, memo)?;
    let v = cond_value(vine, partner, &inner, x, memo)?;
    let value = edge.copula.h(u, v);
    memo.insert(key, value);
    Ok(value)
}

/// The edge at tree `level` whose conditioned pair contains `z` and whose
/// variable set is exactly `set ∪ {z}`.  Exists for every prefix of a
/// sampling order in a valid vine.
fn find_edge<'a>(
    vine: &'a Vine,
    level: usize,
    z: usize,
    set: &BTreeSet<usize>,
) -> Result<&'a Edge> {
    let mut expected = set.clone();
    expected.insert(z);
    vine.trees()[level]
        .iter()
        .find(|e| (e.left == z || e.right == z) && e.var_set() == expected)
        .ok_or_else(|| {
            Error::Runtime(format!(
                "no tree-{level} edge conditions variable {z} on {set:?}"
            ))
        })
}
