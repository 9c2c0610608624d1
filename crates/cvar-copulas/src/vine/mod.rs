//! Vine copulas.
//!
//! A vine factorises an n-variate copula into n−1 trees of bivariate pair
//! copulas.  Tree 0 connects the raw variables; tree k connects the edges of
//! tree k−1, each new pair conditioned on the variables the two parent edges
//! share.  Three topologies are supported: direct (D-vine path), central
//! (C-vine star), and regular (R-vine, maximum spanning tree on |τ|).

mod sampler;

use crate::bivariate::{select_family, PairCopula};
use crate::marginal::UniformMatrix;
use cvar_core::config::VineTopology;
use cvar_core::errors::{Error, Result};
use cvar_core::Real;
use cvar_math::statistics::kendall_tau;
use std::collections::BTreeSet;

/// One pair copula of a vine: the conditioned pair `(left, right)` given the
/// `conditioning` variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// First conditioned variable.
    pub left: usize,
    /// Second conditioned variable.
    pub right: usize,
    /// Conditioning variables, sorted ascending.  Empty in tree 0.
    pub conditioning: Vec<usize>,
    /// The fitted bivariate copula of the conditioned pair.
    pub copula: PairCopula,
}

impl Edge {
    /// All variables this edge involves.
    pub fn var_set(&self) -> BTreeSet<usize> {
        let mut s: BTreeSet<usize> = self.conditioning.iter().copied().collect();
        s.insert(self.left);
        s.insert(self.right);
        s
    }
}

/// A fitted vine copula.
#[derive(Debug, Clone, PartialEq)]
pub struct Vine {
    n_vars: usize,
    topology: VineTopology,
    trees: Vec<Vec<Edge>>,
}

/// A node available for joining at the next tree level: one edge of the
/// current tree together with its conditional pseudo-observations.
struct BuildNode {
    left: usize,
    right: usize,
    var_set: BTreeSet<usize>,
    /// F(left | var_set ∖ {left}) per observation.
    cond_left: Vec<Real>,
    /// F(right | var_set ∖ {right}) per observation.
    cond_right: Vec<Real>,
}

impl BuildNode {
    /// Pseudo-observations of conditioned variable `v`.
    fn pseudo(&self, v: usize) -> &[Real] {
        if v == self.left {
            &self.cond_left
        } else {
            &self.cond_right
        }
    }
}

impl Vine {
    /// Fit a vine of the given topology to uniform-margin observations.
    pub fn fit(uniforms: &UniformMatrix, topology: VineTopology) -> Result<Self> {
        let n = uniforms.n_vars();
        if n < 3 {
            return Err(Error::InsufficientVariables { variables: n });
        }

        let mut trees: Vec<Vec<Edge>> = Vec::with_capacity(n - 1);
        let mut nodes = first_tree(uniforms, topology, &mut trees)?;
        while nodes.len() > 1 {
            let level = trees.len();
            nodes = next_tree(&nodes, topology, level, &mut trees)?;
        }

        Ok(Self {
            n_vars: n,
            topology,
            trees,
        })
    }

    /// Number of variables.
    pub fn n_vars(&self) -> usize {
        self.n_vars
    }

    /// The topology the vine was built with.
    pub fn topology(&self) -> VineTopology {
        self.topology
    }

    /// The fitted trees; tree k holds `n − 1 − k` edges.
    pub fn trees(&self) -> &[Vec<Edge>] {
        &self.trees
    }

    /// Draw `m` rows of dependent uniforms, reproducible per seed.
    pub fn sample(&self, m: usize, seed: u64) -> Result<UniformMatrix> {
        sampler::sample(self, m, seed)
    }
}

// ── Tree construction ─────────────────────────────────────────────────────────

/// Build tree 0 on the raw variables and return its edges as join nodes.
fn first_tree(
    uniforms: &UniformMatrix,
    topology: VineTopology,
    trees: &mut Vec<Vec<Edge>>,
) -> Result<Vec<BuildNode>> {
    let n = uniforms.n_vars();
    let columns: Vec<Vec<Real>> = (0..n).map(|j| uniforms.column(j)).collect();

    let pairs: Vec<(usize, usize)> = match topology {
        VineTopology::Direct => (0..n - 1).map(|i| (i, i + 1)).collect(),
        VineTopology::Central => {
            let root = star_root(n, |i, j| Some(kendall_tau(&columns[i], &columns[j]).abs()));
            (0..n).filter(|&j| j != root).map(|j| (root, j)).collect()
        }
        VineTopology::Regular => maximum_spanning_tree(n, 0, |i, j| {
            Some(kendall_tau(&columns[i], &columns[j]).abs())
        })?,
    };

    let mut edges = Vec::with_capacity(pairs.len());
    let mut nodes = Vec::with_capacity(pairs.len());
    for (i, j) in pairs {
        let obs: Vec<(Real, Real)> = columns[i]
            .iter()
            .zip(&columns[j])
            .map(|(&u, &v)| (u, v))
            .collect();
        let copula = select_family(&obs, (i, j))?;
        let cond_left: Vec<Real> = obs.iter().map(|&(u, v)| copula.h(u, v)).collect();
        let cond_right: Vec<Real> = obs.iter().map(|&(u, v)| copula.h(v, u)).collect();
        nodes.push(BuildNode {
            left: i,
            right: j,
            var_set: [i, j].into_iter().collect(),
            cond_left,
            cond_right,
        });
        edges.push(Edge {
            left: i,
            right: j,
            conditioning: Vec::new(),
            copula,
        });
    }
    trees.push(edges);
    Ok(nodes)
}

/// Build tree `level` on the nodes of the previous tree.
fn next_tree(
    nodes: &[BuildNode],
    topology: VineTopology,
    level: usize,
    trees: &mut Vec<Vec<Edge>>,
) -> Result<Vec<BuildNode>> {
    let p = nodes.len();
    let weight = |a: usize, b: usize| -> Option<Real> {
        let (x, y) = conditioned_pair(&nodes[a], &nodes[b])?;
        Some(kendall_tau(nodes[a].pseudo(x), nodes[b].pseudo(y)).abs())
    };

    let joins: Vec<(usize, usize)> = match topology {
        VineTopology::Central => {
            let root = star_root(p, &weight);
            let mut js = Vec::with_capacity(p - 1);
            for b in 0..p {
                if b == root {
                    continue;
                }
                if weight(root, b).is_none() {
                    return Err(Error::ProximityViolation {
                        tree: level,
                        nodes: p,
                    });
                }
                js.push((root, b));
            }
            js
        }
        VineTopology::Direct | VineTopology::Regular => {
            maximum_spanning_tree(p, level, weight)?
        }
    };

    let mut edges = Vec::with_capacity(joins.len());
    let mut next = Vec::with_capacity(joins.len());
    for (a, b) in joins {
        let (x, y) = conditioned_pair(&nodes[a], &nodes[b]).ok_or(Error::ProximityViolation {
            tree: level,
            nodes: p,
        })?;
        let px = nodes[a].pseudo(x);
        let py = nodes[b].pseudo(y);
        let obs: Vec<(Real, Real)> = px.iter().zip(py).map(|(&u, &v)| (u, v)).collect();
        let copula = select_family(&obs, (x, y))?;

        let conditioning: Vec<usize> = nodes[a]
            .var_set
            .intersection(&nodes[b].var_set)
            .copied()
            .collect();
        let var_set: BTreeSet<usize> = nodes[a].var_set.union(&nodes[b].var_set).copied().collect();
        let cond_left: Vec<Real> = obs.iter().map(|&(u, v)| copula.h(u, v)).collect();
        let cond_right: Vec<Real> = obs.iter().map(|&(u, v)| copula.h(v, u)).collect();
        next.push(BuildNode {
            left: x,
            right: y,
            var_set,
            cond_left,
            cond_right,
        });
        edges.push(Edge {
            left: x,
            right: y,
            conditioning,
            copula,
        });
    }
    trees.push(edges);
    Ok(next)
}

/// The proximity condition: two nodes may be joined iff each one's variable
/// set exceeds the other's by exactly one element, and that element is one of
/// the node's own conditioned variables.  Returns the new conditioned pair.
fn conditioned_pair(a: &BuildNode, b: &BuildNode) -> Option<(usize, usize)> {
    let mut only_a = a.var_set.difference(&b.var_set);
    let x = *only_a.next()?;
    if only_a.next().is_some() {
        return None;
    }
    let mut only_b = b.var_set.difference(&a.var_set);
    let y = *only_b.next()?;
    if only_b.next().is_some() {
        return None;
    }
    if (x == a.left || x == a.right) && (y == b.left || y == b.right) {
        Some((x, y))
    } else {
        None
    }
}

/// Node with the largest total |τ| to its allowed partners.
fn star_root<W>(p: usize, weight: W) -> usize
where
    W: Fn(usize, usize) -> Option<Real>,
{
    let mut root = 0;
    let mut best = Real::NEG_INFINITY;
    for i in 0..p {
        let total: Real = (0..p)
            .filter(|&j| j != i)
            .filter_map(|j| weight(i, j))
            .sum();
        if total > best {
            best = total;
            root = i;
        }
    }
    root
}

/// Prim's algorithm for the maximum spanning tree of a weighted graph;
/// `weight` returning `None` marks a forbidden pair.
fn maximum_spanning_tree<W>(p: usize, level: usize, weight: W) -> Result<Vec<(usize, usize)>>
where
    W: Fn(usize, usize) -> Option<Real>,
{
    let mut in_tree = vec![false; p];
    in_tree[0] = true;
    let mut edges = Vec::with_capacity(p.saturating_sub(1));
    for _ in 1..p {
        let mut best: Option<(usize, usize, Real)> = None;
        for a in 0..p {
            if !in_tree[a] {
                continue;
            }
            for b in 0..p {
                if in_tree[b] {
                    continue;
                }
                if let Some(w) = weight(a, b) {
                    if best.map_or(true, |(_, _, bw)| w > bw) {
                        best = Some((a, b, w));
                    }
                }
            }
        }
        match best {
            Some((a, b, _)) => {
                in_tree[b] = true;
                edges.push((a, b));
            }
            None => {
                return Err(Error::ProximityViolation {
                    tree: level,
                    nodes: p,
                })
            }
        }
    }
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaussian::GaussianCopula;
    use nalgebra::DMatrix;

    fn correlated_uniforms(n_vars: usize, rho: Real, rows: usize, seed: u64) -> UniformMatrix {
        let corr = DMatrix::from_fn(n_vars, n_vars, |i, j| if i == j { 1.0 } else { rho });
        GaussianCopula::from_correlation(corr)
            .unwrap()
            .sample(rows, seed)
            .unwrap()
    }

    #[test]
    fn tree_sizes_decrease_by_one() {
        let u = correlated_uniforms(4, 0.5, 600, 3);
        for topology in [
            VineTopology::Direct,
            VineTopology::Central,
            VineTopology::Regular,
        ] {
            let vine = Vine::fit(&u, topology).unwrap();
            let sizes: Vec<usize> = vine.trees().iter().map(Vec::len).collect();
            assert_eq!(sizes, vec![3, 2, 1], "{topology:?}");
        }
    }

    #[test]
    fn direct_tree0_is_the_natural_path() {
        let u = correlated_uniforms(4, 0.4, 400, 9);
        let vine = Vine::fit(&u, VineTopology::Direct).unwrap();
        let pairs: Vec<(usize, usize)> = vine.trees()[0]
            .iter()
            .map(|e| (e.left, e.right))
            .collect();
        assert_eq!(pairs, vec![(0, 1), (1, 2), (2, 3)]);
        assert!(vine.trees()[0].iter().all(|e| e.conditioning.is_empty()));
    }

    #[test]
    fn central_tree0_is_a_star() {
        let u = correlated_uniforms(5, 0.5, 400, 17);
        let vine = Vine::fit(&u, VineTopology::Central).unwrap();
        let root = vine.trees()[0][0].left;
        assert!(vine.trees()[0].iter().all(|e| e.left == root));
        let others: BTreeSet<usize> = vine.trees()[0].iter().map(|e| e.right).collect();
        assert_eq!(others.len(), 4);
        assert!(!others.contains(&root));
    }

    #[test]
    fn conditioning_sets_grow_with_tree_level() {
        let u = correlated_uniforms(4, 0.5, 500, 23);
        let vine = Vine::fit(&u, VineTopology::Regular).unwrap();
        for (level, tree) in vine.trees().iter().enumerate() {
            for edge in tree {
                assert_eq!(edge.conditioning.len(), level);
                assert_eq!(edge.var_set().len(), level + 2);
                assert!(!edge.conditioning.contains(&edge.left));
                assert!(!edge.conditioning.contains(&edge.right));
            }
        }
    }

    #[test]
    fn every_unordered_pair_appears_exactly_once() {
        let u = correlated_uniforms(5, 0.4, 500, 41);
        for topology in [
            VineTopology::Direct,
            VineTopology::Central,
            VineTopology::Regular,
        ] {
            let vine = Vine::fit(&u, topology).unwrap();
            let mut pairs: Vec<(usize, usize)> = vine
                .trees()
                .iter()
                .flatten()
                .map(|e| (e.left.min(e.right), e.left.max(e.right)))
                .collect();
            pairs.sort_unstable();
            let expected: Vec<(usize, usize)> = (0..5)
                .flat_map(|i| ((i + 1)..5).map(move |j| (i, j)))
                .collect();
            assert_eq!(pairs, expected, "{topology:?}");
        }
    }

    #[test]
    fn two_variables_are_rejected() {
        let u = correlated_uniforms(2, 0.5, 100, 1);
        assert!(matches!(
            Vine::fit(&u, VineTopology::Direct),
            Err(Error::InsufficientVariables { variables: 2 })
        ));
    }

    #[test]
    fn conditioned_pair_respects_proximity() {
        let a = BuildNode {
            left: 0,
            right: 1,
            var_set: [0, 1].into_iter().collect(),
            cond_left: vec![],
            cond_right: vec![],
        };
        let b = BuildNode {
            left: 1,
            right: 2,
            var_set: [1, 2].into_iter().collect(),
            cond_left: vec![],
            cond_right: vec![],
        };
        let c = BuildNode {
            left: 2,
            right: 3,
            var_set: [2, 3].into_iter().collect(),
            cond_left: vec![],
            cond_right: vec![],
        };
        assert_eq!(conditioned_pair(&a, &b), Some((0, 2)));
        // a and c share no variable
        assert_eq!(conditioned_pair(&a, &c), None);
    }

    #[test]
    fn prim_picks_heaviest_edges() {
        // complete graph on 3 nodes, weights 0-1: 0.9, 0-2: 0.1, 1-2: 0.8
        let w = |a: usize, b: usize| -> Option<Real> {
            match (a.min(b), a.max(b)) {
                (0, 1) => Some(0.9),
                (0, 2) => Some(0.1),
                (1, 2) => Some(0.8),
                _ => None,
            }
        };
        let edges = maximum_spanning_tree(3, 0, w).unwrap();
        let mut pairs: Vec<(usize, usize)> =
            edges.iter().map(|&(a, b)| (a.min(b), a.max(b))).collect();
        pairs.sort_unstable();
        assert_eq!(pairs, vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn disconnected_graph_is_a_proximity_violation() {
        let w = |a: usize, b: usize| -> Option<Real> {
            if (a < 2) == (b < 2) {
                Some(1.0)
            } else {
                None
            }
        };
        assert!(matches!(
            maximum_spanning_tree(4, 2, w),
            Err(Error::ProximityViolation { tree: 2, nodes: 4 })
        ));
    }
}
