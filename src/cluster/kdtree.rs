//! Static 2-D K-D tree over projected coordinates
//!
//! This code is heavily based on <https://godoc.org/code.google.com/p/eaburns/kdtree>
//!
//! Original code is under New BSD License.
//! Author: Ethan Burns <burns.ethan@gmail.com>

/// A planar coordinate `[x, y]`
pub type Planar = [f64; 2];

/// K-D tree for radius and box queries
///
/// Points are separated from nodes. Nodes hold only indices into the points slice.
/// The tree is immutable once built.
#[derive(Debug)]
pub struct KDTree {
    /// All points in the tree
    pub points: Vec<Planar>,
    root: Option<Box<KDTreeNode>>,
}

/// A node in the K-D tree
#[derive(Debug)]
struct KDTreeNode {
    /// Index of the point associated with this node
    point_id: usize,
    /// Indices of points equal to this node's point
    equal_ids: Vec<usize>,

    split: usize,
    left: Option<Box<KDTreeNode>>,
    right: Option<Box<KDTreeNode>>,
}

#[inline(always)]
fn sq_dist(a: &Planar, b: &Planar) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

impl KDTree {
    /// Finds all points within distance `r` (inclusive) of `pt`
    ///
    /// To avoid allocation, the `nodes` vector can be pre-allocated with a larger
    /// capacity and re-used across multiple calls.
    pub fn within(&self, pt: &Planar, r: f64, mut nodes: Vec<usize>) -> Vec<usize> {
        if r < 0.0 {
            return nodes;
        }
        self.within_recursive(self.root.as_deref(), pt, r, &mut nodes);
        nodes
    }

    fn within_recursive(
        &self,
        t: Option<&KDTreeNode>,
        pt: &Planar,
        r: f64,
        nodes: &mut Vec<usize>,
    ) {
        let Some(t) = t else {
            return;
        };

        let diff = pt[t.split] - self.points[t.point_id][t.split];

        let (this_side, other_side) = if diff < 0.0 {
            (t.left.as_deref(), t.right.as_deref())
        } else {
            (t.right.as_deref(), t.left.as_deref())
        };

        self.within_recursive(this_side, pt, r, nodes);
        // the splitting line is within reach, so the node and the far side may be too
        if diff.abs() <= r {
            if sq_dist(&self.points[t.point_id], pt) <= r * r {
                nodes.push(t.point_id);
                nodes.extend_from_slice(&t.equal_ids);
            }
            self.within_recursive(other_side, pt, r, nodes);
        }
    }

    /// Finds all points inside the closed box `[min, max]`
    pub fn range(&self, min: &Planar, max: &Planar) -> Vec<usize> {
        let mut nodes = Vec::new();
        self.range_recursive(self.root.as_deref(), min, max, &mut nodes);
        nodes
    }

    fn range_recursive(
        &self,
        t: Option<&KDTreeNode>,
        min: &Planar,
        max: &Planar,
        nodes: &mut Vec<usize>,
    ) {
        let Some(t) = t else {
            return;
        };

        let p = &self.points[t.point_id];
        if p[0] >= min[0] && p[0] <= max[0] && p[1] >= min[1] && p[1] <= max[1] {
            nodes.push(t.point_id);
            nodes.extend_from_slice(&t.equal_ids);
        }

        let pivot = p[t.split];
        if min[t.split] < pivot {
            self.range_recursive(t.left.as_deref(), min, max, nodes);
        }
        if max[t.split] >= pivot {
            self.range_recursive(t.right.as_deref(), min, max, nodes);
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the height of the K-D tree
    pub fn height(&self) -> usize {
        self.root.as_ref().map_or(0, |r| r.height())
    }
}

impl KDTreeNode {
    fn height(&self) -> usize {
        let ht = self.left.as_ref().map_or(0, |l| l.height());
        let rht = self.right.as_ref().map_or(0, |r| r.height());
        ht.max(rht) + 1
    }
}

/// Creates a new K-D tree built from the given points
pub fn new_kd_tree(points: Vec<Planar>) -> KDTree {
    let root = if points.is_empty() {
        None
    } else {
        build_tree(0, &pre_sort(&points))
    };

    KDTree { points, root }
}

/// Builds a tree node by finding the median point and recursively building left and right subtrees
fn build_tree(depth: usize, nodes: &PreSorted<'_>) -> Option<Box<KDTreeNode>> {
    let split = depth % 2;
    match nodes.cur[split].len() {
        0 => None,
        1 => Some(Box::new(KDTreeNode {
            point_id: nodes.cur[split][0],
            equal_ids: Vec::new(),
            split,
            left: None,
            right: None,
        })),
        _ => {
            let (med, equal, left, right) = nodes.split_med(split);
            Some(Box::new(KDTreeNode {
                point_id: med,
                equal_ids: equal,
                split,
                left: build_tree(depth + 1, &left),
                right: build_tree(depth + 1, &right),
            }))
        }
    }
}

/// Holds nodes pre-sorted on each dimension
struct PreSorted<'a> {
    points: &'a [Planar],
    /// Currently sorted set of point IDs by dimension
    cur: [Vec<usize>; 2],
}

/// Pre-sorts nodes on each dimension
fn pre_sort(points: &[Planar]) -> PreSorted<'_> {
    let mut p = PreSorted {
        points,
        cur: [Vec::new(), Vec::new()],
    };
    for i in 0..2 {
        p.cur[i] = (0..points.len()).collect();
        p.cur[i].sort_by(|&a, &b| {
            // ties on the split dimension are ordered by the other one
            points[a][i]
                .total_cmp(&points[b][i])
                .then_with(|| points[a][1 - i].total_cmp(&points[b][1 - i]))
        });
    }
    p
}

impl<'a> PreSorted<'a> {
    /// Returns the median node on the split dimension and two PreSorted structs
    /// that contain the nodes (still sorted on each dimension) that are less than
    /// and greater than or equal to the median node value on the given splitting dimension.
    fn split_med(&self, dim: usize) -> (usize, Vec<usize>, PreSorted<'a>, PreSorted<'a>) {
        let cur = &self.cur[dim];
        let mut m = cur.len() / 2;
        while m > 0 && self.points[cur[m - 1]][dim] == self.points[cur[m]][dim] {
            m -= 1;
        }
        let mut mh = m;
        while mh < cur.len() - 1 && self.points[cur[mh + 1]] == self.points[cur[m]] {
            mh += 1;
        }
        let med = cur[m];
        let equal = cur[m + 1..=mh].to_vec();
        let pivot = self.points[med][dim];

        let mut left = PreSorted {
            points: self.points,
            cur: [Vec::new(), Vec::new()],
        };
        left.cur[dim] = cur[..m].to_vec();

        let mut right = PreSorted {
            points: self.points,
            cur: [Vec::new(), Vec::new()],
        };
        right.cur[dim] = cur[mh + 1..].to_vec();

        let other = 1 - dim;
        left.cur[other] = Vec::with_capacity(self.cur[other].len());
        right.cur[other] = Vec::with_capacity(self.cur[other].len());

        for &n in &self.cur[other] {
            if n == med || equal.contains(&n) {
                continue;
            }
            if self.points[n][dim] < pivot {
                left.cur[other].push(n);
            } else {
                right.cur[other].push(n);
            }
        }

        (med, equal, left, right)
    }
}
