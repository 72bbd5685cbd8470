//! 2D KD-tree over axis aligned boxes.

use super::error::{Error, Result};
use super::types::*;
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox2D {
    pub lower: Point2d,
    pub upper: Point2d,
}

impl BoundingBox2D {
    /// A box containing nothing; the identity of `union`.
    pub fn empty() -> BoundingBox2D {
        BoundingBox2D {
            lower: Point2d::new(f64::INFINITY, f64::INFINITY),
            upper: Point2d::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points(points: &[Point2d]) -> BoundingBox2D {
        points.iter().fold(BoundingBox2D::empty(), |bb, &p| bb.extend(p))
    }

    pub fn extend(self, p: Point2d) -> BoundingBox2D {
        BoundingBox2D {
            lower: Point2d::new(self.lower.x.min(p.x), self.lower.y.min(p.y)),
            upper: Point2d::new(self.upper.x.max(p.x), self.upper.y.max(p.y)),
        }
    }

    pub fn union(self, other: BoundingBox2D) -> BoundingBox2D {
        self.extend(other.lower).extend(other.upper)
    }

    /// Grows the box by `padding` on every side.
    pub fn pad(self, padding: f64) -> BoundingBox2D {
        BoundingBox2D {
            lower: self.lower - Point2d::broadcast(padding),
            upper: self.upper + Point2d::broadcast(padding),
        }
    }

    pub fn extent(&self, axis: Axis) -> f64 {
        axis.of(self.upper) - axis.of(self.lower)
    }

    pub fn largest_extent(&self) -> f64 {
        self.extent(Axis::X).max(self.extent(Axis::Y))
    }

    pub fn area(&self) -> f64 {
        self.extent(Axis::X).max(0.) * self.extent(Axis::Y).max(0.)
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: Point2d) -> bool {
        p.x >= self.lower.x && p.x <= self.upper.x && p.y >= self.lower.y && p.y <= self.upper.y
    }

    fn with_lower(mut self, axis: Axis, v: f64) -> BoundingBox2D {
        match axis {
            Axis::X => self.lower.x = v,
            Axis::Y => self.lower.y = v,
        }
        self
    }

    fn with_upper(mut self, axis: Axis, v: f64) -> BoundingBox2D {
        match axis {
            Axis::X => self.upper.x = v,
            Axis::Y => self.upper.y = v,
        }
        self
    }
}

/// Build parameters of a [`KdTree2D`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KdTreeCreateInfo {
    /// Depth cap; derived from the item count when `None`.
    pub max_depth: Option<usize>,
    /// Nodes with at most this many items are never split.
    pub min_items: usize,
    /// Cost of visiting a branch node.
    pub traversal_cost: f64,
    /// Cost of testing one item.
    pub hit_cost: f64,
    /// Fraction of the cost waived for splits that leave one side empty.
    pub empty_bonus: f64,
}

impl Default for KdTreeCreateInfo {
    fn default() -> KdTreeCreateInfo {
        KdTreeCreateInfo {
            max_depth: None,
            min_items: 1,
            traversal_cost: 1.,
            hit_cost: 80.,
            empty_bonus: 0.2,
        }
    }
}

impl KdTreeCreateInfo {
    pub fn validate(&self) -> Result<()> {
        if self.min_items < 1 {
            return Err(Error::config("minimum leaf item count must be at least 1"));
        }
        if !(self.traversal_cost > 0.) || !self.traversal_cost.is_finite() {
            return Err(Error::config("traversal cost must be a positive number"));
        }
        if !(self.hit_cost > 0.) || !self.hit_cost.is_finite() {
            return Err(Error::config("hit cost must be a positive number"));
        }
        if !(0. ..1.).contains(&self.empty_bonus) {
            return Err(Error::config("empty bonus must be in [0, 1)"));
        }
        Ok(())
    }

    fn depth_cap(&self, items: usize) -> usize {
        self.max_depth
            .unwrap_or_else(|| (8. + 1.3 * (items.max(1) as f64).log2()).ceil() as usize)
    }
}

#[derive(Clone, Copy, Debug)]
enum KdNode {
    Branch {
        axis: Axis,
        split: f64,
        lower: usize,
        upper: usize,
    },
    /// Range into `KdTree2D::items`.
    Leaf { start: usize, end: usize },
}

#[derive(Clone, Copy)]
struct Edge {
    value: f64,
    is_upper: bool,
}

struct Split {
    axis: Axis,
    value: f64,
    cost: f64,
}

/// Space partitioning tree over item boxes. Items are identified by their
/// index in the slice passed to [`KdTree2D::build`]; items straddling a split
/// are stored in both children, so a point query visits a single leaf.
#[derive(Clone, Debug)]
pub struct KdTree2D {
    nodes: Vec<KdNode>,
    items: Vec<usize>,
    bounds: BoundingBox2D,
    depth: usize,
}

impl KdTree2D {
    #[tracing::instrument(skip_all, fields(items = boxes.len()))]
    pub fn build(boxes: &[BoundingBox2D], info: &KdTreeCreateInfo) -> Result<KdTree2D> {
        info.validate()?;
        let bounds = boxes
            .iter()
            .fold(BoundingBox2D::empty(), |bb, b| bb.union(*b));
        let mut tree = KdTree2D {
            nodes: Vec::new(),
            items: Vec::new(),
            bounds,
            depth: 0,
        };
        let builder = Builder {
            boxes,
            info,
            max_depth: info.depth_cap(boxes.len()),
        };
        builder.build(&mut tree, (0..boxes.len()).collect(), bounds, 0);
        tracing::debug!(
            nodes = tree.nodes.len(),
            references = tree.items.len(),
            depth = tree.depth,
            "kd-tree built"
        );
        Ok(tree)
    }

    pub fn bounds(&self) -> BoundingBox2D {
        self.bounds
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Item ids of the leaf containing `p`, in storage order. Empty when `p`
    /// lies outside the tree bounds. A box that touches `p` only with the face
    /// lying on a split plane may be missing; every box containing `p` in its
    /// interior is present.
    pub fn leaf_items(&self, p: Point2d) -> &[usize] {
        if self.nodes.is_empty() || !self.bounds.contains(p) {
            return &[];
        }
        let mut node = 0;
        loop {
            match self.nodes[node] {
                KdNode::Branch {
                    axis,
                    split,
                    lower,
                    upper,
                } => node = if axis.of(p) < split { lower } else { upper },
                KdNode::Leaf { start, end } => return &self.items[start..end],
            }
        }
    }

    /// Runs `test` on the candidate items for `p` and returns the first
    /// result that is `Some`.
    pub fn find_map<T>(&self, p: Point2d, test: impl FnMut(usize) -> Option<T>) -> Option<T> {
        self.leaf_items(p).iter().copied().find_map(test)
    }
}

struct Builder<'a> {
    boxes: &'a [BoundingBox2D],
    info: &'a KdTreeCreateInfo,
    max_depth: usize,
}

impl<'a> Builder<'a> {
    fn build(&self, tree: &mut KdTree2D, items: Vec<usize>, bounds: BoundingBox2D, depth: usize) -> usize {
        tree.depth = tree.depth.max(depth);
        let split = if items.len() <= self.info.min_items || depth >= self.max_depth {
            None
        } else {
            self.best_split(&items, bounds)
        };
        let split = match split {
            Some(s) => s,
            None => return self.leaf(tree, &items),
        };

        let (lower_items, upper_items): (Vec<usize>, Vec<usize>) = (
            items
                .iter()
                .copied()
                .filter(|&i| split.axis.of(self.boxes[i].lower) < split.value)
                .collect(),
            items
                .iter()
                .copied()
                .filter(|&i| split.axis.of(self.boxes[i].upper) > split.value)
                .collect(),
        );
        drop(items);

        let node = tree.nodes.len();
        tree.nodes.push(KdNode::Leaf { start: 0, end: 0 });
        let lower = self.build(
            tree,
            lower_items,
            bounds.with_upper(split.axis, split.value),
            depth + 1,
        );
        let upper = self.build(
            tree,
            upper_items,
            bounds.with_lower(split.axis, split.value),
            depth + 1,
        );
        tree.nodes[node] = KdNode::Branch {
            axis: split.axis,
            split: split.value,
            lower,
            upper,
        };
        node
    }

    fn leaf(&self, tree: &mut KdTree2D, items: &[usize]) -> usize {
        let start = tree.items.len();
        tree.items.extend_from_slice(items);
        tree.nodes.push(KdNode::Leaf {
            start,
            end: tree.items.len(),
        });
        tree.nodes.len() - 1
    }

    /// Cheapest split of `items` by the area heuristic, if any is cheaper
    /// than testing every item.
    fn best_split(&self, items: &[usize], bounds: BoundingBox2D) -> Option<Split> {
        let total_area = bounds.area();
        if !(total_area > 0.) {
            return None;
        }
        let n = items.len();
        let mut best: Option<Split> = None;
        let mut best_cost = self.info.hit_cost * n as f64;

        for &axis in Axis::ALL.iter() {
            let mut edges: Vec<Edge> = items
                .iter()
                .flat_map(|&i| {
                    let b = &self.boxes[i];
                    [
                        Edge {
                            value: axis.of(b.lower),
                            is_upper: false,
                        },
                        Edge {
                            value: axis.of(b.upper),
                            is_upper: true,
                        },
                    ]
                })
                .collect();
            // Upper edges first on ties: an item ending at the split belongs
            // to the lower side only.
            edges.sort_by(|a, b| {
                a.value
                    .partial_cmp(&b.value)
                    .unwrap_or(Ordering::Equal)
                    .then(b.is_upper.cmp(&a.is_upper))
            });

            let lo = axis.of(bounds.lower);
            let hi = axis.of(bounds.upper);
            let other = match axis {
                Axis::X => bounds.extent(Axis::Y),
                Axis::Y => bounds.extent(Axis::X),
            };
            let mut lower_count = 0;
            let mut upper_count = n;
            for edge in edges.iter() {
                if edge.is_upper {
                    upper_count -= 1;
                }
                if edge.value > lo && edge.value < hi {
                    let lower_area = (edge.value - lo) * other;
                    let upper_area = (hi - edge.value) * other;
                    let mut cost = self.info.traversal_cost
                        + self.info.hit_cost
                            * (lower_count as f64 * lower_area + upper_count as f64 * upper_area)
                            / total_area;
                    if lower_count == 0 || upper_count == 0 {
                        cost *= 1. - self.info.empty_bonus;
                    }
                    if cost < best_cost {
                        best_cost = cost;
                        best = Some(Split {
                            axis,
                            value: edge.value,
                            cost,
                        });
                    }
                }
                if !edge.is_upper {
                    lower_count += 1;
                }
            }
        }
        if let Some(s) = &best {
            tracing::trace!(axis = ?s.axis, split = s.value, cost = s.cost, items = n, "split");
        }
        best
    }
}
