//! 3-D KD-tree over palette colors.
//!
//! The tree serves two purposes: nearest-neighbor quantization when no
//! whole-cube table is available, and k-nearest candidate pruning for the
//! block optimizer on large palettes. Build rules are fully deterministic
//! so that serialized trees are byte-stable across runs.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::color::{Axis, ColorMethod, Rgb};

use super::error::FormatError;

/// A KD-tree node: one palette color, a split axis, and two subtrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdNode {
    color: Rgb,
    axis: Axis,
    left: Option<Box<KdNode>>,
    right: Option<Box<KdNode>>,
}

/// A balanced KD-tree over a set of palette colors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KdTree {
    root: Option<Box<KdNode>>,
}

impl KdTree {
    /// Build a tree over the given colors.
    ///
    /// Split axis at each node is the channel with the largest min-max range
    /// in the current subset; ties fall to R, then G, then B. The split
    /// point starts at the median and shifts forward past duplicate axis
    /// values so equal-valued colors never straddle the split.
    pub fn build(colors: &[Rgb]) -> Self {
        let mut points: Vec<Rgb> = colors.to_vec();
        Self {
            root: build_node(&mut points),
        }
    }

    /// Nearest color to `query` under `method`.
    ///
    /// Distance ties resolve to the lexicographically smaller color so that
    /// results do not depend on tree shape.
    pub fn nearest(&self, query: Rgb, method: &ColorMethod) -> Option<(Rgb, f64)> {
        let mut best: Option<(Rgb, f64)> = None;
        if let Some(root) = &self.root {
            nearest_recurse(root, query, method, &mut best);
        }
        best
    }

    /// The `k` nearest colors to `query` under `method`, closest first.
    ///
    /// A bounded max-heap of size `k` tracks the working set; subtrees are
    /// pruned on squared axis distance against the current worst candidate.
    pub fn k_nearest(&self, query: Rgb, k: usize, method: &ColorMethod) -> Vec<(Rgb, f64)> {
        if k == 0 {
            return Vec::new();
        }
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(k + 1);
        if let Some(root) = &self.root {
            knn_recurse(root, query, method, k, &mut heap);
        }
        let mut out: Vec<(Rgb, f64)> = heap
            .into_iter()
            .map(|e| (e.color, e.distance))
            .collect();
        out.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        out
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        fn count(node: &Option<Box<KdNode>>) -> usize {
            match node {
                Some(n) => 1 + count(&n.left) + count(&n.right),
                None => 0,
            }
        }
        count(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Serialize in pre-order: marker byte (0 = null, 1 = present), then
    /// three RGB bytes, one axis byte, left subtree, right subtree.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), FormatError> {
        fn write_node<W: Write>(node: &Option<Box<KdNode>>, w: &mut W) -> Result<(), FormatError> {
            match node {
                None => w.write_u8(0)?,
                Some(n) => {
                    w.write_u8(1)?;
                    w.write_all(&n.color.to_bytes())?;
                    w.write_u8(n.axis as u8)?;
                    write_node(&n.left, w)?;
                    write_node(&n.right, w)?;
                }
            }
            Ok(())
        }
        write_node(&self.root, w)
    }

    /// Deserialize a tree written by [`write_to`](Self::write_to).
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, FormatError> {
        fn read_node<R: Read>(r: &mut R) -> Result<Option<Box<KdNode>>, FormatError> {
            match r.read_u8()? {
                0 => Ok(None),
                1 => {
                    let mut rgb = [0u8; 3];
                    r.read_exact(&mut rgb)?;
                    let axis_byte = r.read_u8()?;
                    let axis = Axis::from_u8(axis_byte).ok_or(FormatError::BadAxis(axis_byte))?;
                    let left = read_node(r)?;
                    let right = read_node(r)?;
                    Ok(Some(Box::new(KdNode {
                        color: Rgb::from_bytes(rgb),
                        axis,
                        left,
                        right,
                    })))
                }
                m => Err(FormatError::BadNodeMarker(m)),
            }
        }
        Ok(Self {
            root: read_node(r)?,
        })
    }
}

fn build_node(points: &mut [Rgb]) -> Option<Box<KdNode>> {
    if points.is_empty() {
        return None;
    }

    let axis = widest_axis(points);
    points.sort_by(|a, b| {
        a.channel(axis)
            .cmp(&b.channel(axis))
            .then_with(|| a.cmp(b))
    });

    // Median split, shifted forward past duplicate axis values.
    let mut mid = points.len() / 2;
    while mid > 0 && mid < points.len() && points[mid].channel(axis) == points[mid - 1].channel(axis)
    {
        mid += 1;
    }
    if mid == points.len() {
        mid = points.len() - 1;
    }

    let color = points[mid];
    let (left, rest) = points.split_at_mut(mid);
    let right = &mut rest[1..];
    Some(Box::new(KdNode {
        color,
        axis,
        left: build_node(left),
        right: build_node(right),
    }))
}

/// Channel with the largest min-max range; ties fall to R, then G, then B.
fn widest_axis(points: &[Rgb]) -> Axis {
    let mut best = Axis::R;
    let mut best_range = -1i32;
    for axis in [Axis::R, Axis::G, Axis::B] {
        let mut lo = u8::MAX;
        let mut hi = u8::MIN;
        for p in points {
            let v = p.channel(axis);
            lo = lo.min(v);
            hi = hi.max(v);
        }
        let range = hi as i32 - lo as i32;
        if range > best_range {
            best_range = range;
            best = axis;
        }
    }
    best
}

fn nearest_recurse(
    node: &KdNode,
    query: Rgb,
    method: &ColorMethod,
    best: &mut Option<(Rgb, f64)>,
) {
    let d = method.distance(query, node.color);
    let replace = match best {
        None => true,
        Some((c, bd)) => d < *bd || (d == *bd && node.color < *c),
    };
    if replace {
        *best = Some((node.color, d));
    }

    let diff = query.channel(node.axis) as f64 - node.color.channel(node.axis) as f64;
    let (near, far) = if diff < 0.0 {
        (&node.left, &node.right)
    } else {
        (&node.right, &node.left)
    };

    if let Some(n) = near {
        nearest_recurse(n, query, method, best);
    }
    // Squared axis distance against the current best prunes the far side.
    if let Some(f) = far {
        let prune = match best {
            Some((_, bd)) => diff * diff > *bd * *bd,
            None => false,
        };
        if !prune {
            nearest_recurse(f, query, method, best);
        }
    }
}

/// Max-heap entry ordered worst-first, with color as deterministic tiebreak.
struct HeapEntry {
    distance: f64,
    color: Rgb,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance && self.color == other.color
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.color.cmp(&other.color))
    }
}

fn knn_recurse(
    node: &KdNode,
    query: Rgb,
    method: &ColorMethod,
    k: usize,
    heap: &mut BinaryHeap<HeapEntry>,
) {
    let d = method.distance(query, node.color);
    heap.push(HeapEntry {
        distance: d,
        color: node.color,
    });
    if heap.len() > k {
        heap.pop();
    }

    let diff = query.channel(node.axis) as f64 - node.color.channel(node.axis) as f64;
    let (near, far) = if diff < 0.0 {
        (&node.left, &node.right)
    } else {
        (&node.right, &node.left)
    };

    if let Some(n) = near {
        knn_recurse(n, query, method, k, heap);
    }
    if let Some(f) = far {
        let prune = heap.len() == k
            && heap
                .peek()
                .map(|worst| diff * diff > worst.distance * worst.distance)
                .unwrap_or(false);
        if !prune {
            knn_recurse(f, query, method, k, heap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ansi8() -> Vec<Rgb> {
        vec![
            Rgb::new(0, 0, 0),
            Rgb::new(170, 0, 0),
            Rgb::new(0, 170, 0),
            Rgb::new(170, 85, 0),
            Rgb::new(0, 0, 170),
            Rgb::new(170, 0, 170),
            Rgb::new(0, 170, 170),
            Rgb::new(170, 170, 170),
        ]
    }

    /// Brute-force reference for nearest, with the same tie rule.
    fn brute_nearest(colors: &[Rgb], query: Rgb, method: &ColorMethod) -> (Rgb, f64) {
        let mut best = (colors[0], method.distance(query, colors[0]));
        for &c in &colors[1..] {
            let d = method.distance(query, c);
            if d < best.1 || (d == best.1 && c < best.0) {
                best = (c, d);
            }
        }
        best
    }

    #[test]
    fn test_nearest_matches_brute_force_euclidean() {
        let colors = ansi8();
        let tree = KdTree::build(&colors);
        let method = ColorMethod::Rgb;

        // Deterministic sample sweep across the cube.
        for r in (0..=255).step_by(51) {
            for g in (0..=255).step_by(51) {
                for b in (0..=255).step_by(51) {
                    let q = Rgb::new(r as u8, g as u8, b as u8);
                    let expected = brute_nearest(&colors, q, &method);
                    let got = tree.nearest(q, &method).unwrap();
                    assert_eq!(got.0, expected.0, "query {q}");
                }
            }
        }
    }

    #[test]
    fn test_nearest_exact_member_is_itself() {
        let colors = ansi8();
        let tree = KdTree::build(&colors);
        for &c in &colors {
            for method in [ColorMethod::Rgb, ColorMethod::Redmean, ColorMethod::Lab] {
                let (found, d) = tree.nearest(c, &method).unwrap();
                assert_eq!(found, c, "member {c} under {}", method.name());
                assert_eq!(d, 0.0);
            }
        }
    }

    #[test]
    fn test_k_nearest_sorted_and_complete() {
        let colors = ansi8();
        let tree = KdTree::build(&colors);
        let method = ColorMethod::Rgb;
        let q = Rgb::new(100, 100, 100);

        let got = tree.k_nearest(q, 3, &method);
        assert_eq!(got.len(), 3);
        assert!(got[0].1 <= got[1].1 && got[1].1 <= got[2].1);

        // The closest of the three must agree with single-nearest.
        let single = tree.nearest(q, &method).unwrap();
        assert_eq!(got[0].0, single.0);
    }

    #[test]
    fn test_k_nearest_k_larger_than_set() {
        let colors = ansi8();
        let tree = KdTree::build(&colors);
        let got = tree.k_nearest(Rgb::new(1, 2, 3), 50, &ColorMethod::Rgb);
        assert_eq!(got.len(), colors.len());
    }

    #[test]
    fn test_k_zero_is_empty() {
        let tree = KdTree::build(&ansi8());
        assert!(tree.k_nearest(Rgb::new(0, 0, 0), 0, &ColorMethod::Rgb).is_empty());
    }

    #[test]
    fn test_build_is_deterministic_across_input_order() {
        let colors = ansi8();
        let mut reversed = colors.clone();
        reversed.reverse();

        let a = KdTree::build(&colors);
        let b = KdTree::build(&reversed);
        assert_eq!(a, b, "tree shape must not depend on input order");
    }

    #[test]
    fn test_duplicate_axis_values_do_not_straddle() {
        // Several colors share the same R value; after an R split no value
        // equal to the node's may appear in the left subtree.
        let colors = vec![
            Rgb::new(10, 0, 0),
            Rgb::new(10, 50, 0),
            Rgb::new(10, 100, 0),
            Rgb::new(200, 0, 0),
            Rgb::new(201, 0, 0),
        ];
        let tree = KdTree::build(&colors);
        assert_eq!(tree.len(), 5);
        // Every color must still be findable exactly.
        for &c in &colors {
            assert_eq!(tree.nearest(c, &ColorMethod::Rgb).unwrap().0, c);
        }
    }

    #[test]
    fn test_serialize_round_trip() {
        let tree = KdTree::build(&ansi8());
        let mut buf = Vec::new();
        tree.write_to(&mut buf).unwrap();

        let back = KdTree::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(tree, back, "deserialized tree must be node-identical");
    }

    #[test]
    fn test_serialized_size() {
        // Five bytes per node plus one terminator byte per null child link.
        let tree = KdTree::build(&ansi8());
        let mut buf = Vec::new();
        tree.write_to(&mut buf).unwrap();
        let n = tree.len();
        assert_eq!(buf.len(), 5 * n + (n + 1));
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.nearest(Rgb::new(0, 0, 0), &ColorMethod::Rgb).is_none());

        let mut buf = Vec::new();
        tree.write_to(&mut buf).unwrap();
        assert_eq!(buf, vec![0]);
        assert!(KdTree::read_from(&mut buf.as_slice()).unwrap().is_empty());
    }

    #[test]
    fn test_read_rejects_bad_marker() {
        let buf = vec![7u8];
        assert!(matches!(
            KdTree::read_from(&mut buf.as_slice()),
            Err(FormatError::BadNodeMarker(7))
        ));
    }
}
