//! 2-D placement of a morphology for drawing.
//!
//! The soma is laid along the x axis from the origin. Unbranched
//! continuations keep their parent's heading; the two children of a
//! bifurcation leave at `+angle` and `-angle` from the x axis, and the
//! angle is scaled by `1 + angle_scaling` at every further bifurcation
//! level.

use glam::Vec2;

use crate::{
    tree::Tree,
    types::{NodeId, ROOT},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutParams {
    /// Angle of the first bifurcation, in degrees.
    pub branch_angle: f32,
    /// Relative change of the angle per bifurcation level.
    pub angle_scaling: f32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            branch_angle: 20.0,
            angle_scaling: -0.4,
        }
    }
}

/// One node drawn as a straight line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedSegment {
    pub id: NodeId,
    pub start: Vec2,
    pub end: Vec2,
    pub diameter: f32,
}

/// Places every node of `tree`, soma first, in pre-order.
pub fn layout(tree: &Tree, params: &LayoutParams) -> Vec<PlacedSegment> {
    let mut out = Vec::with_capacity(tree.len());
    let soma = tree.root();
    let end = Vec2::new(soma.length, 0.0);
    out.push(PlacedSegment {
        id: ROOT,
        start: Vec2::ZERO,
        end,
        diameter: soma.diameter,
    });
    place_children(tree, ROOT, end, Vec2::X, params.branch_angle, params, &mut out);
    out
}

fn place_children(
    tree: &Tree,
    id: NodeId,
    from: Vec2,
    heading: Vec2,
    angle: f32,
    params: &LayoutParams,
    out: &mut Vec<PlacedSegment>,
) {
    let node = &tree[id];
    match (node.left, node.right) {
        (None, None) => {}
        (Some(c), None) | (None, Some(c)) => {
            place(tree, c, from, heading, angle, params, out);
        }
        (Some(l), Some(r)) => {
            let rad = angle.to_radians();
            let next = angle * (1.0 + params.angle_scaling);
            place(tree, l, from, Vec2::from_angle(rad), next, params, out);
            place(tree, r, from, Vec2::from_angle(-rad), next, params, out);
        }
    }
}

fn place(
    tree: &Tree,
    id: NodeId,
    from: Vec2,
    heading: Vec2,
    angle: f32,
    params: &LayoutParams,
    out: &mut Vec<PlacedSegment>,
) {
    let node = &tree[id];
    let end = from + heading * node.length;
    out.push(PlacedSegment {
        id,
        start: from,
        end,
        diameter: node.diameter,
    });
    place_children(tree, id, end, heading, angle, params, out);
}

/// Smallest axis-aligned box `(min, max)` holding every segment, or
/// `None` for an empty slice.
pub fn bounds(segments: &[PlacedSegment]) -> Option<(Vec2, Vec2)> {
    let first = segments.first()?;
    let init = (first.start.min(first.end), first.start.max(first.end));
    Some(segments.iter().fold(init, |(lo, hi), s| {
        (lo.min(s.start).min(s.end), hi.max(s.start).max(s.end))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeKind, TreeNode};

    fn segment(length: f32) -> TreeNode {
        TreeNode::new_child(NodeKind::Segment, 0, length, 1.0)
    }

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn soma_and_first_neurite_lie_on_the_x_axis() {
        let mut tree = Tree::new(TreeNode::new_soma(10.0, 8.0));
        let s = tree.add_child(ROOT, segment(5.0));
        let placed = layout(&tree, &LayoutParams::default());

        assert_eq!(placed.len(), 2);
        assert_eq!(placed[0].end, Vec2::new(10.0, 0.0));
        assert_eq!(placed[0].diameter, 8.0);
        assert_eq!(placed[1].id, s);
        assert!(close(placed[1].end, Vec2::new(15.0, 0.0)));
    }

    #[test]
    fn bifurcation_angles_shrink_with_depth() {
        let mut tree = Tree::new(TreeNode::new_soma(10.0, 8.0));
        let s = tree.add_child(ROOT, segment(0.0));
        let (l, r) = tree.sprout(s, segment(1.0), segment(1.0));
        let (ll, _) = tree.sprout(l, segment(1.0), segment(1.0));
        let placed = layout(&tree, &LayoutParams::default());
        let find = |id| placed.iter().find(|p| p.id == id).unwrap();

        let up = Vec2::from_angle(20f32.to_radians());
        assert!(close(find(l).end - find(l).start, up));
        let down = Vec2::from_angle(-20f32.to_radians());
        assert!(close(find(r).end - find(r).start, down));
        // One level deeper the angle is 20 * 0.6 = 12 degrees.
        let deeper = Vec2::from_angle(12f32.to_radians());
        assert!(close(find(ll).end - find(ll).start, deeper));
        assert!(close(find(ll).start, find(l).end));
    }

    #[test]
    fn continuation_keeps_heading_through_zero_length_nodes() {
        let mut tree = Tree::new(TreeNode::new_soma(10.0, 8.0));
        let s = tree.add_child(ROOT, segment(0.0));
        let (l, _) = tree.sprout(s, segment(0.0), segment(1.0));
        let c = tree.add_child(l, segment(2.0));
        let placed = layout(&tree, &LayoutParams::default());
        let tip = placed.iter().find(|p| p.id == c).unwrap();
        let expected = Vec2::new(10.0, 0.0) + Vec2::from_angle(20f32.to_radians()) * 2.0;
        assert!(close(tip.end, expected));
    }

    #[test]
    fn bounds_cover_all_segments() {
        let mut tree = Tree::new(TreeNode::new_soma(10.0, 8.0));
        let s = tree.add_child(ROOT, segment(0.0));
        tree.sprout(s, segment(2.0), segment(2.0));
        let placed = layout(&tree, &LayoutParams::default());
        let (lo, hi) = bounds(&placed).unwrap();
        assert_eq!(lo.x, 0.0);
        assert!(hi.x > 10.0);
        assert!(lo.y < 0.0 && hi.y > 0.0);
        assert!((lo.y + hi.y).abs() < 1e-5);
        assert!(bounds(&[]).is_none());
    }
}
