//! Region quadtree for "who is near me" queries
//!
//! Nodes and their element slots live in a [`TreeArena`] and reference each
//! other by [`Span`] handles rather than pointers. A tree is built from scratch
//! every tick and is discarded wholesale by clearing its arena.

use crate::spatial::arena::{Arena, Span};
use crate::util::rect::Rect;

/// Initial capacity of a fresh query result buffer (doubles when full)
pub const QUERY_INITIAL_CAPACITY: usize = 16;

/// Capability of an element to be tested against a rectangle.
///
/// Used both to admit an element into a node and to filter query results.
pub trait InRange {
    fn in_range(&self, rect: &Rect) -> bool;
}

/// Quadtree node. Starts as a leaf; once `children` is set it never reverts.
#[derive(Debug, Clone, Copy, Default)]
struct Node {
    boundary: Rect,
    /// `capacity` element slots allocated with the node
    elements: Span,
    len: usize,
    /// First of four consecutive child nodes in NE, SE, SW, NW order
    children: Option<Span>,
}

/// Backing storage for quadtrees: one arena for nodes, one for element slots
#[derive(Debug)]
pub struct TreeArena<E> {
    nodes: Arena<Node>,
    elements: Arena<E>,
}

impl<E: Default> TreeArena<E> {
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
            elements: Arena::new(),
        }
    }

    /// Invalidate every tree built in this arena in one pass
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.elements.clear();
    }

    /// Release all backing memory
    pub fn teardown(&mut self) {
        self.nodes.teardown();
        self.elements.teardown();
    }

    /// Nodes allocated since the last clear
    pub fn node_count(&self) -> usize {
        self.nodes.allocated_slots()
    }

    /// Regions held across both internal arenas
    pub fn region_count(&self) -> usize {
        self.nodes.region_count() + self.elements.region_count()
    }
}

impl<E: Default> Default for TreeArena<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A quadtree borrowed from its arena for the duration of one build/query phase
pub struct QuadTree<'a, E> {
    arena: &'a mut TreeArena<E>,
    root: Span,
    capacity: usize,
    len: usize,
}

impl<'a, E> QuadTree<'a, E>
where
    E: InRange + Copy + Default,
{
    /// Start a new empty tree over `boundary` inside `arena`.
    ///
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(arena: &'a mut TreeArena<E>, capacity: usize, boundary: Rect) -> Self {
        assert!(capacity > 0, "quadtree capacity must be positive");
        let root = alloc_node(arena, capacity, boundary);
        Self {
            arena,
            root,
            capacity,
            len: 0,
        }
    }

    /// Insert an element, subdividing full leaves.
    ///
    /// Returns false if the element is outside the tree's boundary.
    pub fn insert(&mut self, element: E) -> bool {
        let inserted = self.insert_at(self.root, element);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    fn insert_at(&mut self, node_span: Span, element: E) -> bool {
        let node = self.node(node_span);
        if !element.in_range(&node.boundary) {
            return false;
        }

        if node.children.is_none() && node.len < self.capacity {
            self.arena.elements.get_mut(node.elements)[node.len] = element;
            self.arena.nodes.get_mut(node_span)[0].len += 1;
            return true;
        }

        let children = match node.children {
            Some(children) => children,
            None => self.subdivide(node_span),
        };

        for i in 0..4 {
            if self.insert_at(children.at(i), element) {
                return true;
            }
        }

        tracing::warn!(
            "Element accepted by node {:?} but rejected by all of its quadrants",
            node.boundary
        );
        false
    }

    /// Allocate the four quadrant children of a full leaf
    fn subdivide(&mut self, node_span: Span) -> Span {
        let boundary = self.node(node_span).boundary;
        let children = self.arena.nodes.alloc_slice(4);
        for (i, quadrant) in boundary.quadrants().into_iter().enumerate() {
            let elements = self.arena.elements.alloc_slice(self.capacity);
            self.arena.nodes.get_mut(children)[i] = Node {
                boundary: quadrant,
                elements,
                len: 0,
                children: None,
            };
        }
        self.arena.nodes.get_mut(node_span)[0].children = Some(children);
        children
    }

    #[inline]
    fn node(&self, span: Span) -> Node {
        self.arena.nodes.get(span)[0]
    }

    /// Collect every element within `range`
    pub fn query(&self, range: &Rect) -> Vec<E> {
        let mut found = Vec::with_capacity(QUERY_INITIAL_CAPACITY);
        self.query_into(range, &mut found);
        found
    }

    /// Append every element within `range` to `found`
    pub fn query_into(&self, range: &Rect, found: &mut Vec<E>) {
        self.query_node(self.root, range, found);
    }

    fn query_node(&self, node_span: Span, range: &Rect, found: &mut Vec<E>) {
        let node = self.node(node_span);
        if !node.boundary.intersects(range) {
            return;
        }

        // A node fully inside the range contributes all of its elements
        let add_all = node.boundary.is_inside(range);
        let held = &self.arena.elements.get(node.elements)[..node.len];
        found.extend(
            held.iter()
                .filter(|element| add_all || element.in_range(range))
                .copied(),
        );

        if let Some(children) = node.children {
            for i in 0..4 {
                self.query_node(children.at(i), range, found);
            }
        }
    }

    /// Number of elements inserted
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn boundary(&self) -> Rect {
        self.node(self.root).boundary
    }

    /// Nodes in this tree, root included
    pub fn node_count(&self) -> usize {
        self.count_nodes(self.root)
    }

    fn count_nodes(&self, span: Span) -> usize {
        match self.node(span).children {
            Some(children) => 1 + (0..4).map(|i| self.count_nodes(children.at(i))).sum::<usize>(),
            None => 1,
        }
    }

    /// Levels in the tree; a lone root has depth 1
    pub fn depth(&self) -> usize {
        self.node_depth(self.root)
    }

    fn node_depth(&self, span: Span) -> usize {
        match self.node(span).children {
            Some(children) => 1 + (0..4).map(|i| self.node_depth(children.at(i))).max().unwrap_or(0),
            None => 1,
        }
    }
}

fn alloc_node<E: Default>(arena: &mut TreeArena<E>, capacity: usize, boundary: Rect) -> Span {
    let elements = arena.elements.alloc_slice(capacity);
    arena.nodes.alloc(Node {
        boundary,
        elements,
        len: 0,
        children: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::vec2::Vec2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Point element tagged with an id so results can be checked for duplicates
    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    struct Point {
        id: usize,
        position: Vec2,
    }

    impl InRange for Point {
        fn in_range(&self, rect: &Rect) -> bool {
            rect.contains_point(self.position)
        }
    }

    fn point(id: usize, x: f32, y: f32) -> Point {
        Point {
            id,
            position: Vec2::new(x, y),
        }
    }

    fn random_points(count: usize, seed: u64) -> Vec<Point> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|id| point(id, rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)))
            .collect()
    }

    fn sorted_ids(points: &[Point]) -> Vec<usize> {
        let mut ids: Vec<usize> = points.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_insert_rejects_out_of_range() {
        let mut arena = TreeArena::new();
        let mut tree = QuadTree::new(&mut arena, 4, Rect::from_size(100.0, 100.0));
        assert!(!tree.insert(point(0, 150.0, 50.0)));
        assert!(!tree.insert(point(1, 50.0, -1.0)));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_leaf_until_capacity() {
        let mut arena = TreeArena::new();
        let mut tree = QuadTree::new(&mut arena, 4, Rect::from_size(100.0, 100.0));
        for i in 0..4 {
            assert!(tree.insert(point(i, 10.0 + i as f32, 10.0)));
        }
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.depth(), 1);

        assert!(tree.insert(point(4, 90.0, 90.0)));
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_subdivision_goes_to_fixed_quadrant() {
        let mut arena = TreeArena::new();
        let mut tree = QuadTree::new(&mut arena, 1, Rect::from_size(100.0, 100.0));
        assert!(tree.insert(point(0, 50.0, 50.0)));
        // (75, 75) lies in the +x/+y quadrant
        assert!(tree.insert(point(1, 75.0, 75.0)));
        let ne = Rect::new(Vec2::new(75.0, 75.0), 25.0, 25.0);
        let found = tree.query(&ne);
        assert!(found.iter().any(|p| p.id == 1));
    }

    #[test]
    fn test_shared_edge_point_lands_once() {
        // A point on the split lines is contained by all four quadrants;
        // NE is tried first and must be the only one to hold it.
        let mut arena = TreeArena::new();
        let mut tree = QuadTree::new(&mut arena, 1, Rect::from_size(100.0, 100.0));
        assert!(tree.insert(point(0, 10.0, 10.0)));
        assert!(tree.insert(point(1, 50.0, 50.0)));
        let all = tree.query(&Rect::from_size(100.0, 100.0));
        assert_eq!(sorted_ids(&all), vec![0, 1]);
    }

    #[test]
    fn test_query_whole_boundary_returns_everything_once() {
        let points = random_points(1000, 42);
        for capacity in [1, 4, 85] {
            let mut arena = TreeArena::new();
            let bounds = Rect::from_size(100.0, 100.0);
            let mut tree = QuadTree::new(&mut arena, capacity, bounds);
            for p in &points {
                assert!(tree.insert(*p));
            }
            let found = tree.query(&bounds);
            assert_eq!(found.len(), points.len(), "capacity {}", capacity);
            assert_eq!(sorted_ids(&found), (0..points.len()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_query_matches_linear_scan() {
        let points = random_points(500, 7);
        let mut arena = TreeArena::new();
        let mut tree = QuadTree::new(&mut arena, 8, Rect::from_size(100.0, 100.0));
        for p in &points {
            tree.insert(*p);
        }

        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            let range = Rect::new(
                Vec2::new(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)),
                rng.gen_range(1.0..30.0),
                rng.gen_range(1.0..30.0),
            );
            let expected: Vec<Point> = points
                .iter()
                .copied()
                .filter(|p| range.contains_point(p.position))
                .collect();
            assert_eq!(sorted_ids(&tree.query(&range)), sorted_ids(&expected));
        }
    }

    #[test]
    fn test_query_disjoint_range_is_empty() {
        let points = random_points(100, 3);
        let mut arena = TreeArena::new();
        let mut tree = QuadTree::new(&mut arena, 4, Rect::from_size(100.0, 100.0));
        for p in &points {
            tree.insert(*p);
        }
        let outside = Rect::new(Vec2::new(500.0, 500.0), 10.0, 10.0);
        assert!(tree.query(&outside).is_empty());
    }

    #[test]
    fn test_query_into_appends() {
        let mut arena = TreeArena::new();
        let mut tree = QuadTree::new(&mut arena, 2, Rect::from_size(10.0, 10.0));
        tree.insert(point(0, 1.0, 1.0));
        tree.insert(point(1, 9.0, 9.0));

        let mut found = vec![point(99, 0.0, 0.0)];
        tree.query_into(&Rect::from_size(10.0, 10.0), &mut found);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].id, 99);
    }

    #[test]
    fn test_arena_clear_reuses_regions() {
        let points = random_points(2000, 11);
        let mut arena = TreeArena::new();
        let mut regions = Vec::new();
        for _ in 0..10 {
            {
                let mut tree = QuadTree::new(&mut arena, 4, Rect::from_size(100.0, 100.0));
                for p in &points {
                    tree.insert(*p);
                }
                assert_eq!(tree.len(), points.len());
            }
            regions.push(arena.region_count());
            arena.clear();
            assert_eq!(arena.node_count(), 0);
        }
        assert!(regions.windows(2).all(|w| w[0] == w[1]), "{:?}", regions);
    }

    #[test]
    #[should_panic(expected = "capacity must be positive")]
    fn test_zero_capacity_panics() {
        let mut arena: TreeArena<Point> = TreeArena::new();
        let _ = QuadTree::new(&mut arena, 0, Rect::from_size(1.0, 1.0));
    }
}
