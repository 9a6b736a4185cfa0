use approx::assert_relative_eq;

use crate::prelude::*;

#[test]
fn from_center_dims_puts_odd_unit_on_upper_right() {
    let r = Rect::from_center_dims(Point::new(10, 10), 5, 7);
    assert_eq!(r, Rect::from_sides(8, 7, 13, 14));
    assert_eq!(r.width(), 5);
    assert_eq!(r.height(), 7);
}

#[test]
#[should_panic]
fn from_sides_rejects_inverted_rect() {
    Rect::from_sides(10, 0, 0, 10);
}

#[test]
fn rect_union_and_intersection() {
    let a = Rect::from_sides(0, 0, 10, 10);
    let b = Rect::from_sides(5, -5, 20, 5);
    assert_eq!(a.union(b), Rect::from_sides(0, -5, 20, 10));
    assert_eq!(a.intersection(b), Some(Rect::from_sides(5, 0, 10, 5)));
    assert_eq!(a.intersection(Rect::from_sides(11, 11, 12, 12)), None);
}

#[test]
fn rect_transform_normalizes_corners() {
    let r = Rect::from_sides(0, 0, 20, 10);
    let rotated = r.transform(Transformation::rotate(Rotation::R90));
    assert_eq!(rotated, Rect::from_sides(-10, 0, 0, 20));
    assert_eq!(rotated.lower_left(), Point::new(-10, 0));
    assert_eq!(rotated.upper_right(), Point::new(0, 20));
    let reflected = r.transform(Transformation::reflect_vert());
    assert_eq!(reflected, Rect::from_sides(0, -10, 20, 0));
}

#[test]
fn cascade_applies_child_then_parent() {
    let parent = Transformation::from_opts(Point::new(100, 0), false, Rotation::R90);
    let child = Transformation::translate(10, 0);
    let trans = Transformation::cascade(parent, child);
    assert_eq!(trans.apply_point(Point::zero()), Point::new(100, 10));
    assert_eq!(trans.rotation(), Rotation::R90);
    assert!(!trans.reflects_vert());
}

#[test]
fn reflected_rotation_is_recovered() {
    let t = Transformation::from_opts(Point::new(1, 2), true, Rotation::R180);
    assert!(t.reflects_vert());
    assert_eq!(t.rotation(), Rotation::R180);
    assert_eq!(t.offset_point(), Point::new(1, 2));
    // Reflect (1, 1) -> (1, -1), rotate 180 -> (-1, 1), translate.
    assert_eq!(t.apply_point(Point::new(1, 1)), Point::new(0, 3));
}

#[test]
fn regular_octagon_has_flat_axis_aligned_edges() {
    let side = 10_000;
    let oct = Polygon::regular_octagon(Point::zero(), side);
    assert_eq!(oct.points().len(), 8);
    let bbox = oct.bbox_rect();
    assert_relative_eq!(
        bbox.width() as f64,
        side as f64 * (1. + 2f64.sqrt()),
        max_relative = 1e-4
    );
    assert_eq!(bbox.width(), bbox.height());
    // The first two vertices form the vertical right-hand edge.
    let (a, b) = (oct.points()[0], oct.points()[7]);
    assert_eq!(a.x, b.x);
    assert_relative_eq!((a.y - b.y) as f64, side as f64, epsilon = 2.);
}

#[test]
fn circle_vertex_count_follows_resolution() {
    let c = Polygon::circle(Point::new(5, 5), 1000, 2.5);
    assert_eq!(c.points().len(), 144);
    assert_eq!(c.points()[0], Point::new(1005, 5));
    assert_eq!(c.bbox_rect(), Rect::from_sides(-995, -995, 1005, 1005));
}

#[test]
fn path_with_corner_uses_miter_join() {
    let path = Polygon::from_path(
        &[Point::new(0, 0), Point::new(100, 0), Point::new(100, 100)],
        20,
    );
    assert_eq!(
        path.points(),
        &[
            Point::new(0, 10),
            Point::new(90, 10),
            Point::new(90, 100),
            Point::new(110, 100),
            Point::new(110, -10),
            Point::new(0, -10),
        ]
    );
}

#[test]
fn polygon_contains_uses_even_odd_rule() {
    let l_shape = Polygon::from_verts(vec![
        Point::new(0, 0),
        Point::new(20, 0),
        Point::new(20, 10),
        Point::new(10, 10),
        Point::new(10, 20),
        Point::new(0, 20),
    ]);
    assert!(l_shape.contains(Point::new(5, 15)));
    assert!(l_shape.contains(Point::new(15, 5)));
    assert!(!l_shape.contains(Point::new(15, 15)));
    assert_eq!(l_shape.signed_area_x2(), 2 * 300);
}

#[test]
fn bbox_of_shapes_is_union() {
    let shapes: Vec<Shape> = vec![
        Rect::from_sides(0, 0, 10, 10).into(),
        Polygon::from_verts(vec![Point::new(-5, 3), Point::new(2, 30), Point::new(4, 4)]).into(),
    ];
    assert_eq!(shapes.bbox(), Some(Rect::from_sides(-5, 0, 10, 30)));
    let empty: Vec<Shape> = Vec::new();
    assert_eq!(empty.bbox(), None);
}

#[test]
fn snap_to_grid_ties_down() {
    assert_eq!(snap_to_grid(25, 10), 20);
    assert_eq!(snap_to_grid(26, 10), 30);
    assert_eq!(snap_to_grid(-25, 10), -30);
    assert_eq!(Point::new(7, -7).snap_to_grid(5), Point::new(5, -5));
}
