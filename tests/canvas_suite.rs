use erd_canvas::{
    Canvas, Config, LayoutConfig, Point, PointerEvent, Project, Scene, ViewTransform,
};
use proptest::prelude::*;

fn config() -> Config {
    Config {
        layout: LayoutConfig {
            fast_text: true,
            ..LayoutConfig::default()
        },
        ..Config::default()
    }
}

fn default_canvas() -> Canvas {
    Canvas::new(Some(&Project::new("Task Management Web Application", "Web Application")), &config())
}

fn assert_edges_track_nodes(canvas: &Canvas, scene: &Scene) {
    assert_eq!(scene.edges.len(), canvas.model().edges().len());
    for edge in &scene.edges {
        assert_eq!(Some(edge.from), canvas.layout().anchor(&edge.source), "{}", edge.source);
        assert_eq!(Some(edge.to), canvas.layout().anchor(&edge.target), "{}", edge.target);
    }
}

#[test]
fn default_schema_renders_four_nodes_and_labelled_edges() {
    let canvas = default_canvas();
    let scene = canvas.scene();
    assert_eq!(scene.nodes.len(), 4);
    assert_eq!(scene.edges.len(), 4);
    let expected = [
        ("users", "projects", "owns"),
        ("projects", "tasks", "contains"),
        ("tasks", "comments", "has"),
        ("users", "comments", "writes"),
    ];
    for (source, target, label) in expected {
        let edge = scene
            .edge(source, target)
            .unwrap_or_else(|| panic!("missing edge {source} -> {target}"));
        assert_eq!(edge.label, label);
        assert_eq!(edge.cardinality, "one-to-many");
    }
    assert_edges_track_nodes(&canvas, &scene);
}

#[test]
fn dragging_projects_moves_only_incident_edges() {
    let mut canvas = default_canvas();
    let before = canvas.scene();
    assert_eq!(canvas.layout().position("projects"), Some(Point::new(300.0, 100.0)));

    canvas.handle(PointerEvent::Down(Point::new(300.0, 100.0)));
    canvas.handle(PointerEvent::Move(Point::new(380.0, 160.0)));
    canvas.handle(PointerEvent::Move(Point::new(450.0, 220.0)));
    canvas.handle(PointerEvent::Up);

    assert_eq!(canvas.layout().position("projects"), Some(Point::new(450.0, 220.0)));
    let after = canvas.scene();
    let anchor = canvas.layout().anchor("projects").unwrap();

    let owns = after.edge("users", "projects").unwrap();
    assert_eq!(owns.to, anchor);
    assert_ne!(owns.to, before.edge("users", "projects").unwrap().to);
    let contains = after.edge("projects", "tasks").unwrap();
    assert_eq!(contains.from, anchor);
    assert_ne!(contains.from, before.edge("projects", "tasks").unwrap().from);

    for (source, target) in [("tasks", "comments"), ("users", "comments")] {
        let old = before.edge(source, target).unwrap();
        let new = after.edge(source, target).unwrap();
        assert_eq!((old.from, old.to), (new.from, new.to));
    }
}

#[test]
fn release_freezes_node_until_new_input() {
    let mut canvas = default_canvas();
    canvas.handle(PointerEvent::Down(Point::new(520.0, 120.0)));
    canvas.handle(PointerEvent::Move(Point::new(540.0, 180.0)));
    canvas.handle(PointerEvent::Up);
    let settled = canvas.layout().position("tasks");
    assert_eq!(settled, Some(Point::new(520.0, 160.0)));
    let _ = canvas.frame();
    let _ = canvas.frame();
    assert_eq!(canvas.layout().position("tasks"), settled);
}

#[test]
fn three_zoom_steps_then_reset_is_exact_identity() {
    let mut canvas = default_canvas();
    for _ in 0..3 {
        assert!(canvas.zoom_in());
    }
    assert!((canvas.transform().scale - 1.728).abs() < 1e-4);
    canvas.reset_view();
    assert_eq!(canvas.transform(), ViewTransform::IDENTITY);
    assert_eq!(canvas.transform().scale, 1.0);
    assert_eq!(canvas.transform().offset, Point::new(0.0, 0.0));
}

#[test]
fn zoom_buttons_anchor_at_canvas_center() {
    let mut canvas = default_canvas();
    let center = Point::new(400.0, 250.0);
    let before = canvas.transform().to_world(center);
    canvas.zoom_in();
    let after = canvas.transform().to_world(center);
    assert!((before.x - after.x).abs() < 1e-3);
    assert!((before.y - after.y).abs() < 1e-3);
}

#[test]
fn dangling_edge_does_not_break_render() {
    let project = erd_canvas::parse_project(
        r#"{
            "name": "Shop",
            "entities": [
                {"id": "orders", "name": "Orders", "fields": ["id"]},
                {"id": "items", "name": "Items", "fields": ["id", "order_id"]}
            ],
            "relationships": [
                {"source": "orders", "target": "items", "relationship": "contains"},
                {"source": "orders", "target": "customers", "relationship": "belongs to"}
            ]
        }"#,
    )
    .unwrap();
    let canvas = Canvas::new(Some(&project), &config());
    let scene = canvas.scene();
    assert_eq!(scene.nodes.len(), 2);
    assert_eq!(scene.edges.len(), 1);
    assert_eq!(scene.diagnostics.len(), 1);
    assert_eq!(canvas.diagnostics().len(), 1);
    assert!(scene.diagnostics[0].to_string().contains("customers"));
}

#[test]
fn null_project_renders_empty_scene() {
    let canvas = Canvas::new(None, &config());
    let scene = canvas.scene();
    assert!(scene.nodes.is_empty());
    assert!(scene.edges.is_empty());
    assert!(canvas.export_png().is_err());
}

#[test]
fn stale_drag_target_is_absorbed() {
    let mut canvas = default_canvas();
    let before = canvas.snapshot();
    assert!(!canvas.move_node("deleted", Point::new(1.0, 2.0)));
    assert_eq!(canvas.snapshot(), before);
}

#[cfg(feature = "png")]
#[test]
fn export_names_file_after_project() {
    let canvas = default_canvas();
    let image = canvas.export_png().unwrap();
    assert_eq!(image.file_name, "Task_Management_Web_Application_diagram.png");
    assert!(image.width > 0 && image.height > 0);
}

#[cfg(feature = "png")]
#[test]
fn requested_export_completes_while_canvas_lives() {
    let canvas = default_canvas();
    let (task, job) = canvas.request_export();
    assert!(job.run());
    let image = task.take().unwrap().unwrap();
    assert!(image.png.starts_with(b"\x89PNG"));
}

fn drag_step() -> impl Strategy<Value = (usize, f32, f32)> {
    (0usize..4, -400.0f32..800.0, -400.0f32..800.0)
}

proptest! {
    #[test]
    fn edges_track_nodes_after_any_moves(steps in prop::collection::vec(drag_step(), 1..20)) {
        let ids = ["users", "projects", "tasks", "comments"];
        let mut canvas = default_canvas();
        for (idx, x, y) in steps {
            canvas.move_node(ids[idx], Point::new(x, y));
        }
        let scene = canvas.scene();
        prop_assert_eq!(scene.edges.len(), 4);
        for edge in &scene.edges {
            prop_assert_eq!(Some(edge.from), canvas.layout().anchor(&edge.source));
            prop_assert_eq!(Some(edge.to), canvas.layout().anchor(&edge.target));
        }
    }

    #[test]
    fn scale_is_always_clamped(scale in -10.0f32..50.0, dx in -1e4f32..1e4, dy in -1e4f32..1e4) {
        let mut canvas = default_canvas();
        canvas.set_transform(scale, dx, dy);
        let stored = canvas.transform();
        prop_assert!(stored.scale >= 0.5 && stored.scale <= 3.0);
        prop_assert_eq!(stored.offset, Point::new(dx, dy));
    }

    #[test]
    fn reset_after_any_transform_is_identity(scale in 0.1f32..5.0, dx in -1e4f32..1e4, dy in -1e4f32..1e4) {
        let mut canvas = default_canvas();
        canvas.set_transform(scale, dx, dy);
        canvas.reset_view();
        prop_assert_eq!(canvas.transform(), ViewTransform::IDENTITY);
    }

    #[test]
    fn wheel_zoom_keeps_world_point_under_cursor(
        scale in 0.5f32..3.0,
        dx in -500.0f32..500.0,
        dy in -500.0f32..500.0,
        cx in 0.0f32..800.0,
        cy in 0.0f32..500.0,
        up in any::<bool>(),
    ) {
        let mut canvas = default_canvas();
        canvas.set_transform(scale, dx, dy);
        let cursor = Point::new(cx, cy);
        let before = canvas.transform().to_world(cursor);
        canvas.handle(PointerEvent::Wheel { at: cursor, delta: if up { -1.0 } else { 1.0 } });
        let after = canvas.transform().to_world(cursor);
        prop_assert!((before.x - after.x).abs() < 0.05);
        prop_assert!((before.y - after.y).abs() < 0.05);
    }
}
