//! End-to-end layer builds against the csgrs kernel.

use stackcarve_core::model::{
    Footprint, FootprintRegistry, LayerAssignment, LayerKind, Point, Shape, StackupLayer,
};
use stackcarve_core::params::ParamSet;
use stackcarve_solid::{BuildConfig, BuildError, BuildGate, CsgKernel, CsgrsKernel, LayerSolidBuilder};

fn board() -> Footprint {
    Footprint::board(
        "panel",
        vec![
            Point::new(0.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(20.0, 20.0),
            Point::new(0.0, 20.0),
        ],
    )
}

#[test]
fn test_through_hole_removes_cylinder_volume() {
    let kernel = CsgrsKernel::ready();
    let mut registry = FootprintRegistry::new();
    let layer = StackupLayer::new(0, 2.0, LayerKind::Cut);
    let footprint = board().with_shape(
        Shape::circle("hole", 4.0)
            .at(10.0, 10.0)
            .assign_layer(layer.id, LayerAssignment::new(2.0)),
    );
    let id = registry.insert(footprint);
    let params = ParamSet::new();
    let builder = LayerSolidBuilder::new(&kernel, &registry, &params, BuildConfig::default());

    let output = builder.build_layer(&id, &layer).unwrap();
    assert!(!output.errored);
    // 20x20x2 slab minus a 4 mm through hole (~25.1 mm^3).
    let expected = 800.0 - std::f64::consts::PI * 4.0 * 2.0;
    assert!((output.mesh.volume() - expected).abs() < 1.5);
}

#[test]
fn test_partial_pocket_keeps_uncut_material() {
    let kernel = CsgrsKernel::ready();
    let mut registry = FootprintRegistry::new();
    let layer = StackupLayer::new(0, 2.0, LayerKind::Carved);
    let footprint = board().with_shape(
        Shape::circle("pocket", 8.0)
            .at(10.0, 10.0)
            .assign_layer(layer.id, LayerAssignment::new(0.5)),
    );
    let id = registry.insert(footprint);
    let params = ParamSet::new();
    let builder = LayerSolidBuilder::new(&kernel, &registry, &params, BuildConfig::default());

    let output = builder.build_layer(&id, &layer).unwrap();
    assert!(!output.errored);
    let expected = 800.0 - std::f64::consts::PI * 16.0 * 0.5;
    assert!((output.mesh.volume() - expected).abs() < 1.5);
}

#[test]
fn test_restored_pocket_wall_is_gap_free() {
    // The restore plug overlaps the surrounding material; a plug that
    // fell short of the opening would leave a thin slot around the
    // pocket wall whose extra walls show up as surface area even
    // though its volume is negligible.
    let kernel = CsgrsKernel::ready();
    let mut registry = FootprintRegistry::new();
    let layer = StackupLayer::new(0, 2.0, LayerKind::Carved);
    let footprint = board().with_shape(
        Shape::circle("pocket", 8.0)
            .at(10.0, 10.0)
            .assign_layer(layer.id, LayerAssignment::new(0.5)),
    );
    let id = registry.insert(footprint);
    let params = ParamSet::new();
    let builder = LayerSolidBuilder::new(&kernel, &registry, &params, BuildConfig::default());

    let output = builder.build_layer(&id, &layer).unwrap();
    assert!(!output.errored);
    // Slab faces and outer walls plus the pocket wall and floor come
    // to ~973 mm^2; a 1.5 mm deep slot around the 4 mm radius wall
    // would add ~75 mm^2 more.
    let area = output.mesh.surface_area();
    assert!(area > 940.0, "surface area {area}");
    assert!(area < 1000.0, "surface area {area}");
}

#[test]
fn test_authored_order_wins_on_overlap() {
    // A full-depth hole authored before (above) a shallow pocket must
    // survive the pocket's material restore: reverse iteration applies
    // the pocket first and the hole last.
    let kernel = CsgrsKernel::ready();
    let mut registry = FootprintRegistry::new();
    let layer = StackupLayer::new(0, 2.0, LayerKind::Carved);
    let footprint = board()
        .with_shape(
            Shape::circle("hole", 4.0)
                .at(10.0, 10.0)
                .assign_layer(layer.id, LayerAssignment::new(2.0)),
        )
        .with_shape(
            Shape::circle("pocket", 8.0)
                .at(10.0, 10.0)
                .assign_layer(layer.id, LayerAssignment::new(0.5)),
        );
    let id = registry.insert(footprint);
    let params = ParamSet::new();
    let builder = LayerSolidBuilder::new(&kernel, &registry, &params, BuildConfig::default());

    let output = builder.build_layer(&id, &layer).unwrap();
    assert!(!output.errored);
    let pocket = std::f64::consts::PI * 16.0 * 0.5;
    let hole_below_pocket = std::f64::consts::PI * 4.0 * 1.5;
    let expected = 800.0 - pocket - hole_below_pocket;
    assert!(
        (output.mesh.volume() - expected).abs() < 2.0,
        "volume {} expected {}",
        output.mesh.volume(),
        expected
    );
}

#[test]
fn test_parameterized_dimensions_resolve() {
    let kernel = CsgrsKernel::ready();
    let mut registry = FootprintRegistry::new();
    let layer = StackupLayer::new(0, "t", LayerKind::Cut);
    let footprint = board().with_shape(
        Shape::circle("hole", "d * 2")
            .at(10.0, 10.0)
            .assign_layer(layer.id, LayerAssignment::new("t")),
    );
    let id = registry.insert(footprint);
    let params = ParamSet::from_parameters([
        stackcarve_core::params::Parameter::new("t", 2.0),
        stackcarve_core::params::Parameter::new("d", 2.0),
    ]);
    let builder = LayerSolidBuilder::new(&kernel, &registry, &params, BuildConfig::default());

    let output = builder.build_layer(&id, &layer).unwrap();
    let expected = 800.0 - std::f64::consts::PI * 4.0 * 2.0;
    assert!((output.mesh.volume() - expected).abs() < 1.5);
}

#[test]
fn test_build_refused_before_kernel_ready() {
    let kernel = CsgrsKernel::new();
    let mut registry = FootprintRegistry::new();
    let id = registry.insert(board());
    let params = ParamSet::new();
    let builder = LayerSolidBuilder::new(&kernel, &registry, &params, BuildConfig::default());
    let layer = StackupLayer::new(0, 2.0, LayerKind::Cut);

    assert!(matches!(
        builder.build_layer(&id, &layer),
        Err(BuildError::KernelNotReady)
    ));
    assert_eq!(kernel.created_calls(), 0);
}

#[test]
fn test_no_handles_leak_across_builds() {
    let kernel = CsgrsKernel::ready();
    let mut registry = FootprintRegistry::new();
    let layer = StackupLayer::new(0, 2.0, LayerKind::Carved);
    let footprint = board()
        .with_shape(
            Shape::circle("hole", 4.0)
                .at(5.0, 5.0)
                .assign_layer(layer.id, LayerAssignment::new(2.0)),
        )
        .with_shape(
            Shape::circle("pocket", 6.0)
                .at(14.0, 14.0)
                .assign_layer(
                    layer.id,
                    LayerAssignment::new(1.0).with_endmill_radius(0.5),
                ),
        );
    let id = registry.insert(footprint);
    let params = ParamSet::new();
    let builder = LayerSolidBuilder::new(&kernel, &registry, &params, BuildConfig::default());

    for _ in 0..3 {
        builder.build_layer(&id, &layer).unwrap();
    }
    assert_eq!(kernel.live_handles(), 0);
    assert_eq!(kernel.dispose_calls(), kernel.created_calls());
}

#[test]
fn test_stale_build_never_overwrites_newer_result() {
    let kernel = CsgrsKernel::ready();
    let mut registry = FootprintRegistry::new();
    let layer = StackupLayer::new(0, 2.0, LayerKind::Cut);
    let id = registry.insert(board());
    let params = ParamSet::new();
    let builder = LayerSolidBuilder::new(&kernel, &registry, &params, BuildConfig::default());
    let gate = BuildGate::new();
    let key = (id, layer.id);

    let stale_ticket = gate.begin();
    let stale_output = builder.build_layer(&id, &layer).unwrap();

    let fresh_ticket = gate.begin();
    let fresh_output = builder.build_layer(&id, &layer).unwrap();
    assert!(gate.commit(key, fresh_ticket, fresh_output));
    assert!(!gate.commit(key, stale_ticket, stale_output));
    assert!(gate.result(&key).is_some());
}
