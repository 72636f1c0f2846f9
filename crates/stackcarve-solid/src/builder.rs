//! Per-layer boolean solid builds.
//!
//! One [`LayerSolidBuilder`] run produces the solid for a single
//! (footprint, stackup layer) pair: base volume, then one
//! cut/restore/fillet pass per assigned shape, then mesh extraction.
//! Kernel failures never escape a build; the layer is flagged errored
//! and whatever geometry exists is still surfaced. All handles run
//! through a [`HandleScope`], so nothing leaks on any exit path.

use tracing::{debug, warn};

use stackcarve_core::model::{CarveSide, FootprintId, FootprintRegistry, LayerKind, StackupLayer};
use stackcarve_core::params::ParamSet;

use crate::config::BuildConfig;
use crate::contour::{bounds, governing_dimension, offset_contour};
use crate::error::{BuildError, BuildResult, KernelResult};
use crate::fillet::{build_fillet, safe_fillet_radius, FilletBuild};
use crate::flatten::{flatten_footprint, FlatGeometry, FlatShape};
use crate::kernel::{CsgKernel, SolidHandle};
use crate::mesh::MeshBuffers;
use crate::tracker::HandleScope;

/// Depth differences under this are treated as a through cut.
const DEPTH_EPSILON: f64 = 1e-6;
/// Fillet radii at or below this are ignored.
const MIN_RADIUS: f64 = 0.001;

/// Finished output of one layer build.
#[derive(Debug, Clone, Default)]
pub struct LayerBuildOutput {
    pub mesh: MeshBuffers,
    /// Set when any operation degraded to a fallback or failed; the
    /// mesh is still the best available geometry.
    pub errored: bool,
}

/// Builds layer solids against a CSG kernel.
pub struct LayerSolidBuilder<'a> {
    kernel: &'a dyn CsgKernel,
    registry: &'a FootprintRegistry,
    params: &'a ParamSet,
    config: BuildConfig,
}

impl<'a> LayerSolidBuilder<'a> {
    pub fn new(
        kernel: &'a dyn CsgKernel,
        registry: &'a FootprintRegistry,
        params: &'a ParamSet,
        config: BuildConfig,
    ) -> Self {
        Self {
            kernel,
            registry,
            params,
            config,
        }
    }

    /// Builds the solid for one footprint on one stackup layer.
    ///
    /// Returns `Err` only for refused preconditions (kernel not
    /// ready, unknown footprint, unevaluable layer thickness); every
    /// geometric failure is contained in the output's `errored` flag.
    pub fn build_layer(
        &self,
        footprint_id: &FootprintId,
        layer: &StackupLayer,
    ) -> BuildResult<LayerBuildOutput> {
        if !self.kernel.is_ready() {
            return Err(BuildError::KernelNotReady);
        }
        let footprint = self
            .registry
            .get(footprint_id)
            .ok_or(BuildError::UnknownFootprint(*footprint_id))?;
        let thickness = layer.thickness.eval(self.params)?;

        let flat = flatten_footprint(footprint, self.registry, self.params);

        let mut scope = HandleScope::new(self.kernel);
        let mut base: Option<SolidHandle> = None;
        let mut fallbacks: Vec<MeshBuffers> = Vec::new();

        let run = self.apply_operations(
            &mut scope,
            &mut base,
            &mut fallbacks,
            footprint.is_board,
            footprint.outline.as_deref(),
            &flat,
            layer,
            thickness,
        );
        let mut errored = false;
        if let Err(err) = &run {
            warn!(layer = %layer.id, %err, "layer build failed mid-way; surfacing partial geometry");
            errored = true;
        }

        let mut mesh = match base {
            Some(handle) => match self.kernel.to_mesh(handle) {
                Ok(mesh) => mesh,
                Err(err) => {
                    warn!(%err, "mesh extraction failed");
                    errored = true;
                    MeshBuffers::new()
                }
            },
            None => MeshBuffers::new(),
        };

        // Fallback triangles bypass the kernel; mixing them with
        // boolean output would risk self-intersecting hybrids, so
        // they replace the layer's mesh outright.
        if !fallbacks.is_empty() {
            let mut merged = MeshBuffers::new();
            for buffers in &fallbacks {
                merged.merge(buffers);
            }
            mesh = merged;
            errored = true;
        }

        if footprint.is_board {
            mesh.orient_for_preview();
        }
        debug!(
            layer = %layer.id,
            triangles = mesh.triangle_count(),
            errored,
            "layer build finished"
        );
        Ok(LayerBuildOutput { mesh, errored })
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_operations(
        &self,
        scope: &mut HandleScope<'a>,
        base: &mut Option<SolidHandle>,
        fallbacks: &mut Vec<MeshBuffers>,
        is_board: bool,
        outline: Option<&[stackcarve_core::model::Point]>,
        flat: &[FlatShape],
        layer: &StackupLayer,
        thickness: f64,
    ) -> KernelResult<()> {
        *base = self.build_base(scope, is_board, outline, flat, thickness)?;
        let Some(mut current) = *base else {
            return Ok(());
        };

        // Authoring order encodes priority (topmost wins); applying
        // in reverse leaves the highest-priority cuts applied last.
        for shape in flat.iter().rev() {
            let Some(assignment) = shape.assignment(&layer.id) else {
                continue;
            };

            let depth = match layer.kind {
                LayerKind::Cut => thickness,
                LayerKind::Carved => match assignment.depth.eval(self.params) {
                    Ok(value) => value.clamp(0.0, thickness),
                    Err(err) => {
                        warn!(shape = %shape.shape_id, %err, "skipping shape with failing depth expression");
                        continue;
                    }
                },
            };
            if depth <= 0.0 {
                continue;
            }

            let radius = self.resolve_radius(shape, assignment);

            let Some(tool) = self.build_tool(scope, &shape.geometry, thickness)? else {
                warn!(shape = %shape.shape_id, "unsupported tool geometry; shape skipped");
                continue;
            };
            // Full-depth opening first; partial depths restore below.
            current = scope.solid(self.kernel.difference(current, tool)?);
            *base = Some(current);

            let through = depth >= thickness - DEPTH_EPSILON;
            if through {
                continue;
            }

            let invert = layer.carve_side == CarveSide::Bottom;
            let fillet = if radius > MIN_RADIUS {
                build_fillet(
                    self.kernel,
                    scope,
                    &shape.geometry,
                    depth,
                    radius,
                    invert,
                    &self.config,
                )
            } else {
                FilletBuild::Skipped(crate::fillet::FilletSkip::RadiusTooSmall)
            };

            // When the fillet succeeds, the restore plug reaches past
            // the pocket floor by the safe radius; the fillet
            // subtraction then carves the rounded floor out of it.
            let safe_radius = match &fillet {
                FilletBuild::Solid(_) | FilletBuild::Fallback(_) => {
                    let governing = governing_dimension(&shape.geometry).unwrap_or(0.0);
                    safe_fillet_radius(radius, governing, depth)
                }
                FilletBuild::Skipped(_) => 0.0,
            };
            let restore_height = thickness - depth + safe_radius;
            if let Some(plug) = self.build_restore_plug(
                scope,
                &shape.geometry,
                restore_height,
                layer.carve_side,
                thickness,
            )? {
                current = scope.solid(self.kernel.union(current, plug)?);
                *base = Some(current);
            }

            let pocket_top = match layer.carve_side {
                CarveSide::Top => thickness,
                CarveSide::Bottom => 0.0,
            };
            match fillet {
                FilletBuild::Solid(handle) => {
                    let placed =
                        scope.solid(self.kernel.translate(handle, [0.0, 0.0, pocket_top])?);
                    current = scope.solid(self.kernel.difference(current, placed)?);
                    *base = Some(current);
                }
                FilletBuild::Fallback(mut buffers) => {
                    buffers.translate(0.0, 0.0, pocket_top);
                    fallbacks.push(buffers);
                }
                FilletBuild::Skipped(reason) => {
                    debug!(shape = %shape.shape_id, ?reason, "pocket left unfilleted");
                }
            }
        }
        Ok(())
    }

    fn build_base(
        &self,
        scope: &mut HandleScope<'a>,
        is_board: bool,
        outline: Option<&[stackcarve_core::model::Point]>,
        flat: &[FlatShape],
        thickness: f64,
    ) -> KernelResult<Option<SolidHandle>> {
        if is_board {
            if let Some(points) = outline {
                if points.len() >= 3 {
                    let contour: Vec<[f64; 2]> = points.iter().map(|p| [p.x, p.y]).collect();
                    let section = scope.section(self.kernel.cross_section(&[contour])?);
                    return Ok(Some(scope.solid(self.kernel.extrude(section, thickness)?)));
                }
            }
        }

        let mut all_points = Vec::new();
        for shape in flat {
            if let Some(contour) = offset_contour(&shape.geometry, 0.0, &self.config) {
                all_points.extend(contour);
            }
        }
        let Some((min, max)) = bounds(&all_points) else {
            return Ok(None);
        };
        let width = (max.x - min.x).max(0.001);
        let height = (max.y - min.y).max(0.001);
        let block = scope.solid(self.kernel.make_box(width, height, thickness, false)?);
        Ok(Some(scope.solid(self.kernel.translate(
            block,
            [min.x, min.y, 0.0],
        )?)))
    }

    /// Full-height cutting tool matching the shape's 2D footprint,
    /// overshooting both faces by the through margin.
    fn build_tool(
        &self,
        scope: &mut HandleScope<'a>,
        geometry: &FlatGeometry,
        thickness: f64,
    ) -> KernelResult<Option<SolidHandle>> {
        let margin = self.config.through_margin;
        let height = thickness + 2.0 * margin;
        match geometry {
            FlatGeometry::Circle { center, diameter } => {
                let radius = (diameter / 2.0).max(0.001);
                let cylinder = scope.solid(self.kernel.make_cylinder(
                    height,
                    radius,
                    self.config.circle_segments,
                    false,
                )?);
                Ok(Some(scope.solid(self.kernel.translate(
                    cylinder,
                    [center.x, center.y, -margin],
                )?)))
            }
            FlatGeometry::RoundedRect {
                center,
                width,
                height: rect_height,
                corner_radius,
                rotation_deg,
            } if *corner_radius < 0.001 => {
                let block = scope.solid(self.kernel.make_box(
                    width.max(0.001),
                    rect_height.max(0.001),
                    height,
                    true,
                )?);
                let rotated = scope.solid(self.kernel.rotate(block, [0.0, 0.0, *rotation_deg])?);
                Ok(Some(scope.solid(self.kernel.translate(
                    rotated,
                    [center.x, center.y, thickness / 2.0],
                )?)))
            }
            _ => self.extrude_contour(scope, geometry, 0.0, height, -margin),
        }
    }

    /// Restore plug filling the uncut thickness of a partial pocket.
    /// Grown laterally by the restore epsilon so its walls land just
    /// inside the surrounding material instead of coinciding with the
    /// freshly cut opening; the union absorbs the overlap, leaving the
    /// pocket wall gap-free.
    fn build_restore_plug(
        &self,
        scope: &mut HandleScope<'a>,
        geometry: &FlatGeometry,
        height: f64,
        side: CarveSide,
        thickness: f64,
    ) -> KernelResult<Option<SolidHandle>> {
        if height <= 0.0 {
            return Ok(None);
        }
        let z = match side {
            // Top-side pockets keep their material below.
            CarveSide::Top => 0.0,
            CarveSide::Bottom => thickness - height,
        };
        let grow = -self.config.restore_epsilon;
        match self.extrude_contour(scope, geometry, grow, height, z)? {
            Some(plug) => Ok(Some(plug)),
            // Shapes that cannot offset fall back to the exact
            // footprint.
            None => self.extrude_contour(scope, geometry, 0.0, height, z),
        }
    }

    fn extrude_contour(
        &self,
        scope: &mut HandleScope<'a>,
        geometry: &FlatGeometry,
        offset: f64,
        height: f64,
        z: f64,
    ) -> KernelResult<Option<SolidHandle>> {
        let Some(points) = offset_contour(geometry, offset, &self.config) else {
            return Ok(None);
        };
        if points.len() < 3 {
            return Ok(None);
        }
        let contour: Vec<[f64; 2]> = points.iter().map(|p| [p.x, p.y]).collect();
        let section = scope.section(self.kernel.cross_section(&[contour])?);
        let column = scope.solid(self.kernel.extrude(section, height)?);
        Ok(Some(scope.solid(self.kernel.translate(
            column,
            [0.0, 0.0, z],
        )?)))
    }

    fn resolve_radius(
        &self,
        shape: &FlatShape,
        assignment: &stackcarve_core::model::LayerAssignment,
    ) -> f64 {
        let requested = match &assignment.endmill_radius {
            Some(expr) => match expr.eval(self.params) {
                Ok(value) => value,
                Err(err) => {
                    warn!(shape = %shape.shape_id, %err, "radius expression failed; no fillet");
                    return 0.0;
                }
            },
            None => return 0.0,
        };
        let Some(governing) = governing_dimension(&shape.geometry) else {
            return 0.0;
        };
        requested.clamp(0.0, (governing / 2.0 - 0.01).max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::CsgrsKernel;
    use stackcarve_core::model::{Footprint, LayerAssignment, Shape};

    fn board_footprint() -> Footprint {
        Footprint::board(
            "panel",
            vec![
                stackcarve_core::model::Point::new(0.0, 0.0),
                stackcarve_core::model::Point::new(20.0, 0.0),
                stackcarve_core::model::Point::new(20.0, 20.0),
                stackcarve_core::model::Point::new(0.0, 20.0),
            ],
        )
    }

    #[test]
    fn test_kernel_not_ready_is_refused() {
        let kernel = CsgrsKernel::new();
        let registry = FootprintRegistry::new();
        let params = ParamSet::new();
        let builder = LayerSolidBuilder::new(&kernel, &registry, &params, BuildConfig::default());
        let layer = StackupLayer::new(0, 2.0, LayerKind::Cut);
        let missing = uuid::Uuid::new_v4();
        assert!(matches!(
            builder.build_layer(&missing, &layer),
            Err(BuildError::KernelNotReady)
        ));
    }

    #[test]
    fn test_unknown_footprint_is_refused() {
        let kernel = CsgrsKernel::ready();
        let registry = FootprintRegistry::new();
        let params = ParamSet::new();
        let builder = LayerSolidBuilder::new(&kernel, &registry, &params, BuildConfig::default());
        let layer = StackupLayer::new(0, 2.0, LayerKind::Cut);
        let missing = uuid::Uuid::new_v4();
        assert!(matches!(
            builder.build_layer(&missing, &layer),
            Err(BuildError::UnknownFootprint(_))
        ));
    }

    #[test]
    fn test_plain_board_volume() {
        let kernel = CsgrsKernel::ready();
        let mut registry = FootprintRegistry::new();
        let id = registry.insert(board_footprint());
        let params = ParamSet::new();
        let builder = LayerSolidBuilder::new(&kernel, &registry, &params, BuildConfig::default());
        let layer = StackupLayer::new(0, 2.0, LayerKind::Cut);

        let output = builder.build_layer(&id, &layer).unwrap();
        assert!(!output.errored);
        assert!((output.mesh.volume() - 800.0).abs() < 1.0);
    }

    #[test]
    fn test_handles_balance_after_build() {
        let kernel = CsgrsKernel::ready();
        let mut registry = FootprintRegistry::new();
        let layer = StackupLayer::new(0, 2.0, LayerKind::Cut);
        let footprint = board_footprint().with_shape(
            Shape::circle("hole", 4.0)
                .at(10.0, 10.0)
                .assign_layer(layer.id, LayerAssignment::new(2.0)),
        );
        let id = registry.insert(footprint);
        let params = ParamSet::new();
        let builder = LayerSolidBuilder::new(&kernel, &registry, &params, BuildConfig::default());

        builder.build_layer(&id, &layer).unwrap();
        assert_eq!(kernel.live_handles(), 0);
        assert_eq!(kernel.dispose_calls(), kernel.created_calls());
    }
}
