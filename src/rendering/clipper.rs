/// Viewport clipping in raster space.
///
/// Triangles straddling the screen border are clipped against the four
/// viewport edges (Sutherland-Hodgman) with vertex attributes carried along,
/// then the surviving convex polygon is fanned back into triangles. New
/// vertices are appended to the [`TransformedMesh`]; original vertices keep
/// their index.
use super::rasterizer::edge_function;
use super::vertex_stage::{raster_to_ndc, TransformedMesh, VertexOut};
use crate::perf::RENDER_COUNTERS;
use crate::count_call;
use glam::Vec2;

/// Intersections this close to the screen border are clamped onto it.
pub const SNAP_MARGIN: f32 = 0.01;

/// Fan candidates must turn by more than this (radians) to be used.
const ANGLE_EPSILON: f32 = f32::EPSILON;

/// Consecutive polygon points closer than this are merged.
const MERGE_DISTANCE: f32 = 1e-4;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= 0.0 && p.x <= self.width && p.y >= 0.0 && p.y <= self.height
    }

    /// Corners in clip order; edge `i` runs from corner `i + 1` to corner `i`,
    /// giving left, bottom, right, top.
    fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, self.height),
            Vec2::new(self.width, self.height),
            Vec2::new(self.width, 0.0),
        ]
    }

    /// Cohen-Sutherland style region bits.
    #[inline]
    fn outcode(&self, p: Vec2) -> u8 {
        let mut code = 0;
        if p.x < 0.0 {
            code |= 1;
        } else if p.x > self.width {
            code |= 2;
        }
        if p.y < 0.0 {
            code |= 4;
        } else if p.y > self.height {
            code |= 8;
        }
        code
    }

    #[inline]
    fn snap(&self, p: Vec2) -> Vec2 {
        let m = SNAP_MARGIN;
        let near = p.x >= -m && p.x <= self.width + m && p.y >= -m && p.y <= self.height + m;
        if near {
            Vec2::new(p.x.clamp(0.0, self.width), p.y.clamp(0.0, self.height))
        } else {
            p
        }
    }
}

/// What happened to one source triangle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClipResult {
    /// Fully on screen, indices copied unchanged.
    Accepted,
    /// Replaced by this many triangles.
    Clipped(usize),
    /// Off screen, behind the eye, or clipped away.
    Discarded,
    /// Repeated index.
    Degenerate,
}

#[derive(Copy, Clone, Debug)]
struct ClipVertex {
    raster: Vec2,
    attributes: VertexOut,
    /// Index of the mesh vertex this point is, if it was not generated.
    source: Option<u32>,
}

/// Reusable clipping state. Buffers keep their capacity between triangles.
pub struct Clipper {
    viewport: Viewport,
    polygon: Vec<ClipVertex>,
    scratch: Vec<ClipVertex>,
    polygon_indices: Vec<u32>,
    fan: Vec<[usize; 3]>,
}

impl Clipper {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            polygon: Vec::with_capacity(8),
            scratch: Vec::with_capacity(8),
            polygon_indices: Vec::with_capacity(8),
            fan: Vec::with_capacity(6),
        }
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Rebuild `mesh.indices` from the source triangles. Returns the number
    /// of triangles in the working index list.
    pub fn clip_mesh<I>(&mut self, triangles: I, mesh: &mut TransformedMesh) -> usize
    where
        I: IntoIterator<Item = [u32; 3]>,
    {
        mesh.indices.clear();
        for triangle in triangles {
            self.clip_triangle(triangle, mesh);
        }
        mesh.triangle_count()
    }

    /// Clip one triangle, appending its replacement to `mesh.indices`.
    pub fn clip_triangle(&mut self, triangle: [u32; 3], mesh: &mut TransformedMesh) -> ClipResult {
        count_call!(RENDER_COUNTERS.triangles_submitted);

        let [i0, i1, i2] = triangle;
        if i0 == i1 || i1 == i2 || i0 == i2 {
            count_call!(RENDER_COUNTERS.triangles_degenerate);
            return ClipResult::Degenerate;
        }

        let vertices = triangle.map(|i| mesh.vertices[i as usize]);
        if vertices.iter().any(VertexOut::is_behind_eye) {
            count_call!(RENDER_COUNTERS.triangles_discarded);
            return ClipResult::Discarded;
        }

        let raster = triangle.map(|i| mesh.raster[i as usize]);
        if raster.iter().all(|&p| self.viewport.contains(p)) {
            count_call!(RENDER_COUNTERS.triangles_accepted);
            mesh.indices.extend_from_slice(&triangle);
            return ClipResult::Accepted;
        }

        let codes = raster.map(|p| self.viewport.outcode(p));
        if codes[0] & codes[1] & codes[2] != 0 {
            count_call!(RENDER_COUNTERS.triangles_discarded);
            return ClipResult::Discarded;
        }

        self.polygon.clear();
        for k in 0..3 {
            self.polygon.push(ClipVertex {
                raster: raster[k],
                attributes: vertices[k],
                source: Some(triangle[k]),
            });
        }
        self.clip_polygon();
        self.merge_duplicate_points();
        self.drop_collinear_points();

        if self.polygon.len() < 3 {
            count_call!(RENDER_COUNTERS.triangles_discarded);
            return ClipResult::Discarded;
        }

        self.emit_polygon(mesh);

        let facing = edge_function(raster[0], raster[1], raster[2]);
        let emitted = if self.polygon_indices.len() == 3 {
            let [a, b, c] = [
                self.polygon_indices[0],
                self.polygon_indices[1],
                self.polygon_indices[2],
            ];
            mesh.indices
                .extend_from_slice(&order_triangle([a, b, c], &mesh.raster, facing));
            1
        } else {
            let points: Vec<Vec2> = self.polygon.iter().map(|v| v.raster).collect();
            triangulate_convex(&points, &mut self.fan);
            for &[a, b, c] in &self.fan {
                let tri = [
                    self.polygon_indices[a],
                    self.polygon_indices[b],
                    self.polygon_indices[c],
                ];
                mesh.indices
                    .extend_from_slice(&order_triangle(tri, &mesh.raster, facing));
            }
            self.fan.len()
        };

        log::trace!(
            "clipped triangle {:?} into {} triangles ({} polygon vertices)",
            triangle,
            emitted,
            self.polygon.len()
        );

        if emitted == 0 {
            count_call!(RENDER_COUNTERS.triangles_discarded);
            return ClipResult::Discarded;
        }
        count_call!(RENDER_COUNTERS.triangles_clipped);
        ClipResult::Clipped(emitted)
    }

    /// Sutherland-Hodgman against left, bottom, right, top.
    fn clip_polygon(&mut self) {
        let corners = self.viewport.corners();

        for i in 0..4 {
            if self.polygon.is_empty() {
                return;
            }
            let edge_start = corners[(i + 1) % 4];
            let edge_end = corners[i];

            self.scratch.clear();
            let n = self.polygon.len();
            for j in 0..n {
                let current = self.polygon[j];
                let previous = self.polygon[(j + n - 1) % n];
                let current_inside = is_inside(edge_start, edge_end, current.raster);
                let previous_inside = is_inside(edge_start, edge_end, previous.raster);

                match (previous_inside, current_inside) {
                    (true, true) => self.scratch.push(current),
                    (true, false) => {
                        let hit = self.intersect(&previous, &current, edge_start, edge_end);
                        self.scratch.push(hit);
                    }
                    (false, true) => {
                        let hit = self.intersect(&previous, &current, edge_start, edge_end);
                        self.scratch.push(hit);
                        self.scratch.push(current);
                    }
                    (false, false) => {}
                }
            }

            std::mem::swap(&mut self.polygon, &mut self.scratch);
        }
    }

    /// Point where polygon edge previous->current crosses the clip edge, with
    /// attributes weighted by distance to both endpoints and corrected for
    /// perspective.
    fn intersect(
        &self,
        previous: &ClipVertex,
        current: &ClipVertex,
        edge_start: Vec2,
        edge_end: Vec2,
    ) -> ClipVertex {
        let point = line_intersection(previous.raster, current.raster, edge_start, edge_end)
            .unwrap_or(current.raster);
        let point = self.viewport.snap(point);

        let total = previous.raster.distance(current.raster);
        let t = if total > 0.0 {
            (point.distance(previous.raster) / total).clamp(0.0, 1.0)
        } else {
            0.0
        };

        ClipVertex {
            raster: point,
            attributes: previous.attributes.lerp_screen(&current.attributes, t),
            source: None,
        }
    }

    /// Drop zero-length polygon edges, preferring to keep original vertices.
    fn merge_duplicate_points(&mut self) {
        self.scratch.clear();
        for &v in &self.polygon {
            match self.scratch.last_mut() {
                Some(last) if last.raster.distance(v.raster) < MERGE_DISTANCE => {
                    if last.source.is_none() && v.source.is_some() {
                        *last = v;
                    }
                }
                _ => self.scratch.push(v),
            }
        }
        if self.scratch.len() > 1 {
            let first = self.scratch[0];
            let last_index = self.scratch.len() - 1;
            let last = self.scratch[last_index];
            if first.raster.distance(last.raster) < MERGE_DISTANCE {
                if first.source.is_none() && last.source.is_some() {
                    self.scratch[0] = last;
                }
                self.scratch.pop();
            }
        }
        std::mem::swap(&mut self.polygon, &mut self.scratch);
    }

    /// Remove points lying on the segment between their neighbours. The fan
    /// skips zero-turn candidates, so such points would cost coverage.
    fn drop_collinear_points(&mut self) {
        let n = self.polygon.len();
        if n <= 3 {
            return;
        }
        self.scratch.clear();
        for j in 0..n {
            let previous = self.polygon[(j + n - 1) % n].raster;
            let next = self.polygon[(j + 1) % n].raster;
            let current = self.polygon[j];
            let span = previous.distance(next);
            if edge_function(previous, next, current.raster).abs() > MERGE_DISTANCE * span {
                self.scratch.push(current);
            }
        }
        std::mem::swap(&mut self.polygon, &mut self.scratch);
    }

    /// Resolve every polygon point to a mesh index, appending generated ones.
    fn emit_polygon(&mut self, mesh: &mut TransformedMesh) {
        let Viewport { width, height } = self.viewport;
        self.polygon_indices.clear();

        for v in &self.polygon {
            let index = match v.source {
                Some(index) => index,
                None => {
                    let ndc = raster_to_ndc(v.raster, width, height).clamp(Vec2::NEG_ONE, Vec2::ONE);
                    let mut attributes = v.attributes;
                    attributes.position.x = ndc.x;
                    attributes.position.y = ndc.y;
                    count_call!(RENDER_COUNTERS.clip_vertices_created);
                    mesh.push_vertex(attributes, v.raster)
                }
            };
            self.polygon_indices.push(index);
        }
    }
}

/// True when `p` is on the inner side of the clip edge (boundary included).
#[inline]
fn is_inside(edge_start: Vec2, edge_end: Vec2, p: Vec2) -> bool {
    (edge_end - edge_start).perp_dot(p - edge_start) >= 0.0
}

/// Intersection of the infinite lines through a0-a1 and b0-b1.
#[inline]
pub fn line_intersection(a0: Vec2, a1: Vec2, b0: Vec2, b1: Vec2) -> Option<Vec2> {
    let da = a1 - a0;
    let db = b1 - b0;
    let det = da.perp_dot(db);
    if det.abs() < f32::EPSILON {
        return None;
    }
    let t = (b0 - a0).perp_dot(db) / det;
    Some(a0 + da * t)
}

#[inline]
fn signed_angle(from: Vec2, to: Vec2) -> f32 {
    from.perp_dot(to).atan2(from.dot(to))
}

/// Fan-triangulate a convex polygon from its first point.
///
/// The first fan edge goes to the neighbour that has every other point on
/// its positive side; each following step picks the remaining point with the
/// smallest positive turn from the current edge. Candidates at (near) zero
/// turn are collinear with the current edge and dropped; equal turns go to
/// the point nearest the anchor.
pub fn triangulate_convex(points: &[Vec2], out: &mut Vec<[usize; 3]>) {
    out.clear();
    let n = points.len();
    if n < 3 {
        return;
    }

    let origin = points[0];
    let mut remaining: Vec<usize> = (1..n).collect();
    let start = remaining
        .iter()
        .copied()
        .find(|&c| {
            let edge = points[c] - origin;
            remaining
                .iter()
                .all(|&k| k == c || signed_angle(edge, points[k] - origin) >= -ANGLE_EPSILON)
        })
        .unwrap_or(1);
    remaining.retain(|&k| k != start);

    let mut current = start;
    while !remaining.is_empty() {
        let edge = points[current] - origin;
        let mut best: Option<(usize, f32, f32)> = None;

        for (slot, &k) in remaining.iter().enumerate() {
            let candidate = points[k] - origin;
            let angle = signed_angle(edge, candidate);
            if angle <= ANGLE_EPSILON {
                continue;
            }
            let distance = candidate.length_squared();
            let better = match best {
                None => true,
                Some((_, best_angle, best_distance)) => {
                    angle < best_angle - ANGLE_EPSILON
                        || (angle <= best_angle + ANGLE_EPSILON && distance < best_distance)
                }
            };
            if better {
                best = Some((slot, angle, distance));
            }
        }

        let Some((slot, _, _)) = best else {
            break;
        };
        let next = remaining.swap_remove(slot);
        out.push([0, current, next]);
        current = next;
    }
}

/// Rotate the topmost (then leftmost) vertex first and make the winding
/// agree with `facing`, the signed area of the source triangle.
/// Negative areas are kept for back-facing sources instead of always being
/// swapped positive, so culling still sees the source's facing.
pub fn order_triangle(triangle: [u32; 3], raster: &[Vec2], facing: f32) -> [u32; 3] {
    let p = triangle.map(|i| raster[i as usize]);
    let top = (0..3)
        .min_by(|&a, &b| p[a].y.total_cmp(&p[b].y).then(p[a].x.total_cmp(&p[b].x)))
        .unwrap_or(0);

    let mut ordered = [
        triangle[top],
        triangle[(top + 1) % 3],
        triangle[(top + 2) % 3],
    ];
    let area = edge_function(
        raster[ordered[0] as usize],
        raster[ordered[1] as usize],
        raster[ordered[2] as usize],
    );
    let facing = if facing < 0.0 { -1.0 } else { 1.0 };
    if area * facing < 0.0 {
        ordered.swap(1, 2);
    }
    ordered
}
