//! The Expanding Polytope Algorithm, for penetration depth between overlapping shapes.
//!
//! EPA grows a convex polytope inside the Minkowski difference `A - B`, starting from the
//! terminal GJK simplex, until the face closest to the origin lies on the boundary of the
//! difference. That face gives the minimum translation separating the shapes.

use arrayvec::ArrayVec;
use glam::DVec3;
use hashbrown::HashMap;
use tracing::{debug, trace, warn};

use crate::{
    collision::{CollisionResult, Termination},
    gjk::{support_point, GjkDetector},
    polytope::{polygon_barycentric, ConvexPolytope, VertexKey},
    simplex::{Simplex, SupportPoint},
    support::SupportingVertex,
    Error,
};

// Replaces exactly zero direction components, so that support functions which break ties by
// comparing components still explore the expected side.
const ZERO_COMPONENT_NUDGE: f64 = 1.234e-16;

fn nudge(direction: DVec3) -> DVec3 {
    let fix = |c: f64| if c == 0.0 { ZERO_COMPONENT_NUDGE } else { c };
    DVec3::new(fix(direction.x), fix(direction.y), fix(direction.z))
}

/// The full state of a finished EPA query.
#[derive(Copy, Clone, Debug)]
pub struct EpaOutcome {
    pub result: CollisionResult,
    pub iterations: usize,
    pub termination: Termination,
}

/// Penetration depth queries between overlapping convex shapes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EpaDetector {
    epsilon: f64,
    max_iterations: usize,
}

impl Default for EpaDetector {
    fn default() -> Self {
        EpaDetector {
            epsilon: Self::DEFAULT_EPSILON,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl EpaDetector {
    pub const DEFAULT_EPSILON: f64 = 1.0e-12;
    pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

    pub fn new() -> EpaDetector {
        EpaDetector::default()
    }

    /// Sets the smallest improvement of the closest-face distance worth another iteration.
    pub fn with_epsilon(self, epsilon: f64) -> EpaDetector {
        EpaDetector {
            epsilon: epsilon.abs(),
            ..self
        }
    }

    pub fn with_max_iterations(self, max_iterations: usize) -> EpaDetector {
        EpaDetector {
            max_iterations,
            ..self
        }
    }

    #[inline]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    #[inline]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Computes the penetration depth and axis of two overlapping shapes.
    ///
    /// `simplex` is normally the terminal simplex of a GJK query that reported a collision. The
    /// result's `normal_on_a` is the direction in which B must move, by `distance`, to separate
    /// the shapes.
    pub fn evaluate<A, B>(&self, a: &A, b: &B, simplex: &Simplex) -> Result<EpaOutcome, Error>
    where
        A: SupportingVertex + ?Sized,
        B: SupportingVertex + ?Sized,
    {
        let mut polytope = ConvexPolytope::new();
        let mut pairs: HashMap<VertexKey, SupportPoint> = HashMap::new();

        let mut seeds: ArrayVec<SupportPoint, 10> = simplex.points().copied().collect();
        if seeds.is_empty() {
            seeds.push(support_point(a, b, DVec3::X)?);
        }

        for seed in seeds {
            insert(&mut polytope, &mut pairs, seed)?;
        }

        // Touching or grazing contacts leave a flat simplex; widen it along the axes.
        for axis in [DVec3::X, -DVec3::X, DVec3::Y, -DVec3::Y, DVec3::Z, -DVec3::Z] {
            if polytope.is_full_dimensional() {
                break;
            }

            let w = support_point(a, b, nudge(axis))?;
            insert(&mut polytope, &mut pairs, w)?;
        }

        if !polytope.is_full_dimensional() {
            debug!("Minkowski difference is flat; reporting a touching contact");

            let (point_on_a, point_on_b) = simplex
                .closest_points()
                .unwrap_or_else(|| first_pair(&polytope, &pairs));

            return Ok(EpaOutcome {
                result: CollisionResult {
                    are_shapes_colliding: true,
                    distance: 0.0,
                    point_on_a,
                    point_on_b,
                    normal_on_a: DVec3::ZERO,
                    normal_on_b: DVec3::ZERO,
                },
                iterations: 0,
                termination: Termination::Converged,
            });
        }

        let mut iterations = 0;
        let mut termination = Termination::Converged;

        let (face_key, normal, depth) = loop {
            let face = polytope.closest_face(DVec3::ZERO).ok_or(Error::EmptyShape)?;
            let (face_key, normal) = (face.key(), face.normal());
            let depth = normal.dot(face.centroid());

            if iterations == self.max_iterations {
                warn!(iterations, depth, "EPA stopped at its iteration cap");
                termination = Termination::MaxIterations;
                break (face_key, normal, depth);
            }
            iterations += 1;

            let w = support_point(a, b, nudge(normal))?;
            let gain = normal.dot(w.point) - depth;
            trace!(iterations, depth, gain, "EPA iteration");

            if gain < self.epsilon {
                break (face_key, normal, depth);
            }

            if !insert(&mut polytope, &mut pairs, w)? {
                break (face_key, normal, depth);
            }
        };

        let depth = depth.max(0.0);

        // Witness points from the barycentric coordinates of the origin's projection on the face.
        let face = polytope.face(face_key).ok_or(Error::EmptyShape)?;
        let witnesses: ArrayVec<(DVec3, SupportPoint), 16> = face
            .vertices()
            .filter_map(|v| pairs.get(&v.key()).map(|sp| (v.position(), *sp)))
            .take(16)
            .collect();
        let positions: ArrayVec<DVec3, 16> = witnesses.iter().map(|(p, _)| *p).collect();
        let coords = polygon_barycentric(&positions, depth * normal);

        let mut point_on_a = DVec3::ZERO;
        let mut point_on_b = DVec3::ZERO;
        for (c, (_, sp)) in coords.iter().zip(&witnesses) {
            point_on_a += *c * sp.on_a;
            point_on_b += *c * sp.on_b;
        }

        debug!(iterations, depth, "EPA finished");

        Ok(EpaOutcome {
            result: CollisionResult {
                are_shapes_colliding: true,
                distance: depth,
                point_on_a,
                point_on_b,
                normal_on_a: normal,
                normal_on_b: -normal,
            },
            iterations,
            termination,
        })
    }
}

// Adds a support point to the polytope, remembering which points of A and B produced it.
fn insert(
    polytope: &mut ConvexPolytope,
    pairs: &mut HashMap<VertexKey, SupportPoint>,
    point: SupportPoint,
) -> Result<bool, Error> {
    match polytope.add_vertex(point.point) {
        Ok(true) => {}
        Ok(false) | Err(Error::DegenerateHorizon) => return Ok(false),
        Err(e) => return Err(e),
    }

    // Vertices keep their positions bit for bit, and the newest one is last.
    if let Some(v) = polytope
        .vertices()
        .filter(|v| v.position() == point.point)
        .last()
    {
        pairs.insert(v.key(), point);
    }

    Ok(true)
}

fn first_pair(
    polytope: &ConvexPolytope,
    pairs: &HashMap<VertexKey, SupportPoint>,
) -> (DVec3, DVec3) {
    polytope
        .vertices()
        .find_map(|v| pairs.get(&v.key()))
        .map_or((DVec3::ZERO, DVec3::ZERO), |sp| (sp.on_a, sp.on_b))
}

/// The state of a finished hybrid query.
#[derive(Copy, Clone, Debug)]
pub struct HybridOutcome {
    pub result: CollisionResult,
    pub gjk_iterations: usize,
    pub gjk_termination: Termination,
    /// `None` if the shapes were disjoint and EPA did not run.
    pub epa_iterations: Option<usize>,
    pub epa_termination: Option<Termination>,
}

/// GJK for separated shapes, refined by EPA when they overlap.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct HybridDetector {
    pub gjk: GjkDetector,
    pub epa: EpaDetector,
}

impl HybridDetector {
    /// Constructs a detector using `epsilon` as both the GJK collision tolerance and the EPA
    /// convergence tolerance.
    pub fn new(epsilon: f64) -> HybridDetector {
        HybridDetector {
            gjk: GjkDetector::new().with_epsilon(epsilon),
            epa: EpaDetector::new().with_epsilon(epsilon),
        }
    }

    pub fn evaluate<A, B>(&self, a: &A, b: &B) -> Result<HybridOutcome, Error>
    where
        A: SupportingVertex + ?Sized,
        B: SupportingVertex + ?Sized,
    {
        let gjk = self.gjk.evaluate(a, b)?;

        if !gjk.result.are_shapes_colliding {
            return Ok(HybridOutcome {
                result: gjk.result,
                gjk_iterations: gjk.iterations,
                gjk_termination: gjk.termination,
                epa_iterations: None,
                epa_termination: None,
            });
        }

        let epa = self.epa.evaluate(a, b, &gjk.simplex)?;

        Ok(HybridOutcome {
            result: epa.result,
            gjk_iterations: gjk.iterations,
            gjk_termination: gjk.termination,
            epa_iterations: Some(epa.iterations),
            epa_termination: Some(epa.termination),
        })
    }
}
