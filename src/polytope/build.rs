//! Incremental insertion.
//!
//! A polytope grows one point at a time through its degenerate forms (point, segment, polygon)
//! until a point leaves the polygon's plane, after which every insertion removes the faces the
//! point can see and closes the hole with a cone of triangles around the horizon. Coplanar
//! neighbors are merged back into single polygons, and vertices left in the middle of a straight
//! edge are dropped.
//!
//! Merging is only kept when the result is still a closed mesh that encloses the previous
//! vertices and the new point. Otherwise the insertion is replayed without merging, which leaves
//! the cone as plain triangles.

use glam::DVec3;
use hashbrown::HashSet;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::{
    face::FaceData,
    half_edge::{EdgeData, EdgeKey},
    vertex::{VertexData, VertexKey},
    ConvexPolytope, Face, FaceKey,
};
use crate::{Error, Segment};

impl ConvexPolytope {
    /// Inserts `point` into the hull.
    ///
    /// Returns `Ok(true)` if the mesh changed and `Ok(false)` if the point already lies inside the
    /// hull or on its boundary, within the construction epsilon.
    ///
    /// # Errors
    ///
    /// Non-finite points are rejected with [`Error::InvalidData`]. A point outside the hull whose
    /// visible faces do not form a disk is rejected with [`Error::DegenerateHorizon`]. In both
    /// cases the mesh is left untouched.
    pub fn add_vertex(&mut self, point: DVec3) -> Result<bool, Error> {
        if !point.is_finite() {
            return Err(Error::InvalidData);
        }

        let changed = match self.faces.len() {
            0 => {
                let v = self.push_vertex(point);
                self.rebuild_flat(&[v]);
                true
            }
            1 => self.add_to_flat(point)?,
            _ => self.add_to_hull(point)?,
        };

        if changed {
            self.update_geometry();
            self.debug_validate();
        } else {
            trace!(?point, "point absorbed by hull");
        }

        Ok(changed)
    }

    /// Inserts every point in order.
    ///
    /// All points are checked for finiteness before any is inserted. Returns `true` if any
    /// insertion changed the mesh. A rejected point stops the loop, keeping the points inserted
    /// before it.
    pub fn add_vertices<I>(&mut self, points: I) -> Result<bool, Error>
    where
        I: IntoIterator<Item = DVec3>,
    {
        let points: Vec<DVec3> = points.into_iter().collect();

        if points.iter().any(|p| !p.is_finite()) {
            return Err(Error::InvalidData);
        }

        let mut changed = false;
        for p in points {
            changed |= self.add_vertex(p)?;
        }

        Ok(changed)
    }

    // Single face: a point, a segment or a polygon.
    fn add_to_flat(&mut self, point: DVec3) -> Result<bool, Error> {
        let face = self.face_order[0];
        let cycle = self.face_cycle(face);

        match cycle.len() {
            1 => {
                let v = cycle[0];
                if self.vertices[v].position.distance(point) <= self.epsilon {
                    return Ok(false);
                }

                let new = self.push_vertex(point);
                debug!("point polytope grows into a segment");
                self.rebuild_flat(&[v, new]);
                Ok(true)
            }
            2 => Ok(self.add_to_segment(cycle[0], cycle[1], point)),
            _ => self.add_to_polygon(face, point),
        }
    }

    fn add_to_segment(&mut self, a: VertexKey, b: VertexKey, point: DVec3) -> bool {
        let eps = self.epsilon;
        let pa = self.vertices[a].position;
        let pb = self.vertices[b].position;

        if pa.distance(point) <= eps || pb.distance(point) <= eps {
            return false;
        }

        let segment = Segment::new(pa, pb);

        if segment.distance_to_line(point) <= eps {
            let t = segment.closest_point_to_point(point).t;
            if (0.0..=1.0).contains(&t) {
                return false;
            }

            // The endpoint on the near side of `point` becomes interior.
            let new = self.push_vertex(point);
            if t < 0.0 {
                self.rebuild_flat(&[new, b]);
            } else {
                self.rebuild_flat(&[a, new]);
            }

            return true;
        }

        let new = self.push_vertex(point);
        debug!("segment polytope grows into a triangle");
        self.rebuild_flat(&[a, b, new]);
        true
    }

    fn add_to_polygon(&mut self, face: FaceKey, point: DVec3) -> Result<bool, Error> {
        let eps = self.epsilon;
        let polygon = Face::new(self, face);
        let d = polygon.signed_distance_to_plane(point);

        if d.abs() > eps {
            self.extrude(face, point, d)?;
            return Ok(true);
        }

        let sight = match polygon.line_of_sight(point, eps) {
            Some(run) => Some(run),
            // A point past a sharp corner can be within epsilon of both edge lines.
            None if polygon.distance(point) > eps => polygon.line_of_sight(point, 0.0),
            None => None,
        };
        let Some((start, end)) = sight else {
            return Ok(false);
        };

        let cycle = self.face_cycle(face);
        let n = cycle.len();

        // Keep the vertices from the end of the visible run around to its start.
        let mut kept: SmallVec<[VertexKey; 8]> = SmallVec::new();
        let mut i = (end + 1) % n;
        loop {
            kept.push(cycle[i]);
            if i == start {
                break;
            }
            i = (i + 1) % n;
        }

        if kept.len() < 2 {
            warn!(?point, "every polygon edge sees an in-plane point");
            return Ok(false);
        }

        let new = self.push_vertex(point);
        kept.push(new);
        self.prune_collinear(&mut kept, new);
        self.rebuild_flat(&kept);
        Ok(true)
    }

    // Drops polygon vertices lying on the line through their neighbors.
    fn prune_collinear(&self, cycle: &mut SmallVec<[VertexKey; 8]>, keep: VertexKey) {
        'scan: while cycle.len() > 3 {
            let n = cycle.len();

            for i in 0..n {
                let v = cycle[i];
                if v == keep {
                    continue;
                }

                let prev = self.vertices[cycle[(i + n - 1) % n]].position;
                let next = self.vertices[cycle[(i + 1) % n]].position;
                let line = Segment::new(prev, next);

                if line.distance_to_line(self.vertices[v].position) <= self.epsilon {
                    cycle.remove(i);
                    continue 'scan;
                }
            }

            break;
        }
    }

    // First point off the plane of a single polygon: the polygon becomes the base of a cone.
    fn extrude(&mut self, face: FaceKey, point: DVec3, d: f64) -> Result<(), Error> {
        debug!(base_edges = self.faces[face].edges.len(), "polygon extruded into a solid");

        self.grow_checked(point, |polytope, merge| {
            let mut base = face;

            if d > 0.0 {
                // The base must face away from the apex.
                let mut cycle = polytope.face_cycle(base);
                cycle.reverse();
                base = polytope.rebuild_flat(&cycle);
            }

            let horizon = polytope.faces[base].edges.clone();
            polytope.attach_cone(&[], &horizon, point, merge);
        })
    }

    fn add_to_hull(&mut self, point: DVec3) -> Result<bool, Error> {
        let eps = self.epsilon;

        let mut visible = HashSet::new();
        let mut farthest: Option<(FaceKey, f64)> = None;

        for face in self.faces() {
            let d = face.signed_distance_to_plane(point);
            if d > eps {
                visible.insert(face.key());

                if farthest.map_or(true, |(_, best)| d > best) {
                    farthest = Some((face.key(), d));
                }
            }
        }

        if farthest.is_none() {
            // Plane distances understate the true distance beyond sharp edges.
            if self.distance(point) <= eps {
                return Ok(false);
            }

            for face in self.faces() {
                let d = face.signed_distance_to_plane(point);
                if d > 0.0 {
                    visible.insert(face.key());

                    if farthest.map_or(true, |(_, best)| d > best) {
                        farthest = Some((face.key(), d));
                    }
                }
            }
        }

        let Some((start, _)) = farthest else {
            return Ok(false);
        };

        let (region, horizon) = match self.find_horizon(start, &visible) {
            Some(found) => found,
            None => {
                // Faces nearly coplanar with the point can pinch the visible region; absorbing
                // them usually restores a simple horizon.
                let widened: HashSet<FaceKey> = self
                    .faces()
                    .filter(|face| face.signed_distance_to_plane(point) > -eps)
                    .map(|face| face.key())
                    .collect();

                match self.find_horizon(start, &widened) {
                    Some(found) => found,
                    None => {
                        warn!(?point, "visible region has no simple horizon; point rejected");
                        return Err(Error::DegenerateHorizon);
                    }
                }
            }
        };

        trace!(
            visible = region.len(),
            horizon = horizon.len(),
            "replacing visible faces"
        );

        self.grow_checked(point, |polytope, merge| {
            polytope.attach_cone(&region, &horizon, point, merge);
        })?;
        Ok(true)
    }

    // Runs `grow` with coplanar merging, then without it if merging broke the hull. On failure
    // the mesh is restored to its state before the call.
    fn grow_checked<F>(&mut self, point: DVec3, grow: F) -> Result<(), Error>
    where
        F: Fn(&mut ConvexPolytope, bool),
    {
        let before = self.clone();

        for merge in [true, false] {
            grow(self, merge);

            match self.check_growth(&before, point) {
                Ok(()) => return Ok(()),
                Err(reason) => {
                    debug!(merge, %reason, "insertion rolled back");
                    self.clone_from(&before);
                }
            }
        }

        warn!(?point, "no valid hull encloses the point; point rejected");
        Err(Error::DegenerateHorizon)
    }

    // The grown mesh must be valid, and every vertex it dropped as well as `point` must lie
    // within epsilon of it.
    fn check_growth(&self, before: &ConvexPolytope, point: DVec3) -> Result<(), String> {
        self.validate()?;

        let outside = before
            .vertex_order
            .iter()
            .filter(|&&v| !self.vertices.contains_key(v))
            .map(|&v| before.vertices[v].position)
            .chain([point])
            .find(|&p| self.distance(p) > self.epsilon);

        match outside {
            Some(p) => Err(format!("{p} is left {} outside the hull", self.distance(p))),
            None => Ok(()),
        }
    }

    // Replaces `region` by a cone from `point` over `horizon`.
    fn attach_cone(&mut self, region: &[FaceKey], horizon: &[EdgeKey], point: DVec3, merge: bool) {
        for &face in region {
            self.remove_face(face);
        }
        self.remove_orphan_vertices();

        let apex = self.push_vertex(point);
        let cone = self.build_cone(horizon, apex);

        if merge {
            self.merge_coplanar_faces(&cone);
            self.remove_redundant_vertices();
        }
    }

    /// Walks the faces reachable from `start` through `visible` faces.
    ///
    /// Returns the visited region and its horizon: the half-edges on the non-visible side of the
    /// region's boundary, ordered so that each edge ends where the next begins. Returns `None` if
    /// the boundary is not a simple loop.
    fn find_horizon(
        &self,
        start: FaceKey,
        visible: &HashSet<FaceKey>,
    ) -> Option<(Vec<FaceKey>, SmallVec<[EdgeKey; 16]>)> {
        let mut visited = HashSet::new();
        let mut region = vec![start];
        let mut horizon: SmallVec<[EdgeKey; 16]> = SmallVec::new();

        // (face, index of the first edge to examine, edges examined so far)
        let mut stack: Vec<(FaceKey, usize, usize)> = vec![(start, 0, 0)];
        visited.insert(start);

        while let Some(frame) = stack.last_mut() {
            let (face, entry, examined) = *frame;
            let edges = &self.faces[face].edges;
            let n = edges.len();

            if examined == n {
                stack.pop();
                continue;
            }

            frame.2 += 1;

            let edge = edges[(entry + examined) % n];
            let twin = self.edges[edge].twin?;
            let neighbor = self.edges[twin].face;

            if visible.contains(&neighbor) {
                if visited.insert(neighbor) {
                    region.push(neighbor);

                    // Continue around the neighbor just after the edge we crossed.
                    let crossed = self.faces[neighbor].edges.iter().position(|&e| e == twin)?;
                    stack.push((neighbor, crossed + 1, 0));
                }
            } else {
                horizon.push(twin);
            }
        }

        // The walk lists the boundary clockwise as seen from the non-visible side.
        horizon.reverse();

        if horizon.len() < 3 {
            return None;
        }

        let mut origins = HashSet::new();
        for (i, &edge) in horizon.iter().enumerate() {
            let next = horizon[(i + 1) % horizon.len()];

            if self.edges[edge].destination != self.edges[next].origin
                || !origins.insert(self.edges[edge].origin)
            {
                return None;
            }
        }

        Some((region, horizon))
    }

    // One triangle per horizon edge, all sharing `apex`.
    fn build_cone(&mut self, horizon: &[EdgeKey], apex: VertexKey) -> SmallVec<[FaceKey; 16]> {
        let n = horizon.len();
        let mut faces: SmallVec<[FaceKey; 16]> = SmallVec::with_capacity(n);
        let mut up: SmallVec<[EdgeKey; 16]> = SmallVec::with_capacity(n);
        let mut down: SmallVec<[EdgeKey; 16]> = SmallVec::with_capacity(n);

        for &h in horizon {
            let EdgeData {
                origin: a,
                destination: b,
                ..
            } = self.edges[h];

            // Loop b -> a -> apex: the base edge pairs with `h`.
            let face = self.push_face(&[b, a, apex]);
            let edges = &self.faces[face].edges;
            let (base, to_apex, from_apex) = (edges[0], edges[1], edges[2]);

            self.link_twins(base, h);
            up.push(to_apex);
            down.push(from_apex);
            faces.push(face);

            self.update_face_geometry(face);
        }

        for i in 0..n {
            self.link_twins(up[i], down[(i + n - 1) % n]);
        }

        faces
    }

    fn merge_coplanar_faces(&mut self, candidates: &[FaceKey]) {
        let mut stack: Vec<FaceKey> = candidates.to_vec();

        while let Some(face) = stack.pop() {
            if !self.faces.contains_key(face) {
                continue;
            }

            let neighbors: SmallVec<[FaceKey; 8]> = self.faces[face]
                .edges
                .iter()
                .filter_map(|&e| self.edges[e].twin)
                .map(|t| self.edges[t].face)
                .collect();

            for neighbor in neighbors {
                if neighbor == face || !self.faces.contains_key(neighbor) {
                    continue;
                }

                if self.is_face_in_plane_of(face, neighbor) && self.merge_faces(neighbor, face) {
                    stack.push(neighbor);
                    break;
                }
            }
        }
    }

    // Every vertex of `face` lies within epsilon of the plane of `other`.
    fn is_face_in_plane_of(&self, face: FaceKey, other: FaceKey) -> bool {
        let other = Face::new(self, other);

        Face::new(self, face)
            .vertices()
            .all(|v| other.signed_distance_to_plane(v.position()).abs() <= self.epsilon)
    }

    /// Merges `absorb` into `keep` across their shared chain of edges.
    ///
    /// Returns `false`, leaving both faces untouched, if the faces do not share a single
    /// contiguous chain.
    fn merge_faces(&mut self, keep: FaceKey, absorb: FaceKey) -> bool {
        let absorb_edges = self.faces[absorb].edges.clone();
        let keep_edges = self.faces[keep].edges.clone();

        let Some((absorb_start, shared)) = self.shared_run(&absorb_edges, keep) else {
            return false;
        };
        let Some((keep_start, keep_shared)) = self.shared_run(&keep_edges, absorb) else {
            return false;
        };

        let na = absorb_edges.len();
        let nk = keep_edges.len();

        if shared != keep_shared || shared == na || shared == nk {
            return false;
        }

        // The rest of `keep` starts where the shared chain begins on `absorb`, and the rest of
        // `absorb` starts where it ends.
        let mut merged: SmallVec<[EdgeKey; 8]> = SmallVec::with_capacity(na + nk - 2 * shared);
        for j in 0..nk - shared {
            merged.push(keep_edges[(keep_start + shared + j) % nk]);
        }
        for j in 0..na - shared {
            merged.push(absorb_edges[(absorb_start + shared + j) % na]);
        }

        for j in 0..shared {
            for e in [
                absorb_edges[(absorb_start + j) % na],
                keep_edges[(keep_start + j) % nk],
            ] {
                if let Some(edge) = self.edges.remove(e) {
                    self.vertices[edge.origin].detach(e);
                }
            }
        }

        self.faces.remove(absorb);
        self.face_order.retain(|f| *f != absorb);

        self.faces[keep].edges = merged;
        self.relink_loop(keep);
        self.remove_orphan_vertices();
        self.update_face_geometry(keep);

        debug!(shared, edges = self.faces[keep].edges.len(), "merged coplanar faces");
        true
    }

    // Finds the run of `edges` whose twins lie on `other`. Returns its start index and length if
    // the run is contiguous and non-empty.
    fn shared_run(&self, edges: &[EdgeKey], other: FaceKey) -> Option<(usize, usize)> {
        let n = edges.len();
        let shared: SmallVec<[bool; 8]> = edges
            .iter()
            .map(|&e| {
                self.edges[e]
                    .twin
                    .map_or(false, |t| self.edges[t].face == other)
            })
            .collect();

        let count = shared.iter().filter(|&&s| s).count();
        if count == 0 {
            return None;
        }

        if count == n {
            return Some((0, n));
        }

        let start = (0..n).find(|&i| shared[i] && !shared[(i + n - 1) % n])?;
        if (0..count).all(|j| shared[(start + j) % n]) {
            Some((start, count))
        } else {
            None
        }
    }

    // Removes vertices with only two incident edges that sit on the straight line between their
    // neighbors.
    fn remove_redundant_vertices(&mut self) {
        loop {
            let candidates: SmallVec<[VertexKey; 8]> = self
                .vertex_order
                .iter()
                .copied()
                .filter(|&v| self.vertices[v].edges.len() == 2)
                .collect();

            let mut progress = false;
            for v in candidates {
                if self.vertices.get(v).map_or(false, |data| data.edges.len() == 2) {
                    progress |= self.collapse_vertex(v);
                }
            }

            if !progress {
                break;
            }
        }
    }

    fn collapse_vertex(&mut self, v: VertexKey) -> bool {
        let &[out_a, out_b] = self.vertices[v].edges.as_slice() else {
            return false;
        };

        // Face A holds u -> v -> w, face B holds w -> v -> u.
        let in_a = self.edges[out_a].prev;
        let in_b = self.edges[out_b].prev;

        if self.edges[in_a].twin != Some(out_b) || self.edges[in_b].twin != Some(out_a) {
            return false;
        }

        let w = self.edges[out_a].destination;
        let u = self.edges[out_b].destination;
        if u == w {
            return false;
        }

        // A corner shared by only two faces is left for validation to reject.
        let line = Segment::new(self.vertices[u].position, self.vertices[w].position);
        let position = self.vertices[v].position;
        let t = line.closest_point_to_point(position).t;
        if line.distance_to_line(position) > self.epsilon || !(0.0..=1.0).contains(&t) {
            return false;
        }

        let face_a = self.edges[out_a].face;
        let face_b = self.edges[out_b].face;

        self.bypass(in_a, out_a, w);
        self.bypass(in_b, out_b, u);
        self.link_twins(in_a, in_b);

        self.vertices.remove(v);
        self.vertex_order.retain(|k| *k != v);
        debug!("removed vertex between collinear edges");

        for face in [face_a, face_b] {
            match self.faces.get(face).map(|f| f.edges.len()) {
                Some(n) if n < 3 => self.collapse_face(face),
                Some(_) => self.update_face_geometry(face),
                None => {}
            }
        }

        true
    }

    // Replaces `incoming -> outgoing` by a single edge ending at `destination`.
    fn bypass(&mut self, incoming: EdgeKey, outgoing: EdgeKey, destination: VertexKey) {
        let EdgeData { next, face, .. } = self.edges[outgoing];

        self.edges[incoming].destination = destination;
        self.edges[incoming].next = next;
        self.edges[next].prev = incoming;

        self.faces[face].edges.retain(|e| *e != outgoing);
        self.edges.remove(outgoing);
    }

    // A face reduced to two edges is glued shut: the faces on either side become neighbors.
    // Twins already deleted by an earlier collapse are skipped; a mesh left open by that is
    // caught by validation.
    fn collapse_face(&mut self, face: FaceKey) {
        let Some(data) = self.faces.remove(face) else {
            return;
        };
        self.face_order.retain(|f| *f != face);

        let mut twins: SmallVec<[EdgeKey; 2]> = SmallVec::new();
        for &e in &data.edges {
            if let Some(edge) = self.edges.remove(e) {
                if let Some(vertex) = self.vertices.get_mut(edge.origin) {
                    vertex.detach(e);
                }
                twins.extend(edge.twin);
            }
        }
        twins.retain(|t| self.edges.contains_key(*t));

        match twins.as_slice() {
            &[a, b] => self.link_twins(a, b),
            dangling => {
                for &t in dangling {
                    self.edges[t].twin = None;
                }
            }
        }

        self.remove_orphan_vertices();
        debug!("collapsed a two-edge face");
    }

    pub(crate) fn push_vertex(&mut self, position: DVec3) -> VertexKey {
        let key = self.vertices.insert(VertexData::new(position));
        self.vertex_order.push(key);
        key
    }

    // Removes every vertex without outgoing edges.
    fn remove_orphan_vertices(&mut self) {
        let vertices = &mut self.vertices;

        self.vertex_order.retain(|&k| {
            if vertices[k].edges.is_empty() {
                vertices.remove(k);
                false
            } else {
                true
            }
        });
    }

    /// Creates a face whose loop visits `cycle` in order. Twins are left unset.
    fn push_face(&mut self, cycle: &[VertexKey]) -> FaceKey {
        let face = self.faces.insert(FaceData::new());
        self.face_order.push(face);

        let n = cycle.len();
        let mut keys: SmallVec<[EdgeKey; 8]> = SmallVec::with_capacity(n);

        for i in 0..n {
            let origin = cycle[i];
            let destination = cycle[(i + 1) % n];

            let key = self.edges.insert_with_key(|key| EdgeData {
                origin,
                destination,
                face,
                twin: None,
                next: key,
                prev: key,
            });

            self.vertices[origin].attach(key);
            keys.push(key);
        }

        self.faces[face].edges = keys;
        self.relink_loop(face);
        face
    }

    fn remove_face(&mut self, face: FaceKey) {
        let Some(data) = self.faces.remove(face) else {
            return;
        };
        self.face_order.retain(|f| *f != face);

        for &e in &data.edges {
            let Some(edge) = self.edges.remove(e) else {
                continue;
            };

            if let Some(vertex) = self.vertices.get_mut(edge.origin) {
                vertex.detach(e);
            }

            if let Some(twin) = edge.twin.and_then(|t| self.edges.get_mut(t)) {
                if twin.twin == Some(e) {
                    twin.twin = None;
                }
            }
        }
    }

    /// Replaces the whole mesh by a single face over `cycle`, dropping vertices not in it.
    fn rebuild_flat(&mut self, cycle: &[VertexKey]) -> FaceKey {
        self.edges.clear();
        self.faces.clear();
        self.face_order.clear();
        for vertex in self.vertices.values_mut() {
            vertex.edges.clear();
        }

        let face = self.push_face(cycle);
        self.remove_orphan_vertices();
        self.update_face_geometry(face);
        face
    }

    fn link_twins(&mut self, a: EdgeKey, b: EdgeKey) {
        self.edges[a].twin = Some(b);
        self.edges[b].twin = Some(a);
    }

    // Rewires `next`, `prev` and `face` of every edge to follow the face's edge list.
    fn relink_loop(&mut self, face: FaceKey) {
        let edges = self.faces[face].edges.clone();
        let n = edges.len();

        for (i, &e) in edges.iter().enumerate() {
            let edge = &mut self.edges[e];
            edge.face = face;
            edge.next = edges[(i + 1) % n];
            edge.prev = edges[(i + n - 1) % n];
        }
    }

    pub(crate) fn face_cycle(&self, face: FaceKey) -> SmallVec<[VertexKey; 8]> {
        self.faces[face]
            .edges
            .iter()
            .map(|&e| self.edges[e].origin)
            .collect()
    }

    pub(crate) fn update_face_geometry(&mut self, face: FaceKey) {
        let positions: SmallVec<[DVec3; 8]> = self.faces[face]
            .edges
            .iter()
            .map(|&e| self.vertices[self.edges[e].origin].position)
            .collect();

        self.faces[face].update_geometry(&positions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_within(polytope: &ConvexPolytope, points: &[DVec3], tolerance: f64) {
        for &p in points {
            let d = polytope.distance(p);
            assert!(d <= tolerance, "{p} is {d} outside the hull");
        }
    }

    #[test]
    fn ring_of_faces_has_no_horizon() {
        let cube = ConvexPolytope::cube(1.0).unwrap();

        let ring: HashSet<FaceKey> = cube
            .faces()
            .filter(|f| f.normal().z.abs() < 0.5)
            .map(|f| f.key())
            .collect();
        let start = *ring.iter().next().unwrap();
        assert_eq!(ring.len(), 4);
        assert!(cube.find_horizon(start, &ring).is_none());

        let corner: HashSet<FaceKey> = cube
            .faces()
            .filter(|f| f.normal().dot(DVec3::ONE) > 0.5)
            .map(|f| f.key())
            .collect();
        let start = *corner.iter().next().unwrap();
        let (region, horizon) = cube.find_horizon(start, &corner).unwrap();
        assert_eq!(region.len(), 3);
        assert_eq!(horizon.len(), 6);
        assert!(horizon
            .iter()
            .all(|&e| !corner.contains(&cube.edges[e].face)));
    }

    #[test]
    fn rejected_growth_restores_mesh() {
        let mut cube = ConvexPolytope::cube(1.0).unwrap();
        let positions: Vec<DVec3> = cube.vertices().map(|v| v.position()).collect();

        // Tearing a face out leaves an open mesh whether or not faces are merged.
        let result = cube.grow_checked(DVec3::new(3.0, 0.0, 0.0), |polytope, _| {
            let face = polytope.face_order[0];
            polytope.remove_face(face);
        });

        assert_eq!(result, Err(Error::DegenerateHorizon));
        assert!(cube.validate().is_ok());
        assert_eq!(cube.num_faces(), 6);
        assert_eq!(cube.num_edges(), 12);
        let after: Vec<DVec3> = cube.vertices().map(|v| v.position()).collect();
        assert_eq!(after, positions);
    }

    #[test]
    fn extrusion_just_past_epsilon_stays_closed() {
        // The last point is about 1.5e-3 off the triangle's plane, so the side faces of the
        // extruded cone are all nearly coplanar with each other.
        let points = [
            DVec3::new(0.1727, 0.3408, 0.0708),
            DVec3::new(0.0442, 0.0188, 0.0181),
            DVec3::new(0.0383, 0.0262, 0.0151),
            DVec3::new(0.0357, 0.0305, 0.0121),
        ];
        let mut polytope = ConvexPolytope::with_epsilon(1.0e-3);

        for p in points {
            assert!(polytope.add_vertex(p).unwrap());
            assert!(polytope.validate().is_ok());
        }

        assert!(polytope.is_full_dimensional());
        assert_eq!(polytope.num_vertices(), 4);
        assert_eq!(polytope.num_faces(), 4);
        assert!(polytope.volume() > 0.0);
        assert_within(&polytope, &points, 1.0e-3);
    }

    #[test]
    fn thin_slab_keeps_extreme_vertices() {
        let epsilon = 1.0e-10;
        let points = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
            DVec3::new(0.3, 0.3, 1.3e-10),
            DVec3::new(0.4864, 0.7908, -1.03e-10),
        ];
        let mut polytope = ConvexPolytope::with_epsilon(epsilon);

        for (i, &p) in points.iter().enumerate() {
            assert!(polytope.add_vertex(p).unwrap(), "point {i} was absorbed");
            assert!(polytope.validate().is_ok());
            assert_within(&polytope, &points[..=i], epsilon);
        }

        assert!(polytope.is_full_dimensional());
        assert!(polytope.vertices().any(|v| v.position() == points[4]));
    }

    #[test]
    fn point_past_sharp_edge_is_not_absorbed() {
        // Every face plane passes within epsilon of the new point, but the hull itself does not.
        let epsilon = 1.0e-6;
        let mut polytope = ConvexPolytope::from_points(
            [
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(1.0, 0.0, 0.0),
                DVec3::new(0.0, 1.0, 0.0),
                DVec3::new(0.25, 0.25, 2.0e-6),
            ],
            epsilon,
        )
        .unwrap();

        let point = DVec3::new(0.5, -0.1, 0.0);
        assert!(polytope.signed_distance(point) <= epsilon);
        assert!(polytope.distance(point) > epsilon);

        assert!(polytope.add_vertex(point).unwrap());
        assert!(polytope.validate().is_ok());
        assert!(polytope.distance(point) <= epsilon);
    }

    #[test]
    fn collinear_degree_two_vertex_is_collapsed() {
        let mut prism = ConvexPolytope::from_points(
            [
                DVec3::new(-1.0, -1.0, -1.0),
                DVec3::new(1.0, -1.0, -1.0),
                DVec3::new(1.0, 1.0, -1.0),
                DVec3::new(-1.0, 1.0, -1.0),
                DVec3::new(-1.0, -1.0, 1.0),
                DVec3::new(1.0, -1.0, 1.0),
                DVec3::new(1.0, 0.0, 1.0),
                DVec3::new(-1.0, 1.0, 1.0),
            ],
            ConvexPolytope::DEFAULT_EPSILON,
        )
        .unwrap();

        // Completing the cube turns (1, 0, 1) into the middle of a straight edge.
        assert!(prism.add_vertex(DVec3::new(1.0, 1.0, 1.0)).unwrap());
        assert!(prism.validate().is_ok());
        assert_eq!(prism.num_vertices(), 8);
        assert_eq!(prism.num_faces(), 6);
        assert!(prism.vertices().all(|v| v.position().abs() == DVec3::ONE));
    }
}
