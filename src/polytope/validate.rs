use hashbrown::HashSet;

use super::ConvexPolytope;

impl ConvexPolytope {
    /// Checks the structural integrity of the half-edge mesh.
    ///
    /// Verifies that every face loop is closed and consistently linked, that twins are mutual and
    /// opposite, that vertex edge lists match the edges originating there, and, for solids, that
    /// the mesh is closed, has at least four faces and three edges per vertex, and satisfies
    /// Euler's formula. Returns a description of the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        if self.vertex_order.len() != self.vertices.len() {
            return Err(format!(
                "vertex order lists {} vertices, mesh holds {}",
                self.vertex_order.len(),
                self.vertices.len()
            ));
        }

        if self.face_order.len() != self.faces.len() {
            return Err(format!(
                "face order lists {} faces, mesh holds {}",
                self.face_order.len(),
                self.faces.len()
            ));
        }

        if self.vertices.is_empty() != self.faces.is_empty() {
            return Err("vertices without faces or faces without vertices".into());
        }

        let solid = self.faces.len() > 1;

        if solid && self.faces.len() < 4 {
            return Err(format!("solid has only {} faces", self.faces.len()));
        }
        let mut seen = HashSet::new();

        for &fk in &self.face_order {
            let face = self
                .faces
                .get(fk)
                .ok_or_else(|| format!("ordered face {fk:?} does not exist"))?;
            let n = face.edges.len();

            if n == 0 || (solid && n < 3) {
                return Err(format!("face {fk:?} has {n} edges"));
            }

            for (i, &ek) in face.edges.iter().enumerate() {
                let edge = self
                    .edges
                    .get(ek)
                    .ok_or_else(|| format!("face {fk:?} lists missing edge {ek:?}"))?;

                if !seen.insert(ek) {
                    return Err(format!("edge {ek:?} appears in more than one loop"));
                }

                if edge.face != fk {
                    return Err(format!("edge {ek:?} in loop of {fk:?} points to {:?}", edge.face));
                }

                let next_key = face.edges[(i + 1) % n];
                if edge.next != next_key {
                    return Err(format!("edge {ek:?} has wrong successor"));
                }

                let next = self
                    .edges
                    .get(next_key)
                    .ok_or_else(|| format!("face {fk:?} lists missing edge {next_key:?}"))?;
                if next.prev != ek {
                    return Err(format!("successor of {ek:?} does not link back"));
                }

                if edge.destination != next.origin {
                    return Err(format!("loop of face {fk:?} is broken after {ek:?}"));
                }

                if !self
                    .vertices
                    .get(edge.origin)
                    .map_or(false, |v| v.edges.contains(&ek))
                {
                    return Err(format!("origin of {ek:?} does not list it"));
                }

                match edge.twin {
                    Some(tk) => {
                        let twin = self
                            .edges
                            .get(tk)
                            .ok_or_else(|| format!("twin of {ek:?} does not exist"))?;

                        if twin.twin != Some(ek) {
                            return Err(format!("twin of {ek:?} is not mutual"));
                        }

                        if twin.origin != edge.destination || twin.destination != edge.origin {
                            return Err(format!("twin of {ek:?} does not run opposite"));
                        }

                        if twin.face == fk {
                            return Err(format!("edge {ek:?} is its own face's neighbor"));
                        }
                    }
                    None if solid => return Err(format!("edge {ek:?} of a solid has no twin")),
                    None => {}
                }
            }
        }

        if seen.len() != self.edges.len() {
            return Err(format!(
                "{} edges do not belong to any face",
                self.edges.len() - seen.len()
            ));
        }

        for &vk in &self.vertex_order {
            let vertex = self
                .vertices
                .get(vk)
                .ok_or_else(|| format!("ordered vertex {vk:?} does not exist"))?;

            if vertex.edges.is_empty() {
                return Err(format!("vertex {vk:?} has no edges"));
            }

            if solid && vertex.edges.len() < 3 {
                return Err(format!(
                    "vertex {vk:?} of a solid has only {} edges",
                    vertex.edges.len()
                ));
            }

            for &ek in &vertex.edges {
                if self.edges.get(ek).map(|e| e.origin) != Some(vk) {
                    return Err(format!("vertex {vk:?} lists foreign edge {ek:?}"));
                }
            }
        }

        if solid {
            let v = self.vertices.len();
            let e = self.edges.len() / 2;
            let f = self.faces.len();

            if v + f != e + 2 {
                return Err(format!("Euler characteristic violated: V={v} E={e} F={f}"));
            }

            let mut directed = HashSet::new();
            for edge in self.edges.values() {
                if !directed.insert((edge.origin, edge.destination)) {
                    return Err(format!(
                        "duplicate directed edge {:?} -> {:?}",
                        edge.origin, edge.destination
                    ));
                }
            }
        }

        Ok(())
    }

    // Panics in debug builds if a mutation broke the mesh.
    pub(crate) fn debug_validate(&self) {
        if cfg!(debug_assertions) {
            if let Err(problem) = self.validate() {
                panic!("polytope integrity violated: {problem}");
            }
        }
    }
}
