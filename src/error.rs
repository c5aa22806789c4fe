use thiserror::Error;

/// Errors surfaced by polytope construction and collision queries.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A point, direction or transform contained a NaN or infinite component.
    #[error("input contains invalid data (NaN or infinite component)")]
    InvalidData,
    /// A supporting vertex was requested from a shape with no vertices.
    #[error("cannot compute a supporting vertex of an empty shape")]
    EmptyShape,
    /// A point outside a polytope could not be inserted because the faces it sees do not form a
    /// disk, or because no cone over them gives a valid closed hull.
    #[error("the faces visible from the point do not bound a simple horizon")]
    DegenerateHorizon,
}
