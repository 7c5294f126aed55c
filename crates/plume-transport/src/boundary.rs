//! Dirichlet inflow boundary conditions.

use std::fmt;

use plume_core::{ComponentId, ConfigError};
use plume_mesh::{Mesh, Parallel};

use crate::function::TimeFunction;

/// A time-dependent concentration imposed on a set of boundary faces for
/// one component.
///
/// The value is used only where flow enters the domain (the face has a
/// downwind cell and no upwind cell); outflow faces ignore it.
pub struct BoundaryCondition {
    component: ComponentId,
    faces: Vec<usize>,
    function: Box<dyn TimeFunction>,
    value: f64,
}

impl fmt::Debug for BoundaryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryCondition")
            .field("component", &self.component)
            .field("faces", &self.faces)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

impl BoundaryCondition {
    /// Impose `function` on local `faces` for `component`.
    pub fn new(
        component: ComponentId,
        faces: Vec<usize>,
        function: impl TimeFunction + 'static,
    ) -> Self {
        Self {
            component,
            faces,
            function: Box::new(function),
            value: 0.0,
        }
    }

    /// The component this condition applies to.
    pub fn component(&self) -> ComponentId {
        self.component
    }

    /// Local indices of the faces.
    pub fn faces(&self) -> &[usize] {
        &self.faces
    }

    /// The value cached by the last [`compute`](Self::compute).
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Evaluate the function at `time` and cache the result.
    pub fn compute(&mut self, time: f64) {
        self.value = self.function.value(time);
    }

    /// Check that every face exists and lies on the domain boundary.
    pub fn validate(&self, mesh: &dyn Mesh) -> Result<(), ConfigError> {
        let n_faces = mesh.num_faces(Parallel::All);
        match self
            .faces
            .iter()
            .find(|&&f| f >= n_faces || !mesh.is_boundary_face(f))
        {
            Some(&face) => Err(ConfigError::InvalidBoundaryFace {
                key: "boundary conditions",
                face,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::Constant;
    use plume_mesh::Line1D;

    #[test]
    fn compute_caches_value() {
        let mut bc = BoundaryCondition::new(ComponentId(0), vec![0], |t: f64| t + 1.0);
        assert_eq!(bc.value(), 0.0);
        bc.compute(2.0);
        assert_eq!(bc.value(), 3.0);
        assert_eq!(bc.faces(), &[0]);
    }

    #[test]
    fn interior_faces_are_rejected() {
        let mesh = Line1D::new(3, 1.0).unwrap().build().unwrap();
        let ok = BoundaryCondition::new(ComponentId(0), vec![0, 3], Constant(1.0));
        assert!(ok.validate(&mesh).is_ok());
        let bad = BoundaryCondition::new(ComponentId(0), vec![0, 1], Constant(1.0));
        assert_eq!(
            bad.validate(&mesh).unwrap_err(),
            ConfigError::InvalidBoundaryFace {
                key: "boundary conditions",
                face: 1
            }
        );
        let missing = BoundaryCondition::new(ComponentId(0), vec![9], Constant(1.0));
        assert!(missing.validate(&mesh).is_err());
    }
}
