//! Multi-component cell field.

use plume_core::ComponentId;

/// Cell values for several components, stored component-major.
///
/// Component `k` occupies `data[k * n_cells..(k + 1) * n_cells]`, owned
/// cells first, then ghosts.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiField {
    n_components: usize,
    n_cells: usize,
    data: Vec<f64>,
}

impl MultiField {
    /// Zero-filled field for `n_components` components over `n_cells` cells.
    pub fn zeros(n_components: usize, n_cells: usize) -> Self {
        Self {
            n_components,
            n_cells,
            data: vec![0.0; n_components * n_cells],
        }
    }

    /// Number of components.
    pub fn n_components(&self) -> usize {
        self.n_components
    }

    /// Number of cells, ghosts included.
    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    /// Values of one component.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    pub fn component(&self, id: ComponentId) -> &[f64] {
        let k = id.index();
        &self.data[k * self.n_cells..(k + 1) * self.n_cells]
    }

    /// Mutable values of one component.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    pub fn component_mut(&mut self, id: ComponentId) -> &mut [f64] {
        let k = id.index();
        &mut self.data[k * self.n_cells..(k + 1) * self.n_cells]
    }

    /// Iterate over component ids.
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> {
        (0..self.n_components as u32).map(ComponentId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_are_disjoint() {
        let mut f = MultiField::zeros(2, 3);
        f.component_mut(ComponentId(1)).copy_from_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(f.component(ComponentId(0)), &[0.0; 3]);
        assert_eq!(f.component(ComponentId(1)), &[1.0, 2.0, 3.0]);
        assert_eq!(f.ids().collect::<Vec<_>>(), vec![ComponentId(0), ComponentId(1)]);
    }
}
