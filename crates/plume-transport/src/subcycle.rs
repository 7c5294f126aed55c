//! Sub-cycle planning for one coupling step.

/// One sub-step of a coupling step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubStep {
    /// Sub-step length.
    pub dt: f64,
    /// `true` for the last sub-step.
    pub is_final: bool,
}

/// Splits a coupling step into sub-steps no longer than the stable step.
///
/// While the residual is at least twice the stable step a full stable step
/// is taken. A residual between one and two stable steps is split into two
/// equal halves so the last step is never a sliver. A residual at or below
/// the stable step is taken whole and ends the plan.
///
/// ```
/// use plume_transport::SubcyclePlan;
///
/// let dts: Vec<f64> = SubcyclePlan::new(2.5, 1.0).map(|s| s.dt).collect();
/// assert_eq!(dts, vec![1.0, 0.75, 0.75]);
/// ```
#[derive(Clone, Debug)]
pub struct SubcyclePlan {
    total: f64,
    stable: f64,
    elapsed: f64,
    halved: bool,
    done: bool,
}

impl SubcyclePlan {
    /// Plan `total` in steps of at most `stable`. Both must be > 0.
    pub fn new(total: f64, stable: f64) -> Self {
        Self {
            total,
            stable,
            elapsed: 0.0,
            halved: false,
            done: !(total > 0.0),
        }
    }

    /// Time covered by the sub-steps yielded so far.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

impl Iterator for SubcyclePlan {
    type Item = SubStep;

    fn next(&mut self) -> Option<SubStep> {
        if self.done {
            return None;
        }
        let residual = self.total - self.elapsed;
        let (dt, is_final) = if self.halved || residual <= self.stable {
            (residual, true)
        } else if residual < 2.0 * self.stable {
            self.halved = true;
            (0.5 * residual, false)
        } else {
            (self.stable, false)
        };
        self.elapsed += dt;
        self.done = is_final;
        Some(SubStep { dt, is_final })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn plan(total: f64, stable: f64) -> Vec<SubStep> {
        SubcyclePlan::new(total, stable).collect()
    }

    #[test]
    fn single_step_when_stable() {
        assert_eq!(
            plan(0.5, 1.0),
            vec![SubStep {
                dt: 0.5,
                is_final: true
            }]
        );
        assert_eq!(plan(1.0, 1.0).len(), 1);
    }

    #[test]
    fn residual_between_one_and_two_is_halved() {
        let steps = plan(1.5, 1.0);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].dt, 0.75);
        assert!(!steps[0].is_final);
        assert_eq!(steps[1].dt, 0.75);
        assert!(steps[1].is_final);
    }

    #[test]
    fn exact_multiple() {
        let dts: Vec<f64> = plan(3.0, 1.0).iter().map(|s| s.dt).collect();
        assert_eq!(dts, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn sentinel_stable_step_is_one_step() {
        assert_eq!(plan(10.0, 1e99).len(), 1);
    }

    #[test]
    fn non_positive_total_is_empty() {
        assert!(plan(0.0, 1.0).is_empty());
    }

    proptest! {
        #[test]
        fn steps_cover_total_and_respect_bound(
            total in 1e-3f64..50.0,
            stable in 1e-2f64..5.0,
        ) {
            let steps = plan(total, stable);
            let sum: f64 = steps.iter().map(|s| s.dt).sum();
            prop_assert!((sum - total).abs() <= 1e-9 * total.max(1.0));
            for s in &steps {
                prop_assert!(s.dt > 0.0);
                prop_assert!(s.dt <= stable * (1.0 + 1e-12));
            }
            prop_assert!(steps.last().unwrap().is_final);
            prop_assert_eq!(steps.iter().filter(|s| s.is_final).count(), 1);
        }
    }
}
