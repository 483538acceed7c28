//! Age index over the controls of one stratum
//!
//! Controls are kept sorted by age so the candidates within an age window can
//! be found with two binary searches. Candidates are handed back in their
//! original table order, so scanning them gives the same first-fit result as
//! scanning the whole stratum.

use smallvec::SmallVec;

use crate::algorithm::matching::types::Record;

/// Candidate positions for a single case
pub type Candidates = SmallVec<[usize; 32]>;

/// Age-sorted view of a stratum's controls
#[derive(Debug)]
pub struct ControlIndex {
    /// Control ages, ascending
    ages: Vec<f64>,
    /// Position (within the stratum) of the control at the same slot in `ages`
    positions: Vec<usize>,
}

impl ControlIndex {
    /// Build the index from a stratum's controls, given in table order
    #[must_use]
    pub fn new(controls: &[&Record]) -> Self {
        let mut order: Vec<usize> = (0..controls.len()).collect();
        // Stable, so equal ages keep table order
        order.sort_by(|&a, &b| controls[a].age.total_cmp(&controls[b].age));

        let ages = order.iter().map(|&i| controls[i].age).collect();
        Self {
            ages,
            positions: order,
        }
    }

    /// Positions of controls whose age lies within `window` of `age`, ascending
    ///
    /// The bounds are widened by a few ulps so that rounding in the window
    /// arithmetic never hides a control the predicate would accept; callers
    /// still apply the predicate to every candidate.
    #[must_use]
    pub fn candidates(&self, age: f64, window: f64) -> Candidates {
        let slack = (age.abs() + window.abs()) * 4.0 * f64::EPSILON;
        let min_age = age - window - slack;
        let max_age = age + window + slack;

        let start = self.ages.partition_point(|&a| a < min_age);
        let end = self.ages.partition_point(|&a| a <= max_age);

        let mut candidates: Candidates = self.positions[start..end.max(start)]
            .iter()
            .copied()
            .collect();
        candidates.sort_unstable();
        candidates
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
