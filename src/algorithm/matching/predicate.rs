//! Compatibility predicates deciding whether a control may be paired with a case
//!
//! The greedy scaffold in [`super::sequential`] only asks a predicate whether
//! a (case, control) pair is acceptable. Stratification, control reuse and the
//! ratio are handled by the scaffold, so new matching logic only needs a new
//! [`CompatibilityPredicate`].

use std::fmt;

use super::criteria::MatchingCriteria;
use super::types::Record;

/// Decides whether a control is an acceptable match for a case
///
/// Both records are guaranteed to share a stratum when the scaffold calls
/// [`is_compatible`](Self::is_compatible).
pub trait CompatibilityPredicate: Send + Sync {
    /// Whether `control` may be matched to `case`
    fn is_compatible(&self, case: &Record, control: &Record) -> bool;

    /// Exclusive age window implied by the predicate, if any
    ///
    /// When `Some(w)`, no control with `|control.age - case.age| >= w` is
    /// ever compatible, which lets the scaffold narrow its scan with an
    /// age-sorted index. Returning `None` always falls back to a full scan.
    fn age_window(&self) -> Option<f64> {
        None
    }
}

impl<F> CompatibilityPredicate for F
where
    F: Fn(&Record, &Record) -> bool + Send + Sync,
{
    fn is_compatible(&self, case: &Record, control: &Record) -> bool {
        self(case, control)
    }
}

/// Default predicate: ages differ by strictly less than the tolerance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeTolerance {
    pub tolerance: f64,
}

impl AgeTolerance {
    #[must_use]
    pub const fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl CompatibilityPredicate for AgeTolerance {
    fn is_compatible(&self, case: &Record, control: &Record) -> bool {
        (control.age - case.age).abs() < self.tolerance
    }

    fn age_window(&self) -> Option<f64> {
        Some(self.tolerance)
    }
}

/// A numeric covariate must differ by strictly less than the tolerance
///
/// Records missing the covariate are never compatible.
#[derive(Debug, Clone, PartialEq)]
pub struct CovariateWithin {
    pub column: String,
    pub tolerance: f64,
}

impl CovariateWithin {
    #[must_use]
    pub fn new(column: impl Into<String>, tolerance: f64) -> Self {
        Self {
            column: column.into(),
            tolerance,
        }
    }
}

impl CompatibilityPredicate for CovariateWithin {
    fn is_compatible(&self, case: &Record, control: &Record) -> bool {
        match (case.covariate(&self.column), control.covariate(&self.column)) {
            (Some(a), Some(b)) => (a - b).abs() < self.tolerance,
            _ => false,
        }
    }
}

/// Conjunction of predicates
#[derive(Default)]
pub struct AllOf {
    predicates: Vec<Box<dyn CompatibilityPredicate>>,
}

impl AllOf {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add another predicate that must hold
    #[must_use]
    pub fn and(mut self, predicate: impl CompatibilityPredicate + 'static) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl fmt::Debug for AllOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllOf")
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

impl CompatibilityPredicate for AllOf {
    fn is_compatible(&self, case: &Record, control: &Record) -> bool {
        self.predicates.iter().all(|p| p.is_compatible(case, control))
    }

    /// The tightest window of any member
    fn age_window(&self) -> Option<f64> {
        self.predicates
            .iter()
            .filter_map(|p| p.age_window())
            .reduce(f64::min)
    }
}

/// Build the predicate described by the criteria: age tolerance plus any covariates
#[must_use]
pub fn from_criteria(criteria: &MatchingCriteria) -> Box<dyn CompatibilityPredicate> {
    let age = AgeTolerance::new(criteria.age_tolerance);
    if criteria.covariate_tolerances.is_empty() {
        return Box::new(age);
    }

    let all = criteria
        .covariate_tolerances
        .iter()
        .fold(AllOf::new().and(age), |all, c| {
            all.and(CovariateWithin::new(c.column.clone(), c.tolerance))
        });
    Box::new(all)
}
