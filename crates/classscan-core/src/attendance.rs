//! Classroom attendance matching.
//!
//! Every face detected in the classroom photo is compared against every
//! enrolled student. Presence is a boolean OR over all detected faces: there is
//! no one-to-one assignment, so one face may mark several look-alike students
//! present and several faces may match the same student.

use crate::types::{Embedding, MatchResult, StudentRecord};
use thiserror::Error;

/// Maximum Euclidean distance at which two embeddings are the same person.
pub const DEFAULT_TOLERANCE: f64 = 0.6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("embedding dimension mismatch: detected face has {expected} values, stored embedding has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("tolerance must be a finite, non-negative number, got {0}")]
    InvalidTolerance(f64),
}

/// Strategy for deciding whether a detected face belongs to an enrolled student.
pub trait Matcher {
    fn is_match(&self, probe: &Embedding, reference: &Embedding) -> Result<bool, MatchError>;
}

/// Euclidean distance matcher: same person when `distance <= tolerance`.
#[derive(Debug, Clone, Copy)]
pub struct EuclideanMatcher {
    tolerance: f64,
}

impl EuclideanMatcher {
    pub fn new(tolerance: f64) -> Result<Self, MatchError> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(MatchError::InvalidTolerance(tolerance));
        }
        Ok(Self { tolerance })
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

impl Default for EuclideanMatcher {
    fn default() -> Self {
        Self { tolerance: DEFAULT_TOLERANCE }
    }
}

impl Matcher for EuclideanMatcher {
    fn is_match(&self, probe: &Embedding, reference: &Embedding) -> Result<bool, MatchError> {
        if probe.len() != reference.len() {
            return Err(MatchError::DimensionMismatch {
                expected: probe.len(),
                actual: reference.len(),
            });
        }
        Ok(probe.euclidean_distance(reference) <= self.tolerance)
    }
}

/// Mark each roster entry present or absent given the faces found in a class photo.
///
/// Returns exactly one result per roster entry, in roster order. Students
/// without a usable stored embedding are always absent. Any comparison error
/// aborts the whole call.
pub fn take_attendance<M: Matcher + ?Sized>(
    matcher: &M,
    detected: &[Embedding],
    roster: &[StudentRecord],
) -> Result<Vec<MatchResult>, MatchError> {
    let mut results: Vec<MatchResult> = roster.iter().map(MatchResult::absent).collect();

    if detected.is_empty() {
        tracing::debug!(students = roster.len(), "no faces detected; everyone absent");
        return Ok(results);
    }

    for face in detected {
        for (student, result) in roster.iter().zip(results.iter_mut()) {
            let Some(reference) = student.reference() else {
                continue;
            };

            let matched = matcher.is_match(face, reference).map_err(|e| {
                tracing::warn!(student = %student.id, error = %e, "cannot compare stored embedding");
                e
            })?;

            if matched {
                result.is_absent = false;
            }
        }
    }

    let present = results.iter().filter(|r| !r.is_absent).count();
    tracing::info!(
        faces = detected.len(),
        students = roster.len(),
        present,
        "attendance taken"
    );

    Ok(results)
}
