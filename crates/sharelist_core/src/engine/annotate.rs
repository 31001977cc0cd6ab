//! Application of external sort annotations.
//!
//! # Responsibility
//! - Parse the annotator response shape (`{tasks: [...]}` or `{error}`).
//! - Copy location/schedule annotations onto matching tasks and re-derive
//!   the top-level display order.
//!
//! # Invariants
//! - The annotator is an opaque collaborator; its ranking is applied, never
//!   recomputed here.
//! - A malformed payload leaves the forest untouched.

use serde::Deserialize;

use crate::engine::{reorder, EngineError};
use crate::model::forest::{Container, TaskForest};
use crate::model::task::TaskId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for annotation parsing/application.
pub type AnnotationResult<T> = Result<T, AnnotationError>;

/// Errors from annotation handling.
#[derive(Debug)]
pub enum AnnotationError {
    /// The annotator payload is malformed or reports an error.
    Malformed(String),
    /// Applying the derived order failed.
    Engine(EngineError),
}

impl Display for AnnotationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(message) => write!(f, "invalid annotator payload: {message}"),
            Self::Engine(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AnnotationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Engine(err) => Some(err),
            Self::Malformed(_) => None,
        }
    }
}

impl From<EngineError> for AnnotationError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

/// One annotated task as returned by the external sorter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SortAnnotation {
    /// Id of the task the annotation belongs to.
    pub id: TaskId,
    /// Store section for grocery lists.
    #[serde(default)]
    pub location: Option<String>,
    /// Display rank within the annotated order.
    #[serde(default)]
    pub location_index: Option<i64>,
    /// Suggested time slot for schedule lists.
    #[serde(default, rename = "scheduledTime")]
    pub scheduled_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SortResponse {
    #[serde(default)]
    tasks: Option<Vec<SortAnnotation>>,
    #[serde(default)]
    error: Option<String>,
}

/// Parses the raw annotator response.
///
/// An `{error}` body or a body without a `tasks` array is rejected as
/// malformed input.
pub fn parse_sort_annotations(payload: &serde_json::Value) -> AnnotationResult<Vec<SortAnnotation>> {
    let response: SortResponse = serde_json::from_value(payload.clone())
        .map_err(|err| AnnotationError::Malformed(err.to_string()))?;
    if let Some(error) = response.error {
        return Err(AnnotationError::Malformed(error));
    }
    response
        .tasks
        .ok_or_else(|| AnnotationError::Malformed("missing `tasks` array".to_string()))
}

/// Applies annotations to matching tasks and re-derives the top-level
/// active display order by ascending `location_index`.
///
/// Annotations for ids no longer present are skipped; returns the number of
/// annotations applied. Unranked active tasks keep their relative order
/// after all ranked ones.
pub fn apply_sort_annotations(
    forest: &mut TaskForest,
    annotations: &[SortAnnotation],
) -> AnnotationResult<usize> {
    let mut applied = 0;
    for annotation in annotations {
        if let Some(node) = forest.get_mut(annotation.id) {
            node.location = annotation.location.clone();
            node.location_index = annotation.location_index;
            node.scheduled_time = annotation.scheduled_time.clone();
            applied += 1;
        }
    }

    let mut active_roots: Vec<TaskId> = forest
        .roots()
        .iter()
        .copied()
        .filter(|id| forest.get(*id).is_some_and(|node| !node.completed))
        .collect();
    active_roots.sort_by_key(|id| {
        forest
            .get(*id)
            .and_then(|node| node.location_index)
            .unwrap_or(i64::MAX)
    });
    reorder(forest, Container::Roots, &active_roots)?;
    Ok(applied)
}
