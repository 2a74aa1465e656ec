//! Replayable write payloads, one per [`OpKind`].

use serde::{Deserialize, Serialize};

use crate::types::{ExerciseId, OpKind, SessionId};

/// A single set logged against a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetLog {
    /// Session the set belongs to.
    pub session_id: SessionId,
    /// Exercise performed.
    pub exercise_id: ExerciseId,
    /// 1-based position within the exercise.
    pub set_number: u32,
    /// Load in kilograms.
    pub weight_kg: f64,
    /// Completed repetitions.
    pub reps: u32,
    /// Rate of perceived exertion, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpe: Option<f32>,
    /// When the set was performed, milliseconds since epoch.
    pub performed_at_ms: u64,
}

/// Completion of a training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCompletion {
    /// Session being completed.
    pub session_id: SessionId,
    /// Completion time, milliseconds since epoch.
    pub completed_at_ms: u64,
    /// Total session length in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A body-weight entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightLog {
    /// Body weight in kilograms.
    pub weight_kg: f64,
    /// Body fat percentage, if measured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_fat_pct: Option<f32>,
    /// Measurement time, milliseconds since epoch.
    pub logged_at_ms: u64,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Kind-specific data needed to replay a queued write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    /// See [`SetLog`].
    LogSet(SetLog),
    /// See [`SessionCompletion`].
    CompleteSession(SessionCompletion),
    /// See [`WeightLog`].
    LogWeight(WeightLog),
}

impl Payload {
    /// Operation kind this payload replays as.
    pub fn kind(&self) -> OpKind {
        match self {
            Payload::LogSet(_) => OpKind::LogSet,
            Payload::CompleteSession(_) => OpKind::CompleteSession,
            Payload::LogWeight(_) => OpKind::LogWeight,
        }
    }
}

impl From<SetLog> for Payload {
    fn from(value: SetLog) -> Self {
        Self::LogSet(value)
    }
}

impl From<SessionCompletion> for Payload {
    fn from(value: SessionCompletion) -> Self {
        Self::CompleteSession(value)
    }
}

impl From<WeightLog> for Payload {
    fn from(value: WeightLog) -> Self {
        Self::LogWeight(value)
    }
}
