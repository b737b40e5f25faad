//! Error types for dynamic parenting commands.

use serde::{Deserialize, Serialize};

use crate::scene::InteractionMode;

/// Selection preconditions. Commands failing these abort before touching the scene.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectionError {
    #[error("Selection is only available in object or pose mode (current: {mode:?})")]
    UnsupportedMode { mode: InteractionMode },

    #[error("Nothing selected.")]
    NothingSelected,

    #[error("Select at least two objects or bones.")]
    TooFewSelected,

    #[error("No active object or bone to use as parent.")]
    NoActiveParent,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DynParentError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("Object not found: {name}")]
    ObjectNotFound { name: String },

    #[error("Bone not found: {bone} in armature {armature}")]
    BoneNotFound { armature: String, bone: String },

    #[error("Object {name} is not an armature")]
    NotAnArmature { name: String },

    #[error("Invalid bone hierarchy in {armature}: {reason}")]
    InvalidHierarchy { armature: String, reason: String },

    #[error("Constraint not found: {name} on {owner}")]
    ConstraintNotFound { owner: String, name: String },

    #[error("Invalid data path: {reason}")]
    InvalidDataPath { reason: String },

    #[error("Bake failed: {reason}")]
    Bake { reason: String },

    #[error("Serialization error: {reason}")]
    Serialization { reason: String },
}

impl DynParentError {
    /// Error category for logging/reporting.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Selection(_) => "selection",
            Self::ObjectNotFound { .. }
            | Self::BoneNotFound { .. }
            | Self::NotAnArmature { .. }
            | Self::InvalidHierarchy { .. }
            | Self::ConstraintNotFound { .. } => "scene",
            Self::InvalidDataPath { .. } => "animation",
            Self::Bake { .. } => "bake",
            Self::Serialization { .. } => "serialization",
        }
    }

    pub fn is_selection(&self) -> bool {
        matches!(self, Self::Selection(_))
    }
}

impl From<serde_json::Error> for DynParentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = core::result::Result<T, DynParentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_errors_convert_and_keep_message() {
        let err: DynParentError = SelectionError::TooFewSelected.into();
        assert!(err.is_selection());
        assert_eq!(err.category(), "selection");
        assert_eq!(err.to_string(), "Select at least two objects or bones.");
    }

    #[test]
    fn categories() {
        let e = DynParentError::BoneNotFound {
            armature: "Rig".into(),
            bone: "x".into(),
        };
        assert_eq!(e.category(), "scene");
        let e: DynParentError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(e.category(), "serialization");
    }
}
