//! Vizij Dynamic Parenting Core (engine-agnostic)
//!
//! Time-varying "child of" relationships between objects and bones, keyed as
//! constraint influence so parenting can switch mid-animation:
//! - `solver` computes the offset that keeps the child in place when a link is created,
//! - `keyframer` writes the two-frame key pair that makes a switch instantaneous,
//! - `commands` wraps both into Create / Disable / Clear / Bake-and-clear.
//!
//! The remaining modules are a small host: a JSON scene document with
//! armatures, fcurve actions, a constraint-stack evaluator and a visual bake.

pub mod baking;
pub mod channels;
pub mod commands;
pub mod config;
pub mod constraint;
pub mod datapath;
pub mod error;
pub mod eval;
pub mod fcurve;
pub mod interp;
pub mod keyframer;
pub mod math;
pub mod scene;
pub mod selection;
pub mod solver;
pub mod subject;

// Re-exports for consumers (adapters)
pub use baking::{BakeReport, BakeRequest, BakeService, VisualKeyingBake};
pub use channels::{ChannelSet, RotationMode, TransformProperty};
pub use commands::{bake_and_clear, clear, create, disable, Command, CommandReport};
pub use config::Config;
pub use constraint::{ConstraintStack, Relationship};
pub use datapath::DataPath;
pub use error::{DynParentError, Result, SelectionError};
pub use fcurve::{Action, FCurve, Interpolation, Keyframe};
pub use keyframer::{record_transition, Transition};
pub use math::{Mat4, Trs};
pub use scene::{Armature, Bone, InteractionMode, Scene, SceneObject, Selection};
pub use selection::SelectionSet;
pub use solver::compute_inverse_offset;
pub use subject::Subject;
