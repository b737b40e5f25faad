//! Configuration for dynamic parenting commands.

use serde::{Deserialize, Serialize};

use crate::fcurve::Interpolation;

pub const DEFAULT_TAG_PREFIX: &str = "DP_";

/// Knobs shared by every command. Frame state is never stored here; it is
/// read from the scene on each invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name prefix marking relationships (and their influence curves) as managed.
    pub tag_prefix: String,
    /// Interpolation assigned to keys written by the transition keyframer.
    pub interpolation: Interpolation,
    /// Frame step used by bake-and-clear.
    pub bake_step: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
            interpolation: Interpolation::Bezier,
            bake_step: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: Config = serde_json::from_str(r#"{ "bake_step": 2 }"#).unwrap();
        assert_eq!(cfg.tag_prefix, "DP_");
        assert_eq!(cfg.interpolation, Interpolation::Bezier);
        assert_eq!(cfg.bake_step, 2);
    }
}
