//! Keyframe store: per-object actions holding scalar fcurves.
//!
//! Model:
//! - An FCurve animates one array component (`array_index`) of one data path.
//! - Keyframes are kept sorted by frame; inserting at an existing frame replaces it.
//! - Segment [Ki -> K(i+1)] uses Ki's interpolation: Constant holds Ki, Linear blends,
//!   Bezier eases time with the default cubic-bezier before blending.
//! - Before the first key / after the last key the curve holds the end value.

use serde::{Deserialize, Serialize};

use crate::datapath::DataPath;
use crate::interp::{bezier_ease_t, lerp_f32, DEFAULT_EASE};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Constant,
    Linear,
    #[default]
    Bezier,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame: i32,
    pub value: f32,
    #[serde(default)]
    pub interpolation: Interpolation,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FCurve {
    pub data_path: DataPath,
    #[serde(default)]
    pub array_index: usize,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
}

impl FCurve {
    pub fn new(data_path: DataPath, array_index: usize) -> Self {
        Self {
            data_path,
            array_index,
            keyframes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Insert or replace the key at `frame`.
    pub fn insert(&mut self, frame: i32, value: f32, interpolation: Interpolation) {
        let key = Keyframe {
            frame,
            value,
            interpolation,
        };
        match self.keyframes.binary_search_by_key(&frame, |k| k.frame) {
            Ok(i) => self.keyframes[i] = key,
            Err(i) => self.keyframes.insert(i, key),
        }
    }

    pub fn key_at(&self, frame: i32) -> Option<&Keyframe> {
        self.keyframes
            .binary_search_by_key(&frame, |k| k.frame)
            .ok()
            .map(|i| &self.keyframes[i])
    }

    pub fn frames(&self) -> impl Iterator<Item = i32> + '_ {
        self.keyframes.iter().map(|k| k.frame)
    }

    /// Remove every key whose frame is listed; returns how many were removed.
    pub fn remove_frames(&mut self, frames: &[i32]) -> usize {
        let before = self.keyframes.len();
        self.keyframes.retain(|k| !frames.contains(&k.frame));
        before - self.keyframes.len()
    }

    /// Sample the curve; `None` when it has no keys.
    pub fn evaluate(&self, frame: f32) -> Option<f32> {
        let keys = &self.keyframes;
        let first = keys.first()?;
        let last = keys.last()?;
        if keys.len() == 1 || frame <= first.frame as f32 {
            return Some(first.value);
        }
        if frame >= last.frame as f32 {
            return Some(last.value);
        }
        // First key strictly after `frame`; keys are sorted and frame is inside the range.
        let i1 = keys.partition_point(|k| k.frame as f32 <= frame);
        let left = &keys[i1 - 1];
        let right = &keys[i1];
        let span = (right.frame - left.frame).max(1) as f32;
        let t = ((frame - left.frame as f32) / span).clamp(0.0, 1.0);
        let value = match left.interpolation {
            Interpolation::Constant => left.value,
            Interpolation::Linear => lerp_f32(left.value, right.value, t),
            Interpolation::Bezier => {
                lerp_f32(left.value, right.value, bezier_ease_t(t, DEFAULT_EASE))
            }
        };
        Some(value)
    }
}

/// Ordered collection of fcurves owned by one object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub fcurves: Vec<FCurve>,
}

impl Action {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, data_path: &DataPath, array_index: usize) -> Option<&FCurve> {
        self.fcurves
            .iter()
            .find(|c| c.array_index == array_index && &c.data_path == data_path)
    }

    /// Get the curve for (path, index), creating it on first use.
    pub fn ensure(&mut self, data_path: &DataPath, array_index: usize) -> &mut FCurve {
        let idx = match self
            .fcurves
            .iter()
            .position(|c| c.array_index == array_index && &c.data_path == data_path)
        {
            Some(i) => i,
            None => {
                self.fcurves
                    .push(FCurve::new(data_path.clone(), array_index));
                self.fcurves.len() - 1
            }
        };
        &mut self.fcurves[idx]
    }

    /// All curves for a data path, across array indices.
    pub fn curves_for<'a>(&'a self, data_path: &'a DataPath) -> impl Iterator<Item = &'a FCurve> {
        self.fcurves.iter().filter(move |c| &c.data_path == data_path)
    }

    /// Remove curves matching `pred`; returns the removed curves in order.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&FCurve) -> bool) -> Vec<FCurve> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.fcurves.len());
        for curve in self.fcurves.drain(..) {
            if pred(&curve) {
                removed.push(curve);
            } else {
                kept.push(curve);
            }
        }
        self.fcurves = kept;
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.fcurves.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::TransformProperty;

    fn influence() -> DataPath {
        DataPath::Influence {
            bone: None,
            constraint: "DP_A".into(),
        }
    }

    #[test]
    fn insert_keeps_sorted_and_replaces() {
        let mut c = FCurve::new(influence(), 0);
        c.insert(5, 1.0, Interpolation::Linear);
        c.insert(1, 0.0, Interpolation::Linear);
        c.insert(5, 0.5, Interpolation::Linear);
        assert_eq!(c.frames().collect::<Vec<_>>(), vec![1, 5]);
        assert_eq!(c.key_at(5).map(|k| k.value), Some(0.5));
    }

    #[test]
    fn evaluate_holds_ends_and_interpolates() {
        let mut c = FCurve::new(influence(), 0);
        assert_eq!(c.evaluate(0.0), None);
        c.insert(0, 0.0, Interpolation::Linear);
        c.insert(10, 1.0, Interpolation::Constant);
        assert_eq!(c.evaluate(-3.0), Some(0.0));
        assert_eq!(c.evaluate(42.0), Some(1.0));
        assert!((c.evaluate(2.5).unwrap() - 0.25).abs() < 1e-6);
        assert_eq!(c.evaluate(10.0), Some(1.0));
    }

    #[test]
    fn constant_and_bezier_segments() {
        let mut c = FCurve::new(influence(), 0);
        c.insert(0, 2.0, Interpolation::Constant);
        c.insert(4, 6.0, Interpolation::Bezier);
        assert_eq!(c.evaluate(3.9), Some(2.0));
        c.insert(0, 2.0, Interpolation::Bezier);
        let mid = c.evaluate(2.0).unwrap();
        assert!((mid - 4.0).abs() < 1e-2);
        // eased start moves slower than linear
        assert!(c.evaluate(1.0).unwrap() < 3.0);
    }

    #[test]
    fn action_ensure_is_lazy_and_unique() {
        let mut a = Action::new();
        let loc = DataPath::Transform {
            bone: None,
            property: TransformProperty::Location,
        };
        a.ensure(&loc, 0).insert(1, 1.0, Interpolation::Bezier);
        a.ensure(&loc, 0).insert(2, 2.0, Interpolation::Bezier);
        a.ensure(&loc, 1).insert(1, 0.0, Interpolation::Bezier);
        assert_eq!(a.fcurves.len(), 2);
        assert_eq!(a.curves_for(&loc).count(), 2);
        let removed = a.remove_where(|c| c.array_index == 1);
        assert_eq!(removed.len(), 1);
        assert_eq!(a.fcurves.len(), 1);
    }
}
