//! Frame transforms
//!
//! [`TransformLookup`] and [`TransformBroadcaster`] are the seams to the
//! transform tree. [`TransformBuffer`] implements both with an in-memory tree
//! of parent -> child transforms and a bounded-wait lookup.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use marker_core::Pose;

/// Transform lookup failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TfError {
    #[error("failed to lookup transform {target} -> {source_frame} within {timeout:?}")]
    Timeout {
        target: String,
        source_frame: String,
        timeout: Duration,
    },

    #[error("frames {target} and {source_frame} are not connected")]
    Connectivity {
        target: String,
        source_frame: String,
    },

    #[error("invalid frame id: {0:?}")]
    InvalidArgument(String),
}

/// Transform of `child_frame` expressed in `parent_frame`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedTransform {
    pub parent_frame: String,
    pub child_frame: String,
    pub transform: Pose,
}

impl StampedTransform {
    pub fn new(parent_frame: impl Into<String>, child_frame: impl Into<String>, transform: Pose) -> Self {
        Self {
            parent_frame: parent_frame.into(),
            child_frame: child_frame.into(),
            transform,
        }
    }
}

/// Resolves transforms between frames, waiting at most `timeout`
pub trait TransformLookup: Send + Sync {
    /// Transform mapping coordinates in `source` into `target`
    fn lookup(&self, target: &str, source: &str, timeout: Duration) -> Result<Pose, TfError>;

    /// Re-express `pose` (given in `source`) in `target`
    fn transform_pose(
        &self,
        target: &str,
        source: &str,
        pose: &Pose,
        timeout: Duration,
    ) -> Result<Pose, TfError> {
        if target == source {
            return Ok(*pose);
        }
        Ok(self.lookup(target, source, timeout)? * *pose)
    }
}

/// Publishes dynamic transforms into the tree
pub trait TransformBroadcaster: Send + Sync {
    fn send_transform(&self, transform: StampedTransform);
}

/// In-memory transform tree
///
/// Each frame has at most one parent. Setting a transform for an existing
/// child replaces its parent edge.
#[derive(Default)]
pub struct TransformBuffer {
    /// child -> (parent, transform of child in parent)
    edges: Mutex<HashMap<String, (String, Pose)>>,
    changed: Condvar,
}

enum LookupFailure {
    Unknown,
    Disconnected,
}

fn validate_frame(frame: &str) -> Result<(), TfError> {
    if frame.is_empty() || frame.trim() != frame {
        return Err(TfError::InvalidArgument(frame.to_string()));
    }
    Ok(())
}

impl TransformBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_transform(&self, transform: StampedTransform) {
        let mut edges = self.edges.lock();
        edges.insert(
            transform.child_frame,
            (transform.parent_frame, transform.transform),
        );
        self.changed.notify_all();
    }

    pub fn has_frame(&self, frame: &str) -> bool {
        let edges = self.edges.lock();
        edges.contains_key(frame) || edges.values().any(|(parent, _)| parent == frame)
    }

    /// Walk from `frame` to its root, returning the root and `root <- frame`
    fn chain_to_root(
        edges: &HashMap<String, (String, Pose)>,
        frame: &str,
    ) -> Option<(String, Pose)> {
        let known = edges.contains_key(frame) || edges.values().any(|(p, _)| p == frame);
        if !known {
            return None;
        }

        let mut current = frame.to_string();
        let mut transform = Pose::IDENTITY;
        // A cycle cannot be longer than the number of edges
        for _ in 0..=edges.len() {
            match edges.get(&current) {
                Some((parent, local)) => {
                    transform = *local * transform;
                    current = parent.clone();
                }
                None => return Some((current, transform)),
            }
        }
        tracing::warn!("Transform cycle detected at frame {}", frame);
        None
    }

    fn try_lookup(
        edges: &HashMap<String, (String, Pose)>,
        target: &str,
        source: &str,
    ) -> Result<Pose, LookupFailure> {
        let (source_root, root_from_source) =
            Self::chain_to_root(edges, source).ok_or(LookupFailure::Unknown)?;
        let (target_root, root_from_target) =
            Self::chain_to_root(edges, target).ok_or(LookupFailure::Unknown)?;

        if source_root != target_root {
            return Err(LookupFailure::Disconnected);
        }
        Ok(root_from_target.inverse() * root_from_source)
    }
}

impl TransformLookup for TransformBuffer {
    fn lookup(&self, target: &str, source: &str, timeout: Duration) -> Result<Pose, TfError> {
        validate_frame(target)?;
        validate_frame(source)?;
        if target == source {
            return Ok(Pose::IDENTITY);
        }

        // A wait too long to represent as an instant has no deadline
        let deadline = Instant::now().checked_add(timeout);
        let mut edges = self.edges.lock();
        loop {
            let failure = match Self::try_lookup(&edges, target, source) {
                Ok(transform) => return Ok(transform),
                Err(failure) => failure,
            };

            let Some(deadline) = deadline else {
                self.changed.wait(&mut edges);
                continue;
            };

            if self.changed.wait_until(&mut edges, deadline).timed_out()
                && Instant::now() >= deadline
            {
                // One last attempt with whatever arrived before the deadline
                return Self::try_lookup(&edges, target, source).map_err(|_| match failure {
                    LookupFailure::Unknown => TfError::Timeout {
                        target: target.to_string(),
                        source_frame: source.to_string(),
                        timeout,
                    },
                    LookupFailure::Disconnected => TfError::Connectivity {
                        target: target.to_string(),
                        source_frame: source.to_string(),
                    },
                });
            }
        }
    }
}

impl TransformBroadcaster for TransformBuffer {
    fn send_transform(&self, transform: StampedTransform) {
        self.set_transform(transform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};
    use std::f32::consts::FRAC_PI_2;
    use std::sync::Arc;

    fn sample_tree() -> TransformBuffer {
        let buffer = TransformBuffer::new();
        buffer.set_transform(StampedTransform::new(
            "map",
            "odom",
            Pose::from_position(Vec3::new(1.0, 0.0, 0.0)),
        ));
        buffer.set_transform(StampedTransform::new(
            "odom",
            "base",
            Pose::new(Vec3::new(0.0, 2.0, 0.0), Quat::from_rotation_z(FRAC_PI_2)),
        ));
        buffer.set_transform(StampedTransform::new(
            "map",
            "camera",
            Pose::from_position(Vec3::new(0.0, 0.0, 1.0)),
        ));
        buffer
    }

    #[test]
    fn test_chained_lookup() {
        let buffer = sample_tree();
        let map_from_base = buffer.lookup("map", "base", Duration::ZERO).unwrap();

        let point = map_from_base.transform_point(Vec3::X);
        assert!(point.abs_diff_eq(Vec3::new(1.0, 3.0, 0.0), 1e-5));
    }

    #[test]
    fn test_lookup_across_branches() {
        let buffer = sample_tree();
        let camera_from_base = buffer.lookup("camera", "base", Duration::ZERO).unwrap();
        assert!(
            camera_from_base
                .position
                .abs_diff_eq(Vec3::new(1.0, 2.0, -1.0), 1e-5)
        );

        let base_from_camera = buffer.lookup("base", "camera", Duration::ZERO).unwrap();
        assert!((camera_from_base * base_from_camera).abs_diff_eq(&Pose::IDENTITY, 1e-5));
    }

    #[test]
    fn test_unknown_frame_times_out() {
        let buffer = sample_tree();
        let timeout = Duration::from_millis(20);
        let start = Instant::now();

        let result = buffer.lookup("map", "nowhere", timeout);
        assert!(matches!(result, Err(TfError::Timeout { .. })));
        assert!(start.elapsed() >= timeout);
    }

    #[test]
    fn test_disconnected_trees() {
        let buffer = sample_tree();
        buffer.set_transform(StampedTransform::new("world", "island", Pose::IDENTITY));

        let result = buffer.lookup("map", "island", Duration::ZERO);
        assert!(matches!(result, Err(TfError::Connectivity { .. })));
    }

    #[test]
    fn test_invalid_frame() {
        let buffer = sample_tree();
        assert!(matches!(
            buffer.lookup("", "map", Duration::ZERO),
            Err(TfError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_wait_is_woken_by_broadcast() {
        let buffer = Arc::new(sample_tree());

        let publisher = Arc::clone(&buffer);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            publisher.send_transform(StampedTransform::new(
                "base",
                "gripper",
                Pose::from_position(Vec3::Z),
            ));
        });

        let result = buffer.lookup("base", "gripper", Duration::from_secs(5));
        handle.join().unwrap();
        assert!(result.unwrap().position.abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn test_transform_pose_same_frame_is_exact() {
        let buffer = TransformBuffer::new();
        let pose = Pose::new(Vec3::new(0.1, 0.2, 0.3), Quat::from_rotation_y(0.7));
        assert_eq!(
            buffer.transform_pose("map", "map", &pose, Duration::ZERO).unwrap(),
            pose
        );
    }

    #[test]
    fn test_unbounded_wait_does_not_overflow() {
        let buffer = Arc::new(sample_tree());
        assert!(buffer.lookup("map", "base", Duration::MAX).is_ok());

        let publisher = Arc::clone(&buffer);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            publisher.send_transform(StampedTransform::new("map", "lidar", Pose::IDENTITY));
        });

        let result = buffer.lookup("base", "lidar", Duration::MAX);
        handle.join().unwrap();
        assert!(result.is_ok());
    }
}
