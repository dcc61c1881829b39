//! Focus-tracked registry of transformable objects
//!
//! Every inbound message resolves its target (explicit name or the focused
//! object), delegates the change to the object, then re-renders and
//! publishes. Unknown targets are ignored, transform failures are logged and
//! leave state untouched.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use marker_core::{
    Feedback, FeedbackEvent, MarkerDimensions, OverlayText, Pose, Shape, ShapeKind,
    TransformableObject,
};

use crate::config::{InteractiveSettings, ServerConfig};
use crate::marker_server::InteractiveMarkerServer;
use crate::outbox::{OutboundEvent, Outbox};
use crate::request::{MarkerOperate, OperateAction, Request, Response};
use crate::tf::TransformLookup;

/// Registry shared with the reconfiguration handler
pub type SharedServer = Arc<Mutex<TransformableServer>>;

/// Attribute adjustable on the focused object
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attribute {
    Color([f32; 4]),
    Radius(f32),
    SmallRadius(f32),
    X(f32),
    Y(f32),
    Z(f32),
}

/// Registry of transformable objects with a single focused object
pub struct TransformableServer {
    objects: HashMap<String, TransformableObject>,
    focus: Option<String>,
    markers: InteractiveMarkerServer,
    settings: InteractiveSettings,
    config: ServerConfig,
    tf: Arc<dyn TransformLookup>,
    outbox: Arc<dyn Outbox>,
}

impl TransformableServer {
    pub fn new(config: ServerConfig, tf: Arc<dyn TransformLookup>, outbox: Arc<dyn Outbox>) -> Self {
        tracing::info!("Starting transformable marker server '{}'", config.server_name);
        Self {
            objects: HashMap::new(),
            focus: None,
            markers: InteractiveMarkerServer::new(config.server_name.clone()),
            settings: config.initial_settings(),
            config,
            tf,
            outbox,
        }
    }

    pub fn into_shared(self) -> SharedServer {
        Arc::new(Mutex::new(self))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TransformableObject> {
        self.objects.get(name)
    }

    pub fn focus(&self) -> Option<&str> {
        self.focus.as_deref()
    }

    pub fn focused(&self) -> Option<&TransformableObject> {
        self.focus.as_ref().and_then(|name| self.objects.get(name))
    }

    pub fn settings(&self) -> InteractiveSettings {
        self.settings
    }

    pub fn marker_server(&self) -> &InteractiveMarkerServer {
        &self.markers
    }

    /// Dispatch one inbound message
    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::SetPose { pose, frame_id } => self.set_pose_of_focused(pose, &frame_id),
            Request::SetColor { color } => self.adjust_attribute(Attribute::Color(color)),
            Request::SetRadius { value } => self.adjust_attribute(Attribute::Radius(value)),
            Request::SetSmallRadius { value } => {
                self.adjust_attribute(Attribute::SmallRadius(value))
            }
            Request::SetX { value } => self.adjust_attribute(Attribute::X(value)),
            Request::SetY { value } => self.adjust_attribute(Attribute::Y(value)),
            Request::SetZ { value } => self.adjust_attribute(Attribute::Z(value)),
            Request::AddPose { pose } => self.add_pose(pose, false),
            Request::AddPoseRelative { pose } => self.add_pose(pose, true),
            Request::GetPose { target } => {
                return Response::Pose {
                    pose: self.get_pose(&target),
                };
            }
            Request::GetType { target } => {
                return Response::Type {
                    kind: self.get_type(&target),
                };
            }
            Request::SetDimensions { target, dimensions } => {
                self.set_dimensions(&target, &dimensions)
            }
            Request::GetDimensions { target } => {
                return Response::Dimensions {
                    dimensions: self.get_dimensions(&target),
                };
            }
            Request::RequestMarkerOperate { operate } => self.operate(operate),
            Request::Feedback { feedback } => self.process_feedback(&feedback),
            Request::Reconfigure { settings } => self.apply_settings(settings),
        }
        Response::Ack
    }

    /// Lifecycle request dispatch
    pub fn operate(&mut self, operate: MarkerOperate) {
        match operate.action {
            OperateAction::Insert => match ShapeKind::from_code(operate.shape) {
                Some(kind) => {
                    self.insert(kind, &operate.frame_id, &operate.name, &operate.description)
                }
                None => tracing::debug!("Ignoring insert with unknown type {}", operate.shape),
            },
            OperateAction::Erase => self.erase(&operate.name),
            OperateAction::EraseAll => self.erase_all(),
            OperateAction::EraseFocus => self.erase_focused(),
        }
    }

    /// Register a new object with default dimensions and focus it
    ///
    /// An existing object with the same name is replaced.
    pub fn insert(&mut self, kind: ShapeKind, frame_id: &str, name: &str, description: &str) {
        let shape = Shape::with_defaults(kind, self.config.torus_udiv, self.config.torus_vdiv);
        let mut object = TransformableObject::new(shape, frame_id, name, description);
        object.display_interactive_manipulator = self.settings.display_interactive_manipulator;

        self.markers.insert(object.interactive_marker());
        if self.objects.insert(name.to_string(), object).is_some() {
            tracing::debug!("Replaced existing object '{}'", name);
        }
        self.apply_changes();

        tracing::info!("Inserted {} '{}' in frame '{}'", kind.display_name(), name, frame_id);
        self.set_focus(name);
    }

    /// Remove an object; clears focus if it was focused
    pub fn erase(&mut self, name: &str) {
        self.markers.erase(name);
        self.apply_changes();

        if self.focus.as_deref() == Some(name) {
            self.focus = None;
            self.publish_focus();
        }

        if self.objects.remove(name).is_some() {
            tracing::info!("Erased object '{}'", name);
        } else {
            tracing::debug!("Erase of unknown object '{}' ignored", name);
        }
    }

    pub fn erase_all(&mut self) {
        let names: Vec<String> = self.objects.keys().cloned().collect();
        for name in names {
            self.erase(&name);
        }
    }

    pub fn erase_focused(&mut self) {
        if let Some(name) = self.focus.clone() {
            self.erase(&name);
        }
    }

    /// Focus an existing object and publish the focus overlays
    pub fn set_focus(&mut self, name: &str) {
        if !self.objects.contains_key(name) {
            tracing::debug!("Focus on unknown object '{}' ignored", name);
            return;
        }
        self.focus = Some(name.to_string());
        self.publish_focus();
    }

    /// Move the focused object to `pose`, given in `source_frame`
    pub fn set_pose_of_focused(&mut self, pose: Pose, source_frame: &str) {
        let Some(name) = self.focus.clone() else {
            return;
        };
        let timeout = self.config.transform_timeout();
        let Some(object) = self.objects.get_mut(&name) else {
            return;
        };

        match self
            .tf
            .transform_pose(&object.frame_id, source_frame, &pose, timeout)
        {
            Ok(transformed) => {
                object.set_pose(transformed);
                let frame_id = object.frame_id.clone();
                self.markers.set_pose(&name, transformed, &frame_id);
                self.apply_changes();
            }
            Err(e) => tracing::error!("Transform error: {}", e),
        }
    }

    /// Change one attribute of the focused object
    ///
    /// Only an actual change re-renders and broadcasts dimensions.
    pub fn adjust_attribute(&mut self, attribute: Attribute) {
        let Some(object) = self.focus.as_ref().and_then(|n| self.objects.get_mut(n)) else {
            return;
        };

        let changed = match attribute {
            Attribute::Color(color) => object.set_color(color),
            Attribute::Radius(value) => object.set_radius(value),
            Attribute::SmallRadius(value) => object.set_small_radius(value),
            Attribute::X(value) => object.set_x(value),
            Attribute::Y(value) => object.set_y(value),
            Attribute::Z(value) => object.set_z(value),
        };

        if !changed {
            tracing::debug!("{:?} left '{}' unchanged", attribute, object.name);
            return;
        }

        let marker = object.interactive_marker();
        let dimensions = object.dimensions();
        self.markers.insert(marker);
        self.apply_changes();
        self.outbox
            .publish(OutboundEvent::MarkerDimensions(dimensions));
    }

    /// Apply a pose delta to the focused object
    pub fn add_pose(&mut self, delta: Pose, relative: bool) {
        let Some(object) = self.focus.as_ref().and_then(|n| self.objects.get_mut(n)) else {
            return;
        };
        object.add_pose(delta, relative);
        let marker = object.interactive_marker();
        self.markers.insert(marker);
        self.apply_changes();
    }

    /// Explicit name if non-empty, otherwise the focused object
    fn resolve_target<'a>(&'a self, target: &'a str) -> Option<&'a str> {
        if target.is_empty() {
            self.focus.as_deref()
        } else {
            Some(target)
        }
    }

    fn target(&self, target: &str) -> Option<&TransformableObject> {
        self.resolve_target(target)
            .and_then(|name| self.objects.get(name))
    }

    pub fn get_pose(&self, target: &str) -> Pose {
        self.target(target).map(|o| *o.pose()).unwrap_or_default()
    }

    pub fn get_type(&self, target: &str) -> Option<ShapeKind> {
        self.target(target).map(|o| o.kind())
    }

    pub fn get_dimensions(&self, target: &str) -> MarkerDimensions {
        self.target(target)
            .map(|o| o.dimensions())
            .unwrap_or_default()
    }

    /// Apply the kind-relevant fields of `dimensions` to the target
    pub fn set_dimensions(&mut self, target: &str, dimensions: &MarkerDimensions) {
        let Some(name) = self.resolve_target(target).map(str::to_string) else {
            return;
        };
        let Some(object) = self.objects.get_mut(&name) else {
            return;
        };

        let changed = object.set_dimensions(dimensions);
        let current = object.dimensions();
        if changed {
            let marker = object.interactive_marker();
            self.markers.insert(marker);
            self.apply_changes();
        }
        self.outbox
            .publish(OutboundEvent::MarkerDimensions(current));
    }

    /// Handle user interaction reported by the front end
    pub fn process_feedback(&mut self, feedback: &Feedback) {
        match feedback.event {
            FeedbackEvent::MouseDown => self.set_focus(&feedback.marker_name),
            FeedbackEvent::PoseUpdate => self.apply_pose_feedback(feedback),
            _ => {}
        }
    }

    fn apply_pose_feedback(&mut self, feedback: &Feedback) {
        let name = &feedback.marker_name;
        let timeout = self.config.transform_timeout();
        let Some(object) = self.objects.get_mut(name) else {
            tracing::error!("Invalid ObjectId Request Received {}", name);
            return;
        };

        match self
            .tf
            .transform_pose(&object.frame_id, &feedback.frame_id, &feedback.pose, timeout)
        {
            Ok(transformed) => {
                object.set_pose(transformed);
                // The front end already shows the dragged pose, so it is not re-sent
                self.markers.sync_pose(name, transformed, &object.frame_id);
            }
            Err(e) => {
                tracing::error!("Transform error: {}", e);
                return;
            }
        }

        if self.focus.as_deref() != Some(name.as_str()) {
            self.set_focus(name);
        }
    }

    /// Live reconfiguration: store settings on every object and re-render
    pub fn apply_settings(&mut self, settings: InteractiveSettings) {
        self.settings = settings;
        for object in self.objects.values_mut() {
            object.display_interactive_manipulator = settings.display_interactive_manipulator;
            self.markers.insert(object.interactive_marker());
        }
        self.apply_changes();
        tracing::info!("Applied interactive settings {:?}", settings);
    }

    fn apply_changes(&mut self) {
        if let Some(update) = self.markers.apply_changes() {
            self.outbox.publish(OutboundEvent::MarkerUpdate(update));
        }
    }

    fn publish_focus(&self) {
        let focused = self.focused();
        self.outbox.publish(OutboundEvent::FocusText(OverlayText::focus_name(
            focused.map(|o| o.name.as_str()),
        )));
        self.outbox.publish(OutboundEvent::FocusPose(OverlayText::focus_pose(
            focused.map(|o| o.pose()),
        )));
    }
}
