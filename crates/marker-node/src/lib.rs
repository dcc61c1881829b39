//! Transformable Marker Node
//!
//! Drives the marker server from a line-oriented JSON stream: one inbound
//! [`NodeMessage`] per line, answered by zero or more [`NodeOutput`] lines
//! (published events first, then the reply).

use std::io::{BufRead, Write};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use marker_core::{Pose, RobotModel};
use marker_server::{
    EventQueue, ModelRequest, OutboundEvent, Request, Response, ServerConfig, SharedServer,
    StampedTransform, TransformBuffer, TransformableServer, UrdfModelMarker,
};

/// Node errors
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No model loaded")]
    NoModel,
}

/// One inbound line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeMessage {
    /// Message for the transformable object registry
    Server(Request),
    /// Message for the URDF model marker
    Model(ModelRequest),
    /// Transform published by another process
    Transform(StampedTransform),
}

/// One outbound line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOutput {
    Event(OutboundEvent),
    Response(Response),
    Error(String),
}

/// Registry, optional model marker and transform tree behind one stream
pub struct MarkerNode {
    server: SharedServer,
    model: Option<UrdfModelMarker>,
    tf: Arc<TransformBuffer>,
    events: Arc<EventQueue>,
    config: ServerConfig,
}

impl MarkerNode {
    pub fn new(config: ServerConfig) -> Self {
        let tf = Arc::new(TransformBuffer::new());
        let events = Arc::new(EventQueue::new());
        let server = TransformableServer::new(config.clone(), tf.clone(), events.clone());

        Self {
            server: server.into_shared(),
            model: None,
            tf,
            events,
            config,
        }
    }

    /// Attach markers for `model`, rooted at the identity pose in `frame_id`
    pub fn load_model(&mut self, model: &RobotModel, model_name: &str, frame_id: &str) {
        self.model = Some(UrdfModelMarker::new(
            model,
            model_name,
            frame_id,
            Pose::IDENTITY,
            self.tf.clone(),
            self.tf.clone(),
            self.events.clone(),
            self.config.transform_timeout(),
        ));
    }

    /// Shared handle for reconfiguration from other threads
    pub fn server(&self) -> SharedServer {
        Arc::clone(&self.server)
    }

    pub fn model(&self) -> Option<&UrdfModelMarker> {
        self.model.as_ref()
    }

    pub fn transforms(&self) -> &TransformBuffer {
        &self.tf
    }

    /// Run one message to completion
    pub fn dispatch(&mut self, message: NodeMessage) -> Result<Option<Response>, NodeError> {
        match message {
            NodeMessage::Server(request) => Ok(Some(self.server.lock().handle(request))),
            NodeMessage::Model(request) => {
                let model = self.model.as_mut().ok_or(NodeError::NoModel)?;
                tracing::debug!("Model request for '{}'", model.model_name());
                model.handle(request);
                Ok(None)
            }
            NodeMessage::Transform(transform) => {
                tracing::debug!(
                    "Transform {} -> {}",
                    transform.parent_frame,
                    transform.child_frame
                );
                self.tf.set_transform(transform);
                Ok(None)
            }
        }
    }

    /// Parse and dispatch one line, collecting everything it produced
    pub fn handle_line(&mut self, line: &str) -> Vec<NodeOutput> {
        let result = serde_json::from_str::<NodeMessage>(line)
            .map_err(NodeError::from)
            .and_then(|message| self.dispatch(message));

        let mut outputs: Vec<NodeOutput> =
            self.events.drain().into_iter().map(NodeOutput::Event).collect();
        match result {
            Ok(Some(response)) => outputs.push(NodeOutput::Response(response)),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Rejected message: {}", e);
                outputs.push(NodeOutput::Error(e.to_string()));
            }
        }
        outputs
    }

    /// Serve until `input` is exhausted
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<(), NodeError> {
        // Events published while loading the model go out first
        self.flush_events(&mut output)?;

        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            for out in self.handle_line(&line) {
                serde_json::to_writer(&mut output, &out)?;
                output.write_all(b"\n")?;
            }
            output.flush()?;
        }

        tracing::info!("Input closed, shutting down");
        Ok(())
    }

    fn flush_events<W: Write>(&mut self, output: &mut W) -> Result<(), NodeError> {
        for event in self.events.drain() {
            serde_json::to_writer(&mut *output, &NodeOutput::Event(event))?;
            output.write_all(b"\n")?;
        }
        output.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use marker_core::ShapeKind;
    use marker_server::{InteractiveSettings, MarkerOperate};

    const SINGLE_LINK: &str = r#"<robot name="sensor_head">
  <link name="body">
    <visual><geometry><sphere radius="0.1"/></geometry></visual>
  </link>
</robot>"#;

    fn send(node: &mut MarkerNode, message: NodeMessage) -> Vec<NodeOutput> {
        let line = serde_json::to_string(&message).unwrap();
        node.handle_line(&line)
    }

    #[test]
    fn test_insert_and_query_over_lines() {
        let mut node = MarkerNode::new(ServerConfig::default());

        let outputs = send(
            &mut node,
            NodeMessage::Server(Request::RequestMarkerOperate {
                operate: MarkerOperate::insert(ShapeKind::Torus, "map", "t1", "ring"),
            }),
        );
        assert!(matches!(
            &outputs[..],
            [
                NodeOutput::Event(OutboundEvent::MarkerUpdate(_)),
                NodeOutput::Event(OutboundEvent::FocusText(_)),
                NodeOutput::Event(OutboundEvent::FocusPose(_)),
                NodeOutput::Response(Response::Ack)
            ]
        ));

        let outputs = node.handle_line(r#"{"server":{"op":"get_type"}}"#);
        assert_eq!(
            outputs,
            vec![NodeOutput::Response(Response::Type {
                kind: Some(ShapeKind::Torus)
            })]
        );
    }

    #[test]
    fn test_malformed_line_reports_error() {
        let mut node = MarkerNode::new(ServerConfig::default());
        let outputs = node.handle_line(r#"{"server":{"op":"fly"}}"#);
        assert!(matches!(&outputs[..], [NodeOutput::Error(_)]));
    }

    #[test]
    fn test_model_message_without_model() {
        let mut node = MarkerNode::new(ServerConfig::default());
        let outputs = send(&mut node, NodeMessage::Model(ModelRequest::ResetAll));
        assert_eq!(
            outputs,
            vec![NodeOutput::Error(NodeError::NoModel.to_string())]
        );
    }

    #[test]
    fn test_transform_feeds_set_pose() {
        let mut node = MarkerNode::new(ServerConfig::default());
        send(
            &mut node,
            NodeMessage::Transform(StampedTransform::new(
                "map",
                "camera",
                Pose::from_position(Vec3::Z),
            )),
        );
        assert!(node.transforms().has_frame("camera"));

        node.server().lock().insert(ShapeKind::Box, "map", "b1", "");
        send(
            &mut node,
            NodeMessage::Server(Request::SetPose {
                pose: Pose::from_position(Vec3::X),
                frame_id: "camera".to_string(),
            }),
        );

        let pose = node.server().lock().get_pose("b1");
        assert!(pose.position.abs_diff_eq(Vec3::new(1.0, 0.0, 1.0), 1e-6));
    }

    #[test]
    fn test_model_reset_over_lines() {
        let mut node = MarkerNode::new(ServerConfig::default());
        let robot = RobotModel::from_urdf_str(SINGLE_LINK).unwrap();
        node.load_model(&robot, "sensor_head", "map");
        assert!(node.transforms().has_frame("sensor_head/body"));

        let outputs = node.handle_line(r#"{"model":{"op":"reset_pose","link":"body"}}"#);
        assert!(outputs.iter().any(|o| matches!(
            o,
            NodeOutput::Event(OutboundEvent::LinkPose { link, .. }) if link == "body"
        )));
    }

    #[test]
    fn test_run_writes_one_json_line_per_output() {
        let mut node = MarkerNode::new(ServerConfig::default());
        let input = concat!(
            r#"{"server":{"op":"request_marker_operate","operate":{"action":"insert","type":0,"frame_id":"map","name":"b1"}}}"#,
            "\n\n",
            r#"{"server":{"op":"get_dimensions","target":"b1"}}"#,
            "\n"
        );
        let mut output = Vec::new();
        node.run(input.as_bytes(), &mut output).unwrap();

        let lines: Vec<NodeOutput> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 5);
        let NodeOutput::Response(Response::Dimensions { dimensions }) = &lines[4] else {
            panic!("expected dimensions, got {:?}", lines[4]);
        };
        assert_eq!(dimensions.kind, Some(ShapeKind::Box));
    }

    #[test]
    fn test_reconfigure_through_shared_handle() {
        let node = MarkerNode::new(ServerConfig::default());
        let shared = node.server();
        std::thread::spawn(move || {
            shared.lock().apply_settings(InteractiveSettings {
                display_interactive_manipulator: false,
            })
        })
        .join()
        .unwrap();

        assert!(!node.server().lock().settings().display_interactive_manipulator);
    }
}
