//! Audio backend trait: a semantic-level abstraction over sound-server
//! operations.
//!
//! `AudioBackend` captures what the engine *means* to do (create a synth
//! at a time, retune a node, release it) independently of how it's done
//! (timestamped OSC bundles to SuperCollider). This enables unit testing
//! of the scheduler and the voice realization policy without a running
//! server.

use std::fmt;
use std::net::UdpSocket;

use rosc::{OscBundle, OscMessage, OscPacket, OscType};

use super::clock;

/// Result type for backend operations.
pub type BackendResult<T = ()> = Result<T, BackendError>;

/// Error from a backend operation.
#[derive(Debug, Clone)]
pub struct BackendError(pub String);

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(e: std::io::Error) -> Self {
        BackendError(e.to_string())
    }
}

impl From<String> for BackendError {
    fn from(s: String) -> Self {
        BackendError(s)
    }
}

/// Semantic-level audio backend trait.
///
/// `at_secs` values are absolute times on the engine clock
/// (`clock::now_secs` scale). Implementations translate them into their
/// transport's own notion of time.
pub trait AudioBackend: Send {
    /// Current engine-clock reading, or None when the backend has no
    /// usable clock (not connected). The scheduler treats None as "not
    /// yet startable" and degrades to a no-op.
    fn now_secs(&self) -> Option<f64>;

    /// Create a synth at an absolute engine-clock time.
    fn create_synth_at(
        &self,
        def_name: &str,
        node_id: i32,
        params: &[(String, f32)],
        at_secs: f64,
    ) -> BackendResult;

    /// Set parameters on a node at an absolute engine-clock time.
    fn set_params_at(&self, node_id: i32, params: &[(&str, f32)], at_secs: f64) -> BackendResult;

    /// Free (remove) a node from the server immediately.
    fn free_node(&self, node_id: i32) -> BackendResult;
}

// ─── SuperCollider Backend ──────────────────────────────────────────

/// Backend that speaks OSC/UDP to a running scsynth instance. Events in
/// the future are shipped as timestamped bundles; the server realizes
/// them sample-accurately on its own clock.
pub struct ScBackend {
    socket: UdpSocket,
}

impl ScBackend {
    /// Bind a local socket and associate it with the server address.
    pub fn connect(server_addr: &str) -> Result<Self, String> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .map_err(|e| format!("could not bind OSC socket: {}", e))?;
        socket
            .connect(server_addr)
            .map_err(|e| format!("could not reach {}: {}", server_addr, e))?;
        Ok(Self { socket })
    }

    fn send_packet(&self, packet: OscPacket) -> BackendResult {
        let bytes = rosc::encoder::encode(&packet)
            .map_err(|e| BackendError(format!("OSC encode failed: {:?}", e)))?;
        self.socket.send(&bytes)?;
        Ok(())
    }

    fn send_message(&self, addr: &str, args: Vec<OscType>) -> BackendResult {
        self.send_packet(OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        }))
    }

    fn send_bundle_at(&self, messages: Vec<OscMessage>, at_secs: f64) -> BackendResult {
        self.send_packet(OscPacket::Bundle(OscBundle {
            timetag: clock::osc_time_at(at_secs),
            content: messages.into_iter().map(OscPacket::Message).collect(),
        }))
    }

    fn s_new_message(def_name: &str, node_id: i32, params: &[(String, f32)]) -> OscMessage {
        // addToTail of the default group.
        let mut args = vec![
            OscType::String(def_name.to_string()),
            OscType::Int(node_id),
            OscType::Int(1),
            OscType::Int(0),
        ];
        for (name, value) in params {
            args.push(OscType::String(name.clone()));
            args.push(OscType::Float(*value));
        }
        OscMessage {
            addr: "/s_new".to_string(),
            args,
        }
    }
}

impl AudioBackend for ScBackend {
    fn now_secs(&self) -> Option<f64> {
        Some(clock::now_secs())
    }

    fn create_synth_at(
        &self,
        def_name: &str,
        node_id: i32,
        params: &[(String, f32)],
        at_secs: f64,
    ) -> BackendResult {
        self.send_bundle_at(vec![Self::s_new_message(def_name, node_id, params)], at_secs)
    }

    fn set_params_at(&self, node_id: i32, params: &[(&str, f32)], at_secs: f64) -> BackendResult {
        let mut args = vec![OscType::Int(node_id)];
        for &(name, value) in params {
            args.push(OscType::String(name.to_string()));
            args.push(OscType::Float(value));
        }
        self.send_bundle_at(
            vec![OscMessage {
                addr: "/n_set".to_string(),
                args,
            }],
            at_secs,
        )
    }

    fn free_node(&self, node_id: i32) -> BackendResult {
        self.send_message("/n_free", vec![OscType::Int(node_id)])
    }
}

// ─── Test Backend ───────────────────────────────────────────────────

use std::sync::{Arc, Mutex};

/// An operation recorded by `TestBackend` for assertion in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum TestOp {
    CreateSynthAt {
        def_name: String,
        node_id: i32,
        params: Vec<(String, f32)>,
        at_secs: f64,
    },
    SetParamsAt {
        node_id: i32,
        params: Vec<(String, f32)>,
        at_secs: f64,
    },
    FreeNode(i32),
}

/// A test backend that records operations and exposes a settable clock,
/// so scheduler behavior over time is fully deterministic in tests.
pub struct TestBackend {
    ops: Mutex<Vec<TestOp>>,
    now: Mutex<Option<f64>>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
            now: Mutex::new(Some(0.0)),
        }
    }

    /// A backend whose clock is unavailable (simulates "not connected").
    pub fn without_clock() -> Self {
        Self {
            ops: Mutex::new(Vec::new()),
            now: Mutex::new(None),
        }
    }

    pub fn set_now(&self, secs: f64) {
        *self.now.lock().unwrap() = Some(secs);
    }

    /// Return all recorded operations.
    pub fn operations(&self) -> Vec<TestOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.ops.lock().unwrap().clear();
    }

    pub fn count<F: Fn(&TestOp) -> bool>(&self, f: F) -> usize {
        self.ops.lock().unwrap().iter().filter(|op| f(op)).count()
    }
}

impl Default for TestBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for TestBackend {
    fn now_secs(&self) -> Option<f64> {
        *self.now.lock().unwrap()
    }

    fn create_synth_at(
        &self,
        def_name: &str,
        node_id: i32,
        params: &[(String, f32)],
        at_secs: f64,
    ) -> BackendResult {
        self.ops.lock().unwrap().push(TestOp::CreateSynthAt {
            def_name: def_name.to_string(),
            node_id,
            params: params.to_vec(),
            at_secs,
        });
        Ok(())
    }

    fn set_params_at(&self, node_id: i32, params: &[(&str, f32)], at_secs: f64) -> BackendResult {
        self.ops.lock().unwrap().push(TestOp::SetParamsAt {
            node_id,
            params: params.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            at_secs,
        });
        Ok(())
    }

    fn free_node(&self, node_id: i32) -> BackendResult {
        self.ops.lock().unwrap().push(TestOp::FreeNode(node_id));
        Ok(())
    }
}

/// Wraps `Arc<TestBackend>` to implement `AudioBackend` so the engine can
/// own a `Box<dyn AudioBackend>` while tests retain an `Arc` for
/// assertions and clock control.
pub struct SharedTestBackend(pub Arc<TestBackend>);

impl AudioBackend for SharedTestBackend {
    fn now_secs(&self) -> Option<f64> {
        self.0.now_secs()
    }
    fn create_synth_at(
        &self,
        def_name: &str,
        node_id: i32,
        params: &[(String, f32)],
        at_secs: f64,
    ) -> BackendResult {
        self.0.create_synth_at(def_name, node_id, params, at_secs)
    }
    fn set_params_at(&self, node_id: i32, params: &[(&str, f32)], at_secs: f64) -> BackendResult {
        self.0.set_params_at(node_id, params, at_secs)
    }
    fn free_node(&self, node_id: i32) -> BackendResult {
        self.0.free_node(node_id)
    }
}
