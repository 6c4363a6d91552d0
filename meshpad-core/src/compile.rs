/// CAD compile pipeline
///
/// Code goes in as a string, a binary mesh comes back. The exchange is
/// message based: a [`CompileClient`] turns code into a [`WorkerRequest`]
/// and turns the matching [`WorkerResponse`] into geometry. Requests are
/// tracked in a table keyed by [`RequestId`], so overlapping requests each
/// resolve to their own caller.
///
/// On native targets [`CompileWorker`] runs a [`CadCompiler`] on a
/// background thread and talks to it over `std::sync::mpsc` channels. The
/// web front-end posts the serialized request to a JS worker instead.
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CompileError;
use crate::geometry::GeometryBuffer;
use crate::stl;

/// Correlates a response with the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    pub fn from_u64(id: u64) -> Self {
        Self(id)
    }

    pub fn to_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What to do with a request while another is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilePolicy {
    /// Accept it; every pending request resolves independently.
    #[default]
    Queue,
    /// Reject it with [`CompileError::Busy`].
    SingleFlight,
}

/// Message sent to the compile worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerRequest {
    Compile { id: RequestId, code: String },
}

impl WorkerRequest {
    pub fn id(&self) -> RequestId {
        match self {
            WorkerRequest::Compile { id, .. } => *id,
        }
    }
}

/// Message sent back by the compile worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkerResponse {
    Failed { id: RequestId, error: String },
    Compiled { id: RequestId, stl: Vec<u8> },
}

impl WorkerResponse {
    pub fn id(&self) -> RequestId {
        match self {
            WorkerResponse::Failed { id, .. } | WorkerResponse::Compiled { id, .. } => *id,
        }
    }

    /// Wrap a compiler outcome for `id`.
    pub fn from_result(id: RequestId, result: Result<Vec<u8>, CompileError>) -> Self {
        match result {
            Ok(stl) => WorkerResponse::Compiled { id, stl },
            Err(err) => WorkerResponse::Failed {
                id,
                error: err.to_string(),
            },
        }
    }
}

/// Request side of the worker protocol.
#[derive(Debug, Default)]
pub struct CompileClient {
    policy: CompilePolicy,
    next_id: u64,
    /// Pending request ids mapped to the size of the submitted code.
    pending: HashMap<RequestId, usize>,
}

impl CompileClient {
    pub fn new(policy: CompilePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> CompilePolicy {
        self.policy
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Allocate an id for `code` and build the message to post.
    pub fn request(&mut self, code: impl Into<String>) -> Result<WorkerRequest, CompileError> {
        if self.policy == CompilePolicy::SingleFlight {
            if let Some(pending) = self.pending.keys().next() {
                return Err(CompileError::Busy {
                    pending: pending.to_u64(),
                });
            }
        }

        let code = code.into();
        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.pending.insert(id, code.len());
        debug!(%id, bytes = code.len(), "compile request issued");
        Ok(WorkerRequest::Compile { id, code })
    }

    /// Resolve the pending request a response belongs to.
    ///
    /// The request is removed from the table whatever the outcome. A
    /// response for an id that is not pending is rejected.
    pub fn complete(
        &mut self,
        response: WorkerResponse,
    ) -> (RequestId, Result<GeometryBuffer, CompileError>) {
        let id = response.id();
        if self.pending.remove(&id).is_none() {
            warn!(%id, "compile response for unknown request");
            return (id, Err(CompileError::UnknownRequest(id.to_u64())));
        }

        let result = match response {
            WorkerResponse::Failed { error, .. } => Err(CompileError::Compiler(error)),
            WorkerResponse::Compiled { stl, .. } => stl::decode(&stl).map_err(CompileError::from),
        };
        match &result {
            Ok(geometry) => debug!(%id, triangles = geometry.triangle_count(), "compile resolved"),
            Err(err) => debug!(%id, %err, "compile rejected"),
        }
        (id, result)
    }

    /// Forget a request whose response will never arrive.
    pub fn cancel(&mut self, id: RequestId) -> bool {
        self.pending.remove(&id).is_some()
    }
}

/// Turns CAD source code into STL bytes.
pub trait CadCompiler: Send + 'static {
    fn compile(&mut self, code: &str) -> Result<Vec<u8>, CompileError>;
}

impl<F> CadCompiler for F
where
    F: FnMut(&str) -> Result<Vec<u8>, CompileError> + Send + 'static,
{
    fn compile(&mut self, code: &str) -> Result<Vec<u8>, CompileError> {
        self(code)
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::{CompileWorker, OpenScadCli};

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::PathBuf;
    use std::process::Command;
    use std::sync::mpsc;
    use std::thread::{self, JoinHandle};

    use tracing::{debug, info};

    use super::{CadCompiler, CompileClient, CompilePolicy, RequestId, WorkerRequest, WorkerResponse};
    use crate::error::CompileError;
    use crate::geometry::GeometryBuffer;

    /// Runs the `openscad` command line in a scratch directory.
    #[derive(Debug, Clone)]
    pub struct OpenScadCli {
        program: PathBuf,
    }

    impl Default for OpenScadCli {
        fn default() -> Self {
            Self::new("openscad")
        }
    }

    impl OpenScadCli {
        pub fn new(program: impl Into<PathBuf>) -> Self {
            Self {
                program: program.into(),
            }
        }
    }

    impl CadCompiler for OpenScadCli {
        fn compile(&mut self, code: &str) -> Result<Vec<u8>, CompileError> {
            let dir = tempfile::tempdir()?;
            let input = dir.path().join("model.scad");
            let output = dir.path().join("model.stl");
            std::fs::write(&input, code)?;

            let run = Command::new(&self.program)
                .arg("-o")
                .arg(&output)
                .arg(&input)
                .output()?;
            if !run.status.success() {
                let stderr = String::from_utf8_lossy(&run.stderr);
                return Err(CompileError::Compiler(stderr.trim().to_string()));
            }
            Ok(std::fs::read(&output)?)
        }
    }

    /// A compiler on a background thread.
    ///
    /// Requests are handled in submission order. Responses are matched to
    /// their request by id, so results may be collected in any order.
    pub struct CompileWorker {
        client: CompileClient,
        requests: Option<mpsc::Sender<WorkerRequest>>,
        responses: mpsc::Receiver<WorkerResponse>,
        /// Resolved while waiting on a different id
        ready: Vec<(RequestId, Result<GeometryBuffer, CompileError>)>,
        thread: Option<JoinHandle<()>>,
    }

    impl CompileWorker {
        pub fn spawn(compiler: impl CadCompiler, policy: CompilePolicy) -> Result<Self, CompileError> {
            let (request_tx, request_rx) = mpsc::channel::<WorkerRequest>();
            let (response_tx, response_rx) = mpsc::channel();
            let mut compiler = compiler;

            let thread = thread::Builder::new()
                .name("meshpad-compile".into())
                .spawn(move || {
                    for request in request_rx {
                        let WorkerRequest::Compile { id, code } = request;
                        debug!(%id, "compiling");
                        let response = WorkerResponse::from_result(id, compiler.compile(&code));
                        if response_tx.send(response).is_err() {
                            break;
                        }
                    }
                    debug!("compile worker exiting");
                })?;

            info!(?policy, "compile worker started");
            Ok(Self {
                client: CompileClient::new(policy),
                requests: Some(request_tx),
                responses: response_rx,
                ready: Vec::new(),
                thread: Some(thread),
            })
        }

        pub fn pending_count(&self) -> usize {
            self.client.pending_count()
        }

        /// Queue `code` for compilation.
        pub fn submit(&mut self, code: impl Into<String>) -> Result<RequestId, CompileError> {
            let requests = self.requests.as_ref().ok_or(CompileError::WorkerGone)?;
            let request = self.client.request(code)?;
            let id = request.id();
            if requests.send(request).is_err() {
                self.client.cancel(id);
                return Err(CompileError::WorkerGone);
            }
            Ok(id)
        }

        /// Collect one finished request without blocking.
        pub fn poll(&mut self) -> Option<(RequestId, Result<GeometryBuffer, CompileError>)> {
            if !self.ready.is_empty() {
                return Some(self.ready.remove(0));
            }
            let response = self.responses.try_recv().ok()?;
            Some(self.client.complete(response))
        }

        /// Block until request `id` resolves.
        pub fn wait(&mut self, id: RequestId) -> Result<GeometryBuffer, CompileError> {
            if let Some(slot) = self.ready.iter().position(|(ready, _)| *ready == id) {
                return self.ready.remove(slot).1;
            }
            if !self.client.is_pending(id) {
                return Err(CompileError::UnknownRequest(id.to_u64()));
            }
            loop {
                let response = self.responses.recv().map_err(|_| CompileError::WorkerGone)?;
                let (resolved, result) = self.client.complete(response);
                if resolved == id {
                    return result;
                }
                self.ready.push((resolved, result));
            }
        }

        /// Stop accepting work and join the thread.
        pub fn shutdown(&mut self) {
            self.requests.take();
            if let Some(thread) = self.thread.take() {
                let _ = thread.join();
                info!("compile worker stopped");
            }
        }
    }

    impl Drop for CompileWorker {
        fn drop(&mut self) {
            self.shutdown();
        }
    }
}
