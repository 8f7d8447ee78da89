//! Dense network engine
//!
//! [`DenseEngine`] evaluates a [`Graph`] layer by layer, alternating between
//! two scratch vectors sized to the widest layer. No allocation happens on
//! the invoke path once a graph is loaded.

use alloc::vec::Vec;

use edgeinfer_core::{AiEngine, AiResult};

use crate::error::{MlError, MlResult};
use crate::format::Graph;

/// [`AiEngine`] backed by an EIDN dense graph
#[derive(Debug, Default)]
pub struct DenseEngine {
    graph: Option<Graph>,
    ping: Vec<f32>,
    pong: Vec<f32>,
}

impl DenseEngine {
    /// Creates an engine with no graph loaded
    pub const fn new() -> Self {
        Self { graph: None, ping: Vec::new(), pong: Vec::new() }
    }

    /// Creates an engine around an already decoded graph
    pub fn with_graph(graph: Graph) -> MlResult<Self> {
        let mut engine = Self::new();
        engine.install(graph)?;
        Ok(engine)
    }

    /// Loaded graph, if any
    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_ref()
    }

    fn install(&mut self, graph: Graph) -> MlResult<()> {
        let width = graph.max_width();
        let mut ping = Vec::new();
        let mut pong = Vec::new();
        ping.try_reserve_exact(width).map_err(|_| MlError::NoMemory)?;
        pong.try_reserve_exact(width).map_err(|_| MlError::NoMemory)?;
        ping.resize(width, 0.0);
        pong.resize(width, 0.0);

        self.ping = ping;
        self.pong = pong;
        self.graph = Some(graph);
        Ok(())
    }

    /// Runs the graph and returns the output slice
    pub fn forward(&mut self, input: &[f32]) -> MlResult<&[f32]> {
        let graph = self.graph.as_ref().ok_or(MlError::NotLoaded)?;
        if input.len() != graph.input_size() {
            return Err(MlError::InputSize { expected: graph.input_size(), found: input.len() });
        }

        self.ping[..input.len()].copy_from_slice(input);
        let mut in_ping = true;
        for layer in graph.layers() {
            let (src, dst) = if in_ping {
                (&self.ping, &mut self.pong)
            } else {
                (&self.pong, &mut self.ping)
            };
            layer.forward(&src[..layer.inputs], &mut dst[..layer.outputs]);
            in_ping = !in_ping;
        }

        let out = if in_ping { &self.ping } else { &self.pong };
        Ok(&out[..graph.output_size()])
    }
}

impl AiEngine for DenseEngine {
    fn load_from_bytes(&mut self, graph: &[u8]) -> AiResult<()> {
        let graph = Graph::parse(graph).map_err(|e| {
            log::warn!("Rejected dense graph: {}", e);
            e
        })?;
        log::debug!(
            "Loaded dense graph: {} layers, {} -> {}",
            graph.layers().len(),
            graph.input_size(),
            graph.output_size()
        );
        self.install(graph)?;
        Ok(())
    }

    fn input_size(&self) -> usize {
        self.graph.as_ref().map_or(0, Graph::input_size)
    }

    fn output_size(&self) -> usize {
        self.graph.as_ref().map_or(0, Graph::output_size)
    }

    fn invoke(&mut self, input: &[f32]) -> AiResult<&[f32]> {
        Ok(self.forward(input)?)
    }
}
