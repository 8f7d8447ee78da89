//! Builder for dense graphs

use alloc::vec::Vec;

use crate::error::MlResult;
use crate::format::{Activation, DenseLayer, Graph};

/// Assembles a [`Graph`] one layer at a time.
///
/// Each layer takes its input width from the previous layer's output, so
/// only the network's input width and each layer's output width are given.
///
/// ```
/// use edgeinfer_ml::{Activation, DenseModelBuilder};
///
/// let graph = DenseModelBuilder::new(2)
///     .layer(1, Activation::Linear, vec![0.5, 0.5], vec![0.0])
///     .build()
///     .unwrap();
/// assert_eq!(graph.input_size(), 2);
/// assert_eq!(graph.output_size(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DenseModelBuilder {
    width: usize,
    layers: Vec<DenseLayer>,
}

impl DenseModelBuilder {
    /// Starts a network with `inputs` input values
    pub fn new(inputs: usize) -> Self {
        Self { width: inputs, layers: Vec::new() }
    }

    /// Appends a layer with `outputs` units.
    ///
    /// `weights` is `outputs × inputs`, row-major by output.
    pub fn layer(
        mut self,
        outputs: usize,
        activation: Activation,
        weights: Vec<f32>,
        biases: Vec<f32>,
    ) -> Self {
        self.layers.push(DenseLayer { inputs: self.width, outputs, activation, weights, biases });
        self.width = outputs;
        self
    }

    /// Validates and returns the graph
    pub fn build(self) -> MlResult<Graph> {
        Graph::new(self.layers)
    }

    /// Validates and encodes the graph
    pub fn to_bytes(self) -> MlResult<Vec<u8>> {
        Ok(self.build()?.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MlError;
    use alloc::vec;

    #[test]
    fn empty_builder_fails() {
        assert_eq!(DenseModelBuilder::new(3).build(), Err(MlError::EmptyLayer));
    }

    #[test]
    fn wrong_weight_count_fails() {
        let err = DenseModelBuilder::new(3)
            .layer(2, Activation::Relu, vec![0.0; 5], vec![0.0; 2])
            .build();
        assert_eq!(err, Err(MlError::ParameterCount));
    }

    #[test]
    fn widths_chain() {
        let graph = DenseModelBuilder::new(4)
            .layer(8, Activation::Tanh, vec![0.1; 32], vec![0.0; 8])
            .layer(2, Activation::Sigmoid, vec![0.1; 16], vec![0.0; 2])
            .build()
            .unwrap();
        assert_eq!(graph.layers()[1].inputs, 8);
        assert_eq!(graph.max_width(), 8);
    }
}
