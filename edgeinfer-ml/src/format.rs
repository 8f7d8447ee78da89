//! EIDN Binary Graph Format
//!
//! A compact, little-endian encoding of a feed-forward dense network:
//!
//! ```text
//! offset  size  field
//! 0       4     magic "EIDN"
//! 4       2     format version (1)
//! 6       2     layer count
//! 8       ...   layers, each:
//!               2   inputs
//!               2   outputs
//!               1   activation (0 linear, 1 relu, 2 tanh, 3 sigmoid)
//!               4 × inputs × outputs   weights, row-major by output
//!               4 × outputs            biases
//! ```
//!
//! Consecutive layers must chain: `outputs[i] == inputs[i + 1]`.

use alloc::vec::Vec;

use crate::error::{MlError, MlResult};

/// File magic
pub const MAGIC: [u8; 4] = *b"EIDN";

/// Supported format version
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = 8;
const LAYER_HEADER_LEN: usize = 5;

/// Element-wise nonlinearity applied after a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Identity
    Linear,
    /// max(0, x)
    Relu,
    /// Hyperbolic tangent
    Tanh,
    /// 1 / (1 + e^-x)
    Sigmoid,
}

impl Activation {
    /// Wire code
    pub const fn code(self) -> u8 {
        match self {
            Self::Linear => 0,
            Self::Relu => 1,
            Self::Tanh => 2,
            Self::Sigmoid => 3,
        }
    }

    /// Decodes a wire code
    pub fn from_code(code: u8) -> MlResult<Self> {
        match code {
            0 => Ok(Self::Linear),
            1 => Ok(Self::Relu),
            2 => Ok(Self::Tanh),
            3 => Ok(Self::Sigmoid),
            other => Err(MlError::UnknownActivation(other)),
        }
    }

    /// Applies the activation to one value
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Self::Linear => x,
            Self::Relu => x.max(0.0),
            Self::Tanh => libm::tanhf(x),
            Self::Sigmoid => 1.0 / (1.0 + libm::expf(-x)),
        }
    }
}

/// One fully connected layer
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    /// Input width
    pub inputs: usize,
    /// Output width
    pub outputs: usize,
    /// Activation after the affine transform
    pub activation: Activation,
    /// `outputs × inputs` weights, row-major by output
    pub weights: Vec<f32>,
    /// `outputs` biases
    pub biases: Vec<f32>,
}

impl DenseLayer {
    /// Computes `out = activation(W · input + b)`
    ///
    /// Writes at most one value per complete weight row that has a bias.
    pub(crate) fn forward(&self, input: &[f32], out: &mut [f32]) {
        if self.inputs == 0 {
            return;
        }
        let rows = self.weights.chunks_exact(self.inputs).zip(&self.biases);
        for (slot, (row, bias)) in out.iter_mut().take(self.outputs).zip(rows) {
            let sum: f32 = row.iter().zip(input).map(|(w, x)| w * x).sum();
            *slot = self.activation.apply(sum + bias);
        }
    }

    fn encoded_len(&self) -> usize {
        LAYER_HEADER_LEN + 4 * (self.weights.len() + self.biases.len())
    }
}

/// Decoded network
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    layers: Vec<DenseLayer>,
}

impl Graph {
    /// Builds a graph from layers, checking that they chain
    pub fn new(layers: Vec<DenseLayer>) -> MlResult<Self> {
        if layers.is_empty() {
            return Err(MlError::EmptyLayer);
        }
        for (i, layer) in layers.iter().enumerate() {
            if layer.inputs == 0 || layer.outputs == 0 {
                return Err(MlError::EmptyLayer);
            }
            if layer.inputs.checked_mul(layer.outputs) != Some(layer.weights.len())
                || layer.biases.len() != layer.outputs
            {
                return Err(MlError::ParameterCount);
            }
            if i > 0 && layers[i - 1].outputs != layer.inputs {
                return Err(MlError::LayerMismatch {
                    layer: i,
                    expected: layer.inputs,
                    found: layers[i - 1].outputs,
                });
            }
        }
        Ok(Self { layers })
    }

    /// Decodes an EIDN byte stream
    pub fn parse(bytes: &[u8]) -> MlResult<Self> {
        let mut reader = Reader { bytes, pos: 0 };
        if reader.take(4)? != MAGIC {
            return Err(MlError::BadMagic);
        }
        let version = reader.u16()?;
        if version != FORMAT_VERSION {
            return Err(MlError::UnsupportedVersion(version));
        }
        let count = reader.u16()? as usize;

        let mut layers = Vec::new();
        layers.try_reserve_exact(count).map_err(|_| MlError::NoMemory)?;
        for _ in 0..count {
            let inputs = reader.u16()? as usize;
            let outputs = reader.u16()? as usize;
            let activation = Activation::from_code(reader.u8()?)?;
            let weights = reader.f32s(inputs.checked_mul(outputs).ok_or(reader.overflow())?)?;
            let biases = reader.f32s(outputs)?;
            layers.push(DenseLayer { inputs, outputs, activation, weights, biases });
        }

        let rest = bytes.len() - reader.pos;
        if rest != 0 {
            return Err(MlError::TrailingBytes(rest));
        }
        Self::new(layers)
    }

    /// Encodes the graph as EIDN bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let len = HEADER_LEN + self.layers.iter().map(DenseLayer::encoded_len).sum::<usize>();
        let mut out = Vec::with_capacity(len);
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.layers.len() as u16).to_le_bytes());
        for layer in &self.layers {
            out.extend_from_slice(&(layer.inputs as u16).to_le_bytes());
            out.extend_from_slice(&(layer.outputs as u16).to_le_bytes());
            out.push(layer.activation.code());
            for v in layer.weights.iter().chain(layer.biases.iter()) {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        out
    }

    /// Layers in evaluation order
    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    /// Input width of the first layer
    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.inputs)
    }

    /// Output width of the last layer
    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.outputs)
    }

    /// Widest activation vector, used to size scratch buffers
    pub fn max_width(&self) -> usize {
        self.layers.iter().map(|l| l.inputs.max(l.outputs)).max().unwrap_or(0)
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> MlResult<&'a [u8]> {
        let available = self.bytes.len() - self.pos;
        if n > available {
            return Err(MlError::Truncated { needed: n, available });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    // A declared size past usize can never be satisfied by the input
    fn overflow(&self) -> MlError {
        MlError::Truncated { needed: usize::MAX, available: self.bytes.len() - self.pos }
    }

    fn u8(&mut self) -> MlResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> MlResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn f32s(&mut self, count: usize) -> MlResult<Vec<f32>> {
        let raw = self.take(count.checked_mul(4).ok_or(self.overflow())?)?;
        let mut values = Vec::new();
        values.try_reserve_exact(count).map_err(|_| MlError::NoMemory)?;
        values.extend(raw.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])));
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn two_layer() -> Graph {
        Graph::new(vec![
            DenseLayer {
                inputs: 2,
                outputs: 2,
                activation: Activation::Relu,
                weights: vec![1.0, -1.0, 0.5, 0.5],
                biases: vec![0.0, 1.0],
            },
            DenseLayer {
                inputs: 2,
                outputs: 1,
                activation: Activation::Linear,
                weights: vec![2.0, 1.0],
                biases: vec![-1.0],
            },
        ])
        .unwrap()
    }

    #[test]
    fn encoded_graph_decodes_identically() {
        let graph = two_layer();
        let bytes = graph.to_bytes();
        assert_eq!(&bytes[..4], b"EIDN");
        assert_eq!(bytes.len(), 8 + (5 + 24) + (5 + 12));
        assert_eq!(Graph::parse(&bytes).unwrap(), graph);
    }

    #[test]
    fn header_errors() {
        assert_eq!(Graph::parse(b"NOPE\x01\x00\x00\x00"), Err(MlError::BadMagic));
        assert_eq!(Graph::parse(b"EIDN\x02\x00\x01\x00"), Err(MlError::UnsupportedVersion(2)));
        assert_eq!(
            Graph::parse(b"EID"),
            Err(MlError::Truncated { needed: 4, available: 3 })
        );
        assert_eq!(Graph::parse(b"EIDN\x01\x00\x00\x00"), Err(MlError::EmptyLayer));
    }

    #[test]
    fn truncated_and_trailing_bytes_rejected() {
        let bytes = two_layer().to_bytes();
        assert!(matches!(Graph::parse(&bytes[..bytes.len() - 1]), Err(MlError::Truncated { .. })));

        let mut longer = bytes.clone();
        longer.push(0);
        assert_eq!(Graph::parse(&longer), Err(MlError::TrailingBytes(1)));
    }

    #[test]
    fn unknown_activation_rejected() {
        let mut bytes = two_layer().to_bytes();
        bytes[12] = 9;
        assert_eq!(Graph::parse(&bytes), Err(MlError::UnknownActivation(9)));
    }

    #[test]
    fn layers_must_chain() {
        let mut layers = two_layer().layers().to_vec();
        layers[1].inputs = 3;
        layers[1].weights = vec![0.0; 3];
        assert_eq!(
            Graph::new(layers),
            Err(MlError::LayerMismatch { layer: 1, expected: 3, found: 2 })
        );
    }

    #[test]
    fn oversized_layer_header_is_truncated() {
        let mut bytes = b"EIDN\x01\x00\x01\x00".to_vec();
        bytes.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF, 0]);
        assert!(matches!(Graph::parse(&bytes), Err(MlError::Truncated { .. })));

        let mut reader = Reader { bytes: &bytes, pos: 0 };
        assert_eq!(
            reader.f32s(usize::MAX),
            Err(MlError::Truncated { needed: usize::MAX, available: bytes.len() })
        );
    }

    #[test]
    fn inconsistent_layer_forward_stays_in_bounds() {
        let layer = DenseLayer {
            inputs: 2,
            outputs: 3,
            activation: Activation::Linear,
            weights: vec![1.0, 1.0, 2.0],
            biases: vec![0.5],
        };
        let mut out = [9.0; 3];
        layer.forward(&[1.0, 2.0], &mut out);
        assert_eq!(out, [3.5, 9.0, 9.0]);

        let empty = DenseLayer { inputs: 0, outputs: 1, ..layer.clone() };
        empty.forward(&[], &mut out);
        assert_eq!(out, [3.5, 9.0, 9.0]);
        assert_eq!(Graph::new(vec![layer]), Err(MlError::ParameterCount));
    }

    #[test]
    fn activations() {
        assert_eq!(Activation::Relu.apply(-2.0), 0.0);
        assert_eq!(Activation::Linear.apply(-2.0), -2.0);
        assert!((Activation::Sigmoid.apply(0.0) - 0.5).abs() < 1e-6);
        assert!((Activation::Tanh.apply(1.0) - 0.761_594_2).abs() < 1e-6);
        assert_eq!(Activation::from_code(4), Err(MlError::UnknownActivation(4)));
    }
}
