use crate::error::{AqnheError, Result};

/// One fully connected layer, weights stored row-major with a row per output.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    inputs: usize,
    outputs: usize,
    weights: Vec<f64>,
    biases: Vec<f64>,
}

impl DenseLayer {
    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    fn forward(&self, input: &[f64], output: &mut Vec<f64>) {
        output.clear();
        for (row, bias) in self.weights.chunks_exact(self.inputs).zip(&self.biases) {
            let z: f64 = row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + bias;
            output.push(z.tanh());
        }
    }
}

/// Feed-forward tanh network decoded from a genome's weight vector.
#[derive(Debug, Clone)]
pub struct NeuralNetwork {
    layers: Vec<DenseLayer>,
}

/// Reusable activation buffers so the bar loop does not allocate.
#[derive(Debug, Default)]
pub struct Activations {
    front: Vec<f64>,
    back: Vec<f64>,
}

impl NeuralNetwork {
    /// Reshape a flat weight vector into layers. Per layer pair the vector holds
    /// `outputs * inputs` weights followed by `outputs` biases.
    pub fn from_flat(layer_sizes: &[usize], flat: &[f64]) -> Result<Self> {
        let expected: usize = layer_sizes.windows(2).map(|w| w[0] * w[1] + w[1]).sum();
        if layer_sizes.len() < 2 || flat.len() != expected {
            return Err(AqnheError::InvalidGenomeShape {
                context: "weight vector",
                expected,
                actual: flat.len(),
            });
        }

        let mut layers = Vec::with_capacity(layer_sizes.len() - 1);
        let mut offset = 0;
        for pair in layer_sizes.windows(2) {
            let (inputs, outputs) = (pair[0], pair[1]);
            let weights = flat[offset..offset + inputs * outputs].to_vec();
            offset += inputs * outputs;
            let biases = flat[offset..offset + outputs].to_vec();
            offset += outputs;
            layers.push(DenseLayer {
                inputs,
                outputs,
                weights,
                biases,
            });
        }

        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(|l| l.inputs).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(|l| l.outputs).unwrap_or(0)
    }

    /// Run the network and return its output activations.
    pub fn forward<'a>(&self, input: &[f64], buffers: &'a mut Activations) -> &'a [f64] {
        buffers.front.clear();
        buffers.front.extend_from_slice(input);
        for layer in &self.layers {
            layer.forward(&buffers.front, &mut buffers.back);
            std::mem::swap(&mut buffers.front, &mut buffers.back);
        }
        &buffers.front
    }

    /// Mean of the output activations, a decision signal in [-1, 1].
    pub fn signal(&self, input: &[f64], buffers: &mut Activations) -> f64 {
        let out = self.forward(input, buffers);
        if out.is_empty() {
            return 0.0;
        }
        out.iter().sum::<f64>() / out.len() as f64
    }
}
