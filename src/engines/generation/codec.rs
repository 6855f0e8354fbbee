use crate::engines::evaluation::network::NeuralNetwork;
use crate::engines::generation::genome::{Genome, GenomeId, GenomeShape};
use crate::error::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const MIN_LOOKBACK: usize = 5;
pub const MAX_LOOKBACK: usize = 50;
pub const MIN_ENTRY_THRESHOLD: f64 = 0.05;
pub const MAX_ENTRY_THRESHOLD: f64 = 0.5;
pub const MIN_POSITION_SCALE: f64 = 0.1;
pub const MAX_POSITION_SCALE: f64 = 1.0;

/// Indicator and sizing parameters decoded from a collapsed bitstring.
///
/// The bitstring is cut into three contiguous fields whose widths differ by at
/// most one bit (earlier fields take the remainder). Each field is read
/// most-significant bit first as an unsigned integer `v` of width `n`,
/// normalised to `x = v / (2^n - 1)`, then mapped linearly:
///
/// | field | parameter         | range        |
/// |-------|-------------------|--------------|
/// | 0     | `lookback`        | 5..=50 bars  |
/// | 1     | `entry_threshold` | 0.05..=0.5   |
/// | 2     | `position_scale`  | 0.1..=1.0    |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParameters {
    /// Window of the rolling volatility used to normalise return features.
    pub lookback: usize,
    /// Signal magnitude the network must exceed before a position is held.
    pub entry_threshold: f64,
    /// Fraction of `max_position_size` committed at full conviction.
    pub position_scale: f64,
}

/// Concrete parameters produced by measuring a genome once.
#[derive(Debug, Clone)]
pub struct CollapsedParameters {
    pub genome_id: GenomeId,
    pub bits: Vec<bool>,
    pub strategy: StrategyParameters,
    pub network: NeuralNetwork,
}

/// Encodes, creates and collapses genomes of a fixed shape.
///
/// The codec holds no randomness of its own; every stochastic operation takes
/// the caller's generator so runs replay exactly from a seed.
#[derive(Debug, Clone)]
pub struct GenomeCodec {
    shape: GenomeShape,
}

impl GenomeCodec {
    pub fn new(shape: GenomeShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> &GenomeShape {
        &self.shape
    }

    /// Amplitudes uniform in [0, 1], weights uniform in [-1, 1].
    pub fn initialize_random<R: Rng>(&self, id: GenomeId, rng: &mut R) -> Result<Genome> {
        let amplitudes = (0..self.shape.quantum_bits)
            .map(|_| rng.gen_range(0.0..=1.0))
            .collect();
        let weights = (0..self.shape.weight_count())
            .map(|_| rng.gen_range(-1.0..=1.0))
            .collect();
        Genome::new(id, amplitudes, weights, Vec::new(), &self.shape)
    }

    /// Measure every amplitude: bit `i` is 1 when a uniform draw falls below
    /// `amplitude[i]`. Repeated collapses of one genome may differ.
    pub fn collapse<R: Rng>(&self, genome: &Genome, rng: &mut R) -> Result<CollapsedParameters> {
        self.shape.check(genome)?;
        let bits: Vec<bool> = genome
            .amplitudes()
            .iter()
            .map(|&a| rng.gen::<f64>() < a)
            .collect();
        self.build(genome, bits)
    }

    /// Deterministic collapse to each bit's more probable state.
    pub fn most_likely(&self, genome: &Genome) -> Result<CollapsedParameters> {
        self.shape.check(genome)?;
        let bits = genome.amplitudes().iter().map(|&a| a >= 0.5).collect();
        self.build(genome, bits)
    }

    pub fn decode_bits(&self, bits: &[bool]) -> StrategyParameters {
        let fields = split_fields(bits, 3);
        let lookback_span = (MAX_LOOKBACK - MIN_LOOKBACK) as f64;
        StrategyParameters {
            lookback: MIN_LOOKBACK + (field_fraction(fields[0]) * lookback_span).round() as usize,
            entry_threshold: lerp(MIN_ENTRY_THRESHOLD, MAX_ENTRY_THRESHOLD, field_fraction(fields[1])),
            position_scale: lerp(MIN_POSITION_SCALE, MAX_POSITION_SCALE, field_fraction(fields[2])),
        }
    }

    fn build(&self, genome: &Genome, bits: Vec<bool>) -> Result<CollapsedParameters> {
        let strategy = self.decode_bits(&bits);
        let network = NeuralNetwork::from_flat(&self.shape.layer_sizes, genome.weights())?;
        Ok(CollapsedParameters {
            genome_id: genome.id(),
            bits,
            strategy,
            network,
        })
    }
}

fn split_fields(bits: &[bool], count: usize) -> Vec<&[bool]> {
    let base = bits.len() / count;
    let remainder = bits.len() % count;
    let mut fields = Vec::with_capacity(count);
    let mut start = 0;
    for i in 0..count {
        let width = base + usize::from(i < remainder);
        fields.push(&bits[start..start + width]);
        start += width;
    }
    fields
}

/// Field value scaled to [0, 1]; an empty field sits at the midpoint.
fn field_fraction(field: &[bool]) -> f64 {
    if field.is_empty() {
        return 0.5;
    }
    let value = field.iter().fold(0u64, |acc, &b| (acc << 1) | u64::from(b));
    let max = if field.len() >= 64 {
        u64::MAX
    } else {
        (1u64 << field.len()) - 1
    };
    value as f64 / max as f64
}

fn lerp(lo: f64, hi: f64, x: f64) -> f64 {
    lo + (hi - lo) * x
}
