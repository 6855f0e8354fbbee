use aqnhe::engines::generation::{Genome, GenomeCodec, GenomeId, GenomeShape};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn codec() -> GenomeCodec {
    GenomeCodec::new(GenomeShape::new(10, vec![4, 2, 1]))
}

fn genome_with(amplitudes: Vec<f64>) -> Genome {
    let shape = codec().shape().clone();
    let weights = vec![0.1; shape.weight_count()];
    Genome::new(GenomeId(1), amplitudes, weights, vec![], &shape).unwrap()
}

#[test]
fn test_collapse_frequency_tracks_amplitude() {
    let codec = codec();
    let genome = genome_with(vec![0.8; 10]);
    let mut rng = StdRng::seed_from_u64(2024);

    let trials = 20_000;
    let mut ones = 0usize;
    for _ in 0..trials {
        let collapsed = codec.collapse(&genome, &mut rng).unwrap();
        ones += collapsed.bits.iter().filter(|b| **b).count();
    }

    let frequency = ones as f64 / (trials * 10) as f64;
    assert!((frequency - 0.8).abs() < 0.01, "observed {}", frequency);
}

#[test]
fn test_certain_amplitudes_collapse_deterministically() {
    let codec = codec();
    let mut amplitudes = vec![0.0; 10];
    amplitudes[0] = 1.0;
    let genome = genome_with(amplitudes);
    let mut rng = StdRng::seed_from_u64(1);

    for _ in 0..100 {
        let bits = codec.collapse(&genome, &mut rng).unwrap().bits;
        assert!(bits[0]);
        assert!(bits[1..].iter().all(|b| !b));
    }
}

#[test]
fn test_parameters_always_within_bounds() {
    let codec = codec();
    let mut rng = StdRng::seed_from_u64(77);
    for i in 0..200 {
        let genome = codec.initialize_random(GenomeId(i), &mut rng).unwrap();
        let params = codec.collapse(&genome, &mut rng).unwrap().strategy;
        assert!((5..=50).contains(&params.lookback));
        assert!((0.05..=0.5).contains(&params.entry_threshold));
        assert!((0.1..=1.0).contains(&params.position_scale));
    }
}

#[test]
fn test_extreme_bitstrings_hit_range_ends() {
    let codec = codec();
    let low = codec.decode_bits(&[false; 10]);
    let high = codec.decode_bits(&[true; 10]);

    assert_eq!(low.lookback, 5);
    assert_eq!(high.lookback, 50);
    assert!((low.entry_threshold - 0.05).abs() < 1e-12);
    assert!((high.entry_threshold - 0.5).abs() < 1e-12);
    assert!((low.position_scale - 0.1).abs() < 1e-12);
    assert!((high.position_scale - 1.0).abs() < 1e-12);
}

#[test]
fn test_network_shape_follows_layers() {
    let codec = codec();
    let genome = genome_with(vec![0.5; 10]);
    let collapsed = codec.most_likely(&genome).unwrap();
    assert_eq!(collapsed.network.input_size(), 4);
    assert_eq!(collapsed.network.output_size(), 1);
    assert!(collapsed.bits.iter().all(|b| *b));
}

#[test]
fn test_same_seed_same_collapse() {
    let codec = codec();
    let genome = genome_with(vec![0.5; 10]);
    let a = codec.collapse(&genome, &mut StdRng::seed_from_u64(5)).unwrap();
    let b = codec.collapse(&genome, &mut StdRng::seed_from_u64(5)).unwrap();
    assert_eq!(a.bits, b.bits);
    assert_eq!(a.strategy, b.strategy);
}
