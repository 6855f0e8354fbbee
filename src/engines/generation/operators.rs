use crate::engines::fitness::compare_scores;
use rand::seq::index;
use rand::Rng;
use rand_distr::StandardNormal;
use std::cmp::Ordering;

/// Smallest magnitude used to scale weight mutation noise, so zero weights can move.
pub const MIN_WEIGHT_SCALE: f64 = 0.01;

/// Tournament selection: index of the best of `tournament_size` random draws.
///
/// Draws are with replacement. NaN scores lose to everything, including -inf.
pub fn tournament_selection<R: Rng>(scores: &[f64], tournament_size: usize, rng: &mut R) -> usize {
    let mut best = rng.gen_range(0..scores.len());
    for _ in 1..tournament_size.max(1) {
        let idx = rng.gen_range(0..scores.len());
        if compare_scores(scores[idx], scores[best]) == Ordering::Greater {
            best = idx;
        }
    }
    best
}

/// Interference crossover on amplitude vectors.
///
/// Each child gene is a convex blend of the parents' genes. For child one the
/// blend leans towards the fitter parent with weight `0.5 + 0.5u`, `u` drawn
/// per gene; child two takes the mirrored blend. Equal fitness uses `u` itself.
pub fn interference_crossover<R: Rng>(
    a: &[f64],
    b: &[f64],
    fitness_a: f64,
    fitness_b: f64,
    rng: &mut R,
) -> (Vec<f64>, Vec<f64>) {
    let order = compare_scores(fitness_a, fitness_b);
    let mut child1 = Vec::with_capacity(a.len());
    let mut child2 = Vec::with_capacity(a.len());

    for (&x, &y) in a.iter().zip(b) {
        let u: f64 = rng.gen();
        let w = match order {
            Ordering::Greater => 0.5 + 0.5 * u,
            Ordering::Less => 0.5 - 0.5 * u,
            Ordering::Equal => u,
        };
        child1.push((w * x + (1.0 - w) * y).clamp(0.0, 1.0));
        child2.push(((1.0 - w) * x + w * y).clamp(0.0, 1.0));
    }

    (child1, child2)
}

/// k-point crossover: swap the segments between `points` distinct cut points.
pub fn k_point_crossover<R: Rng>(
    a: &[f64],
    b: &[f64],
    points: usize,
    rng: &mut R,
) -> (Vec<f64>, Vec<f64>) {
    let len = a.len().min(b.len());
    if len <= 1 || points == 0 {
        return (a.to_vec(), b.to_vec());
    }

    let mut cuts: Vec<usize> = index::sample(rng, len - 1, points.min(len - 1))
        .into_iter()
        .map(|i| i + 1)
        .collect();
    cuts.sort_unstable();

    let mut child1 = a.to_vec();
    let mut child2 = b.to_vec();
    let mut swapped = false;
    let mut cut_iter = cuts.into_iter().peekable();

    for i in 0..len {
        while cut_iter.peek() == Some(&i) {
            swapped = !swapped;
            cut_iter.next();
        }
        if swapped {
            child1[i] = b[i];
            child2[i] = a[i];
        }
    }

    (child1, child2)
}

/// Gaussian amplitude mutation. Noise is `N(0, sigma)` clipped to three
/// standard deviations; the result is clamped back into [0, 1].
pub fn mutate_amplitudes<R: Rng>(amplitudes: &mut [f64], mutation_rate: f64, sigma: f64, rng: &mut R) {
    for amplitude in amplitudes.iter_mut() {
        if rng.gen::<f64>() < mutation_rate {
            let z: f64 = rng.sample(StandardNormal);
            let noise = (z * sigma).clamp(-3.0 * sigma, 3.0 * sigma);
            *amplitude = (*amplitude + noise).clamp(0.0, 1.0);
        }
    }
}

/// Gaussian weight mutation scaled by each weight's own magnitude.
pub fn mutate_weights<R: Rng>(weights: &mut [f64], mutation_rate: f64, sigma_fraction: f64, rng: &mut R) {
    for weight in weights.iter_mut() {
        if rng.gen::<f64>() < mutation_rate {
            let z: f64 = rng.sample(StandardNormal);
            *weight += z * sigma_fraction * weight.abs().max(MIN_WEIGHT_SCALE);
        }
    }
}
