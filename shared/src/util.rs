use rand::Rng;

/// Kernel support extends this many standard deviations from the centre.
pub const GAUSSIAN_TRUNCATE: f32 = 4.0;

/// Normalised 1-D Gaussian kernel of length `2r + 1` with
/// `r = floor(GAUSSIAN_TRUNCATE * sigma + 0.5)`.
/// A non-positive sigma gives the identity kernel `[1.0]`.
pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    if !(sigma > 0.0) {
        return vec![1.0];
    }
    let radius = (GAUSSIAN_TRUNCATE * sigma + 0.5) as i32;
    let inv_two_var = 1.0 / (2.0 * sigma * sigma);
    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|x| (-((x * x) as f32) * inv_two_var).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Index into `0..n` with half-sample symmetric reflection at both ends
/// (`d c b a | a b c d | d c b a`).
#[inline(always)]
pub fn reflect_index(i: i64, n: usize) -> usize {
    let n = n as i64;
    let m = i.rem_euclid(2 * n);
    (if m >= n { 2 * n - 1 - m } else { m }) as usize
}

/// Normal sample via the Box-Muller transform.
pub fn sample_normal<R: Rng + ?Sized>(rng: &mut R, mean: f32, std_dev: f32) -> f32 {
    let u1: f32 = rng.random::<f32>().max(f32::EPSILON);
    let u2: f32 = rng.random::<f32>();
    let z = (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos();
    mean + z * std_dev
}
