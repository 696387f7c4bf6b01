/// Numerically stable softmax: `exp(x - max(x)) / sum(exp(x - max(x)))`.
///
/// Non-finite logits get probability zero. If no logit is finite the result is uniform.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max_logit = logits
        .iter()
        .copied()
        .filter(|x| x.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);

    if !max_logit.is_finite() {
        let uniform = 1.0 / logits.len() as f64;
        return vec![uniform; logits.len()];
    }

    let exp_values: Vec<f64> = logits
        .iter()
        .map(|&x| {
            if x.is_finite() {
                (x - max_logit).exp()
            } else {
                0.0
            }
        })
        .collect();
    let sum: f64 = exp_values.iter().sum();

    exp_values.into_iter().map(|value| value / sum).collect()
}

/// Softmax of `values * beta`; larger `beta` concentrates mass on the argmax.
pub fn softmax_with_temperature(values: &[f64], beta: f64) -> Vec<f64> {
    let scaled: Vec<f64> = values.iter().map(|value| value * beta).collect();
    softmax(&scaled)
}
