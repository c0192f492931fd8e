//! Sample-rate conversion using rubato.
//!
//! Converts mono audio from whatever rate a backend produced to the target
//! artifact rate.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

/// Resamples mono audio from `input_rate` to `output_rate`.
///
/// The whole input is processed as a single chunk, which suits short
/// spoken lines. Returns a copy when the rates already match.
pub fn resample_mono(input: &[f32], input_rate: u32, output_rate: u32) -> Result<Vec<f32>, String> {
    if input_rate == output_rate || input.is_empty() {
        return Ok(input.to_vec());
    }
    if input_rate == 0 {
        return Err("input sample rate is zero".to_string());
    }

    debug!(
        "Resampling {} frames from {}Hz to {}Hz",
        input.len(),
        input_rate,
        output_rate
    );

    let mut resampler = FastFixedIn::<f32>::new(
        output_rate as f64 / input_rate as f64,
        1.0,
        PolynomialDegree::Septic,
        input.len(),
        1,
    )
    .map_err(|e| format!("Failed to create resampler: {}", e))?;

    let mut output = resampler
        .process(&[input], None)
        .map_err(|e| format!("Resampling failed: {}", e))?;

    Ok(output.pop().unwrap_or_default())
}
