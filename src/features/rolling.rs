//! Rolling-window smoothing over time-ordered values

/// Moving average over a full window ending at each position
///
/// Positions before the first full window are `None`.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Fill gaps: back-fill from the next known value, then forward-fill the tail
///
/// Row count is preserved. Returns `None` only when no value is known at all.
pub fn fill_gaps(values: &[Option<f64>]) -> Option<Vec<f64>> {
    let mut filled: Vec<Option<f64>> = values.to_vec();

    let mut next: Option<f64> = None;
    for slot in filled.iter_mut().rev() {
        match *slot {
            Some(v) => next = Some(v),
            None => *slot = next,
        }
    }

    let mut prev: Option<f64> = None;
    for slot in filled.iter_mut() {
        match *slot {
            Some(v) => prev = Some(v),
            None => *slot = prev,
        }
    }

    filled.into_iter().collect()
}

/// Mean of the `window` values strictly before each position
///
/// Positions without a full preceding window are `None`.
pub fn trailing_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    for i in window..values.len() {
        let sum: f64 = values[i - window..i].iter().sum();
        out[i] = Some(sum / window as f64);
    }
    out
}
