/// Simple Moving Average (SMA)
/// Returns a vector aligned with `values`:
/// - `None` until enough values exist
/// - `Some(avg)` after `window` values
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    // Running sum; subtract the value that falls out of the window.
    values
        .iter()
        .enumerate()
        .scan(0.0_f64, move |sum, (i, &v)| {
            *sum += v;
            if i >= window {
                *sum -= values[i - window];
            }

            let out = if i + 1 >= window {
                Some(*sum / window as f64)
            } else {
                None
            };

            Some(out)
        })
        .collect()
}

/// Exponentially weighted mean with span `span`.
///
/// Uses the bias-adjusted form: every past value is weighted by
/// `(1 - alpha)^age` and the weights are normalised, with
/// `alpha = 2 / (span + 1)`. Defined from the very first value, so there is
/// no warm-up period.
pub fn ewm(values: &[f64], span: usize) -> Vec<f64> {
    if span == 0 {
        return values.to_vec();
    }

    let decay = 1.0 - 2.0 / (span as f64 + 1.0);

    values
        .iter()
        .scan((0.0_f64, 0.0_f64), move |(num, den), &v| {
            *num = v + decay * *num;
            *den = 1.0 + decay * *den;
            Some(*num / *den)
        })
        .collect()
}

/// Linear regression trend line for y-values using x = 0..n-1
/// Returns (slope m, intercept b) for y = m*x + b
pub fn regression_trend(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    if n == 1 {
        return (0.0, values[0]);
    }

    let n_f = n as f64;

    let (sum_x, sum_y, sum_xy, sum_x2) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0, 0.0, 0.0), |(sx, sy, sxy, sx2), (i, &y)| {
            let x = i as f64;
            (sx + x, sy + y, sxy + x * y, sx2 + x * x)
        });

    let denom = n_f * sum_x2 - sum_x * sum_x;
    if denom == 0.0 {
        return (0.0, sum_y / n_f);
    }

    let m = (n_f * sum_xy - sum_x * sum_y) / denom;
    let b = (sum_y - m * sum_x) / n_f;

    (m, b)
}

/// Relative Strength Index (RSI)
///
/// Average gain and average loss are plain rolling means of the last
/// `period` price changes. The average loss is floored at `loss_floor` so a
/// window without any down move still yields a finite RSI close to 100.
///
/// Returns `None` for the first `period` values.
pub fn rsi(prices: &[f64], period: usize, loss_floor: f64) -> Vec<Option<f64>> {
    let mut result = vec![None; prices.len()];
    if period == 0 || prices.len() <= period {
        return result;
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let gains: Vec<f64> = changes.iter().map(|&c| c.max(0.0)).collect();
    let losses: Vec<f64> = changes.iter().map(|&c| (-c).max(0.0)).collect();

    let avg_gains = sma(&gains, period);
    let avg_losses = sma(&losses, period);

    // change i sits between price i and price i + 1
    for (i, (gain, loss)) in avg_gains.iter().zip(avg_losses.iter()).enumerate() {
        if let (Some(gain), Some(loss)) = (gain, loss) {
            let rs = gain / loss.max(loss_floor);
            result[i + 1] = Some(100.0 - 100.0 / (1.0 + rs));
        }
    }

    result
}

/// Moving Average Convergence Divergence (MACD)
///
/// - MACD line: fast EWM - slow EWM
/// - Signal line: EWM of the MACD line over `signal_period`
///
/// Both lines are defined from the first price.
/// Returns: (macd_line, signal_line)
pub fn macd(
    prices: &[f64],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> (Vec<f64>, Vec<f64>) {
    let fast = ewm(prices, fast_period);
    let slow = ewm(prices, slow_period);

    let macd_line: Vec<f64> = fast.iter().zip(slow.iter()).map(|(f, s)| f - s).collect();
    let signal_line = ewm(&macd_line, signal_period);

    (macd_line, signal_line)
}

/// Rolling sample standard deviation (n - 1 denominator).
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window < 2 {
        return vec![None; values.len()];
    }

    let means = sma(values, window);

    means
        .iter()
        .enumerate()
        .map(|(i, mean)| {
            mean.map(|mean| {
                let slice = &values[i + 1 - window..=i];
                let variance = slice.iter().map(|&x| (x - mean).powi(2)).sum::<f64>()
                    / (window - 1) as f64;
                variance.sqrt()
            })
        })
        .collect()
}

/// Fractional change over `periods` steps: (x[t] - x[t-k]) / x[t-k].
pub fn pct_change(values: &[f64], periods: usize) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if periods == 0 || i < periods {
                return None;
            }
            let base = values[i - periods];
            Some((v - base) / base)
        })
        .collect()
}

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
