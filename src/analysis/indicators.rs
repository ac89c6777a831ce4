//! Indicator recurrences. All series are ascending by date and output
//! vectors have the same length as their input.

/// 简单移动平均的最新值；历史不足时返回 None
pub fn sma_latest(data: &[f64], window: usize) -> Option<f64> {
    if window == 0 || data.len() < window {
        return None;
    }
    let tail = &data[data.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// EMA seeded with the first observation (span convention, alpha = 2/(n+1)).
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period.max(1) as f64 + 1.0);
    smooth(data, alpha)
}

/// 通达信 SMA(X, N, M)：alpha = M/N
pub fn wilder_sma(data: &[f64], n: usize, m: usize) -> Vec<f64> {
    let alpha = m as f64 / n.max(1) as f64;
    smooth(data, alpha)
}

fn smooth(data: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(data.len());
    for (i, &x) in data.iter().enumerate() {
        if i == 0 {
            out.push(x);
        } else {
            let prev = out[i - 1];
            out.push(alpha * x + (1.0 - alpha) * prev);
        }
    }
    out
}

pub struct Macd {
    pub dif: Vec<f64>,
    pub dea: Vec<f64>,
    /// (DIF - DEA) * 2
    pub histogram: Vec<f64>,
}

pub fn macd(close: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let fast_ema = ema(close, fast);
    let slow_ema = ema(close, slow);
    let dif: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let dea = ema(&dif, signal);
    let histogram = dif.iter().zip(&dea).map(|(d, e)| (d - e) * 2.0).collect();
    Macd { dif, dea, histogram }
}

pub struct Kdj {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
    pub j: Vec<f64>,
}

/// KDJ(n, m1, m2)。窗口内最高价等于最低价时 RSV 取 50
pub fn kdj(close: &[f64], high: &[f64], low: &[f64], n: usize, m1: usize, m2: usize) -> Kdj {
    let len = close.len().min(high.len()).min(low.len());
    let mut rsv = Vec::with_capacity(len);
    for i in 0..len {
        let start = (i + 1).saturating_sub(n.max(1));
        let hh = high[start..=i].iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let ll = low[start..=i].iter().copied().fold(f64::INFINITY, f64::min);
        let range = hh - ll;
        rsv.push(if range.abs() < f64::EPSILON {
            50.0
        } else {
            (close[i] - ll) / range * 100.0
        });
    }

    let k = ema(&rsv, m1 * 2 - 1);
    let d = ema(&k, m2 * 2 - 1);
    let j = k.iter().zip(&d).map(|(k, d)| 3.0 * k - 2.0 * d).collect();
    Kdj { k, d, j }
}

/// RSI = SMA(MAX(Δ,0), n, 1) / SMA(|Δ|, n, 1) * 100；首个值无涨跌，记为 50
pub fn rsi(close: &[f64], n: usize) -> Vec<f64> {
    if close.len() < 2 {
        return vec![50.0; close.len()];
    }
    let diffs: Vec<f64> = close.windows(2).map(|w| w[1] - w[0]).collect();
    let gains: Vec<f64> = diffs.iter().map(|d| d.max(0.0)).collect();
    let moves: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let avg_gain = wilder_sma(&gains, n, 1);
    let avg_move = wilder_sma(&moves, n, 1);

    let mut out = Vec::with_capacity(close.len());
    out.push(50.0);
    for (g, m) in avg_gain.iter().zip(&avg_move) {
        out.push(if *m <= f64::EPSILON { 50.0 } else { g / m * 100.0 });
    }
    out
}
