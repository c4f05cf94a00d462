//! Per-session waveform reduction.
//!
//! A raw session waveform is a time-ordered sequence of (pressure, time)
//! pairs. Each pressure is quantized to an integer bin and counted, but
//! only when the sample lands at least one refractory interval after the
//! last accepted sample; the rest of the beat is blanked. The histogram is
//! then collapsed to one representative pressure per session.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};

/// Default refractory interval between accepted samples, in the waveform's
/// time units.
pub const DEFAULT_REFRACTORY: f64 = 0.1;

/// Pressure quantization mode.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuantizeMode {
    /// Round half to even (22.5 and 21.5 both land on 22).
    Round,
    /// Truncate toward zero.
    Floor,
}

impl QuantizeMode {
    fn quantize(&self, pressure: f64) -> i64 {
        match self {
            Self::Round => pressure.round_ties_even() as i64,
            Self::Floor => pressure.trunc() as i64,
        }
    }
}

impl FromStr for QuantizeMode {
    type Err = MonitorError;

    fn from_str(s: &str) -> MonitorResult<Self> {
        match s {
            "round" => Ok(Self::Round),
            "floor" => Ok(Self::Floor),
            other => Err(MonitorError::InvalidQuantizeMode(other.to_string())),
        }
    }
}

/// Bin quantized pressures with refractory blanking.
///
/// The histogram is sized by the quantized maximum pressure across the
/// whole waveform (blanked samples included); quantized indices outside
/// `[0, len)` are skipped. The first sample is always accepted, after that
/// a sample counts only when `time - last_accepted_time >= refractory`.
/// An empty waveform yields an empty histogram.
pub fn bin_pressures(
    waveform: &[(f64, f64)],
    refractory: f64,
    mode: QuantizeMode,
) -> MonitorResult<Vec<u32>> {
    if waveform.is_empty() {
        return Ok(Vec::new());
    }
    for &(pressure, time) in waveform {
        if !pressure.is_finite() {
            return Err(MonitorError::NonFiniteSample { value: pressure });
        }
        if !time.is_finite() {
            return Err(MonitorError::NonFiniteSample { value: time });
        }
    }

    let max_pressure = waveform
        .iter()
        .map(|&(p, _)| p)
        .fold(f64::NEG_INFINITY, f64::max);
    let len = usize::try_from(mode.quantize(max_pressure) + 1).unwrap_or(0);

    let mut bins = vec![0u32; len];
    let mut last_accepted: Option<f64> = None;

    for &(pressure, time) in waveform {
        let accept = match last_accepted {
            None => true,
            Some(last) => time - last >= refractory,
        };
        if accept {
            let idx = mode.quantize(pressure);
            if idx >= 0 && (idx as usize) < len {
                bins[idx as usize] += 1;
            }
            last_accepted = Some(time);
        }
    }

    Ok(bins)
}

/// Collapse a histogram to one representative pressure.
///
/// The representative is the median of the bin indices whose count equals
/// the modal non-zero count value; when several count values are equally
/// frequent, the numerically highest one is the mode. Returns `None` when
/// no bin is non-zero.
pub fn representative_pressure(bins: &[u32]) -> Option<f64> {
    let mut count_freq: HashMap<u32, usize> = HashMap::new();
    for &count in bins.iter().filter(|&&c| c > 0) {
        *count_freq.entry(count).or_insert(0) += 1;
    }
    if count_freq.is_empty() {
        return None;
    }

    let max_freq = *count_freq.values().max()?;
    let modal_count = count_freq
        .iter()
        .filter(|&(_, &freq)| freq == max_freq)
        .map(|(&count, _)| count)
        .max()?;

    let indices: Vec<usize> = bins
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count == modal_count)
        .map(|(i, _)| i)
        .collect();

    let n = indices.len();
    let median = if n % 2 == 0 {
        (indices[n / 2 - 1] + indices[n / 2]) as f64 / 2.0
    } else {
        indices[n / 2] as f64
    };
    Some(median)
}

/// Reduce a session waveform to its nullable representative pressure.
pub fn reduce_session(
    waveform: &[(f64, f64)],
    refractory: f64,
    mode: QuantizeMode,
) -> MonitorResult<Option<f64>> {
    let bins = bin_pressures(waveform, refractory, mode)?;
    Ok(representative_pressure(&bins))
}
