use crate::foundation::error::{ShortsError, ShortsResult};

/// Smallest factor the tempo filter accepts in a single application.
pub const MIN_FILTER_FACTOR: f64 = 0.5;
/// Largest factor the tempo filter accepts in a single application.
pub const MAX_FILTER_FACTOR: f64 = 100.0;

/// Decomposition of one playback-rate multiplier into a chain of rate-limited filter
/// applications whose product equals the target.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpeedPlan {
    /// `ceiling / actual_duration`.
    pub target_factor: f64,
    /// Applied in order, each as an independent filter invocation.
    pub applications: Vec<f64>,
}

impl SpeedPlan {
    /// Product of all applications.
    pub fn product(&self) -> f64 {
        self.applications.iter().product()
    }

    /// Playback-rate multipliers for the tempo filter, one per application.
    ///
    /// Applications are duration factors; `atempo` takes the reciprocal, so a 0.75 duration
    /// factor plays at 1.333x.
    pub fn tempo_rates(&self) -> Vec<f64> {
        self.applications.iter().map(|f| 1.0 / f).collect()
    }

    /// `atempo=<rate>,atempo=<rate>,...` for an ffmpeg `-filter:a` argument.
    pub fn filter_chain(&self) -> String {
        self.tempo_rates()
            .iter()
            .map(|rate| format!("atempo={rate}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn check_ranges(&self) -> ShortsResult<()> {
        for &factor in &self.applications {
            if !(MIN_FILTER_FACTOR..=MAX_FILTER_FACTOR).contains(&factor) {
                return Err(ShortsError::SpeedFactorOutOfRange { factor });
            }
        }
        Ok(())
    }
}

/// Plan the tempo change needed to bring `actual_duration` under `ceiling`.
///
/// Returns `Ok(None)` when no change is needed. A factor below the single-application floor
/// is split into `n = ceil(ln(target) / ln(0.5))` equal applications of `target^(1/n)`.
pub fn plan(actual_duration: f64, ceiling: f64) -> ShortsResult<Option<SpeedPlan>> {
    if !actual_duration.is_finite() || actual_duration <= 0.0 {
        return Err(ShortsError::validation(
            "actual duration must be finite and > 0",
        ));
    }
    if !ceiling.is_finite() || ceiling <= 0.0 {
        return Err(ShortsError::validation("duration ceiling must be finite and > 0"));
    }
    if actual_duration <= ceiling {
        return Ok(None);
    }

    let target_factor = ceiling / actual_duration;
    let applications = if target_factor >= MIN_FILTER_FACTOR {
        vec![target_factor]
    } else {
        let mut n = (target_factor.ln() / MIN_FILTER_FACTOR.ln()).ceil().max(1.0) as usize;
        let mut per_application = target_factor.powf(1.0 / n as f64);
        // Exact powers of 0.5 can round to a hair under the floor.
        if per_application < MIN_FILTER_FACTOR {
            n += 1;
            per_application = target_factor.powf(1.0 / n as f64);
        }
        vec![per_application; n]
    };

    let plan = SpeedPlan {
        target_factor,
        applications,
    };
    plan.check_ranges()?;
    tracing::debug!(
        target_factor,
        applications = plan.applications.len(),
        "planned narration tempo change"
    );
    Ok(Some(plan))
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/speed.rs"]
mod tests;
