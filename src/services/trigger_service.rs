use crate::config::RebalancePolicy;
use crate::models::{PortfolioAnalytics, RebalanceCheck, Severity};

/// Evaluate the rebalance policy against an analytics snapshot.
///
/// Each rule fires independently, appends a human-readable trigger, and
/// contributes `min(100, (actual - threshold) / threshold * 100)` to the
/// severity score; the sum is clipped to [0, 100]. Deterministic, no I/O.
pub fn check_rebalance(analytics: &PortfolioAnalytics, policy: &RebalancePolicy) -> RebalanceCheck {
    let mut triggers = Vec::new();
    let mut score = 0.0;

    // Rule 1: single-holding concentration. Small portfolios cannot avoid
    // heavy per-holding weights, so the effective ceiling never drops below
    // the equal-weight share plus the drift tolerance.
    let n = analytics.holding_weights.len();
    let equal_weight_floor = if n > 0 {
        100.0 / n as f64 + policy.drift_tolerance_pct
    } else {
        0.0
    };
    let holding_ceiling = policy.max_holding_weight_pct.max(equal_weight_floor);

    for (ticker, weight) in &analytics.holding_weights {
        if *weight > holding_ceiling {
            triggers.push(format!(
                "Holding {} at {:.1}% of portfolio exceeds the {:.1}% concentration limit",
                ticker, weight, holding_ceiling
            ));
            score += rule_magnitude(*weight, holding_ceiling);
        }
    }

    // Rule 2: sector concentration.
    for (sector, weight) in &analytics.diversification.sector_distribution {
        if *weight > policy.max_sector_weight_pct {
            triggers.push(format!(
                "Sector {} at {:.1}% of portfolio exceeds the {:.1}% sector limit",
                sector, weight, policy.max_sector_weight_pct
            ));
            score += rule_magnitude(*weight, policy.max_sector_weight_pct);
        }
    }

    // Rule 3: drift from the target allocation, when one is configured.
    if let Some(targets) = &policy.target_allocation {
        let mut drifted: Vec<(&String, f64, f64)> = Vec::new();
        for (ticker, target) in targets {
            let current = analytics.holding_weights.get(ticker).copied().unwrap_or(0.0);
            let deviation = (current - target).abs();
            if deviation > policy.drift_tolerance_pct {
                drifted.push((ticker, current, deviation));
            }
        }
        drifted.sort_by(|a, b| a.0.cmp(b.0));
        for (ticker, current, deviation) in drifted {
            triggers.push(format!(
                "Holding {} drifted {:.1}pp from target (now {:.1}%), tolerance is {:.1}pp",
                ticker, deviation, current, policy.drift_tolerance_pct
            ));
            score += rule_magnitude(deviation, policy.drift_tolerance_pct);
        }
    }

    // Rule 4: volatility ceiling. Skipped when history is too short.
    if let Some(volatility) = analytics.risk.volatility {
        let vol_pct = volatility * 100.0;
        if vol_pct > policy.volatility_ceiling_pct {
            triggers.push(format!(
                "Annualized volatility {:.1}% exceeds the {:.1}% ceiling",
                vol_pct, policy.volatility_ceiling_pct
            ));
            score += rule_magnitude(vol_pct, policy.volatility_ceiling_pct);
        }
    }

    let severity_score = score.clamp(0.0, 100.0);
    let severity = Severity::from_score(severity_score);

    RebalanceCheck {
        needs_rebalancing: severity != Severity::None,
        triggers,
        severity,
        severity_score,
    }
}

fn rule_magnitude(actual: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 {
        return 0.0;
    }
    ((actual - threshold) / threshold * 100.0).min(100.0)
}
