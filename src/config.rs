use std::collections::HashMap;

/// Thresholds that decide when a portfolio needs rebalancing.
///
/// All weights are percentages of total portfolio value.
#[derive(Debug, Clone)]
pub struct RebalancePolicy {
    /// Maximum weight a single holding may reach before triggering.
    pub max_holding_weight_pct: f64,
    /// Maximum weight a single sector may reach before triggering.
    pub max_sector_weight_pct: f64,
    /// Allowed deviation (percentage points) from a target allocation.
    pub drift_tolerance_pct: f64,
    /// Annualized volatility ceiling, in percent (35.0 = 35%).
    pub volatility_ceiling_pct: f64,
    /// Optional target allocation (ticker -> weight %). Drift detection is
    /// skipped when absent.
    pub target_allocation: Option<HashMap<String, f64>>,
}

impl Default for RebalancePolicy {
    fn default() -> Self {
        Self {
            max_holding_weight_pct: 25.0,
            max_sector_weight_pct: 40.0,
            drift_tolerance_pct: 5.0,
            volatility_ceiling_pct: 35.0,
            target_allocation: None,
        }
    }
}

/// Blending weights for candidate scoring. Must sum to 1.
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub ai: f64,
    pub momentum: f64,
    pub diversification: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            ai: 0.5,
            momentum: 0.3,
            diversification: 0.2,
        }
    }
}

/// Knobs for the proposal generator.
#[derive(Debug, Clone, Copy)]
pub struct ProposalConfig {
    /// Per-ticker target weight ceiling, in percent.
    pub weight_cap_pct: f64,
    /// Per-ticker target weight floor, in percent (0 allows full exit).
    pub weight_floor_pct: f64,
    /// Trades smaller than this dollar amount are forced to Hold.
    pub min_trade_amount: f64,
    /// Softmax temperature for turning blended scores into weights.
    pub softmax_temperature: f64,
    /// Pending proposals expire after this many hours.
    pub ttl_hours: i64,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            weight_cap_pct: 30.0,
            weight_floor_pct: 0.0,
            min_trade_amount: 50.0,
            softmax_temperature: 0.25,
            ttl_hours: 72,
        }
    }
}

/// Limits for concurrent fetches against external data providers.
#[derive(Debug, Clone, Copy)]
pub struct FetchConfig {
    pub max_concurrent: usize,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 8,
            timeout_secs: 5,
        }
    }
}

/// Top-level engine configuration, assembled from environment variables with
/// explicit defaults so policy is never buried inside the algorithms.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Annual risk-free rate as a fraction (0.045 = 4.5%).
    pub risk_free_rate: f64,
    /// Benchmark symbol used for beta/alpha.
    pub benchmark: String,
    /// Trailing window (days) for per-ticker momentum history.
    pub momentum_window_days: u32,
    /// Snapshot writes within this many seconds of the previous one are
    /// collapsed into it.
    pub snapshot_dedup_secs: i64,
    pub policy: RebalancePolicy,
    pub weights: ScoreWeights,
    pub proposal: ProposalConfig,
    pub fetch: FetchConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.045,
            benchmark: "SPY".to_string(),
            momentum_window_days: 30,
            snapshot_dedup_secs: 60,
            policy: RebalancePolicy::default(),
            weights: ScoreWeights::default(),
            proposal: ProposalConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            risk_free_rate: env_f64("RISK_FREE_RATE", defaults.risk_free_rate),
            benchmark: std::env::var("BENCHMARK_TICKER").unwrap_or(defaults.benchmark),
            momentum_window_days: env_f64(
                "MOMENTUM_WINDOW_DAYS",
                defaults.momentum_window_days as f64,
            ) as u32,
            snapshot_dedup_secs: env_f64(
                "SNAPSHOT_DEDUP_SECS",
                defaults.snapshot_dedup_secs as f64,
            ) as i64,
            policy: RebalancePolicy {
                max_holding_weight_pct: env_f64(
                    "MAX_HOLDING_WEIGHT_PCT",
                    defaults.policy.max_holding_weight_pct,
                ),
                max_sector_weight_pct: env_f64(
                    "MAX_SECTOR_WEIGHT_PCT",
                    defaults.policy.max_sector_weight_pct,
                ),
                drift_tolerance_pct: env_f64(
                    "DRIFT_TOLERANCE_PCT",
                    defaults.policy.drift_tolerance_pct,
                ),
                volatility_ceiling_pct: env_f64(
                    "VOLATILITY_CEILING_PCT",
                    defaults.policy.volatility_ceiling_pct,
                ),
                target_allocation: None,
            },
            weights: ScoreWeights {
                ai: env_f64("SCORE_WEIGHT_AI", defaults.weights.ai),
                momentum: env_f64("SCORE_WEIGHT_MOMENTUM", defaults.weights.momentum),
                diversification: env_f64(
                    "SCORE_WEIGHT_DIVERSIFICATION",
                    defaults.weights.diversification,
                ),
            },
            proposal: ProposalConfig {
                weight_cap_pct: env_f64("WEIGHT_CAP_PCT", defaults.proposal.weight_cap_pct),
                weight_floor_pct: env_f64("WEIGHT_FLOOR_PCT", defaults.proposal.weight_floor_pct),
                min_trade_amount: env_f64("MIN_TRADE_AMOUNT", defaults.proposal.min_trade_amount),
                softmax_temperature: env_f64(
                    "SOFTMAX_TEMPERATURE",
                    defaults.proposal.softmax_temperature,
                ),
                ttl_hours: env_f64("PROPOSAL_TTL_HOURS", defaults.proposal.ttl_hours as f64) as i64,
            },
            fetch: FetchConfig {
                max_concurrent: env_f64(
                    "FETCH_MAX_CONCURRENT",
                    defaults.fetch.max_concurrent as f64,
                ) as usize,
                timeout_secs: env_f64("FETCH_TIMEOUT_SECS", defaults.fetch.timeout_secs as f64)
                    as u64,
            },
        }
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
