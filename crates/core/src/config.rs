use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_i32(profile: &str, key: &str, default: i32) -> i32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub engine: EngineConfig,
    pub queue: QueueConfig,
    pub aws: AwsConfig,
    pub sink: SinkConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `WATCHPOST_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("WATCHPOST_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            engine: EngineConfig::from_env_profiled(p),
            queue: QueueConfig::from_env_profiled(p),
            aws: AwsConfig::from_env_profiled(p),
            sink: SinkConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  engine:  stare_threshold={}, window={}, proximity_difference={}, idle_ttl={}s",
            self.engine.stare_threshold,
            self.engine.history_window,
            self.engine.proximity_difference,
            self.engine.idle_ttl_secs
        );
        tracing::info!(
            "  queue:   tracking={}, alerts={}",
            or_none(&self.queue.tracking_queue_url),
            or_none(&self.queue.alerts_queue_url)
        );
        tracing::info!(
            "  aws:     region={}, static_credentials={}",
            self.aws.region,
            self.aws.access_key_id.is_some()
        );
        tracing::info!("  sink:    kind={}, buffer={}", self.sink.kind, self.sink.buffer_size);
    }
}

fn or_none(value: &str) -> &str {
    if value.is_empty() { "(none)" } else { value }
}

// ── Engine ────────────────────────────────────────────────────

/// Thresholds for the detection rules and per-id state lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Consecutive facing-camera frames that confirm a sustained gaze.
    pub stare_threshold: u32,
    /// Depth samples kept per detection id (newest first).
    pub history_window: usize,
    /// Minimum newest-minus-oldest depth increase that counts as rapid approach.
    pub proximity_difference: i32,
    /// Expected spacing between frames from the vision agent.
    pub frame_interval_ms: u64,
    /// Drop per-id state untouched for this long. 0 keeps state forever.
    pub idle_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stare_threshold: 10,
            history_window: 10,
            proximity_difference: 15,
            frame_interval_ms: 500,
            idle_ttl_secs: 300,
            sweep_interval_secs: 30,
        }
    }
}

impl EngineConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            stare_threshold: profiled_env_u32(p, "STARE_THRESHOLD", d.stare_threshold).max(1),
            history_window: (profiled_env_u32(p, "HISTORY_WINDOW", d.history_window as u32) as usize)
                .max(2),
            proximity_difference: profiled_env_i32(p, "PROXIMITY_DIFFERENCE", d.proximity_difference),
            frame_interval_ms: profiled_env_u64(p, "FRAME_INTERVAL_MS", d.frame_interval_ms),
            idle_ttl_secs: profiled_env_u64(p, "STATE_IDLE_TTL_SECS", d.idle_ttl_secs),
            sweep_interval_secs: profiled_env_u64(p, "STATE_SWEEP_INTERVAL_SECS", d.sweep_interval_secs)
                .max(1),
        }
    }

    /// Wall-clock duration a full gaze streak represents, in seconds.
    pub fn stare_duration_secs(&self) -> f64 {
        self.stare_threshold as f64 * self.frame_interval_ms as f64 / 1000.0
    }
}

// ── Queues ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Input queue carrying raw tracking events.
    pub tracking_queue_url: String,
    /// Output queue the alert service consumes.
    pub alerts_queue_url: String,
    pub dlq_url: Option<String>,
    pub max_batch_size: u32,
    pub poll_interval_ms: u64,
    pub visibility_timeout_secs: u32,
}

impl QueueConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            tracking_queue_url: profiled_env_or(p, "TRACKING_QUEUE_URL", ""),
            alerts_queue_url: profiled_env_or(p, "ALERTS_QUEUE_URL", ""),
            dlq_url: profiled_env_opt(p, "QUEUE_DLQ_URL"),
            max_batch_size: profiled_env_u32(p, "QUEUE_MAX_BATCH_SIZE", 10),
            poll_interval_ms: profiled_env_u64(p, "QUEUE_POLL_INTERVAL_MS", 100),
            visibility_timeout_secs: profiled_env_u32(p, "QUEUE_VISIBILITY_TIMEOUT_SECS", 30),
        }
    }
}

// ── AWS ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            region: profiled_env_or(p, "AWS_REGION", "us-east-1"),
            access_key_id: profiled_env_opt(p, "AWS_ACCESS_KEY_ID"),
            secret_access_key: profiled_env_opt(p, "AWS_SECRET_ACCESS_KEY"),
            session_token: profiled_env_opt(p, "AWS_SESSION_TOKEN"),
            endpoint_url: profiled_env_opt(p, "QUEUE_AWS_ENDPOINT_URL"),
        }
    }
}

// ── Alert sink ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// "sqs" or "log"
    pub kind: String,
    /// Alerts buffered between the engine and the publishers.
    pub buffer_size: usize,
}

impl SinkConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            kind: profiled_env_or(p, "ALERT_SINK", "log").to_lowercase(),
            buffer_size: (profiled_env_u32(p, "ALERT_BUFFER_SIZE", 1024) as usize).max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_defaults_match_rule_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.stare_threshold, 10);
        assert_eq!(cfg.history_window, 10);
        assert_eq!(cfg.proximity_difference, 15);
        assert_eq!(cfg.stare_duration_secs(), 5.0);
    }

    #[test]
    fn profiled_key_wins_over_plain_key() {
        env::set_var("WPCFG_STARE_THRESHOLD", "4");
        let cfg = EngineConfig::from_env_profiled("WPCFG");
        assert_eq!(cfg.stare_threshold, 4);
        env::remove_var("WPCFG_STARE_THRESHOLD");
    }

    #[test]
    fn unparsable_values_fall_back_to_defaults() {
        env::set_var("WPBAD_PROXIMITY_DIFFERENCE", "lots");
        let cfg = EngineConfig::from_env_profiled("WPBAD");
        assert_eq!(cfg.proximity_difference, 15);
        env::remove_var("WPBAD_PROXIMITY_DIFFERENCE");
    }

    #[test]
    fn sink_kind_is_lowercased() {
        env::set_var("WPSINK_ALERT_SINK", "SQS");
        let cfg = SinkConfig::from_env_profiled("WPSINK");
        assert_eq!(cfg.kind, "sqs");
        env::remove_var("WPSINK_ALERT_SINK");
    }
}
