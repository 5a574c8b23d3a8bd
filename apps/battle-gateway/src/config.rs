use battle_models::BattleConfig;
use clap::Parser;
use std::path::PathBuf;

/// Thin CLI wrapper around [`BattleConfig`]. Every configuration group
/// (`queue`, `cache`, `retry`, `stream`, `dedup`, `simulator`) lives in the
/// TOML file; this struct only covers the handful of process-level knobs a
/// real deployment needs from the environment.
#[derive(Debug, Parser)]
#[command(name = "battle-gateway")]
pub struct CliArgs {
    /// Path to a TOML config file. Missing fields fall back to
    /// `BattleConfig::default()`; a missing file falls back entirely.
    #[arg(long, env = "BATTLE_GATEWAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address the HTTP/WS listener binds to.
    #[arg(long, env = "BATTLE_GATEWAY_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,
}

pub fn load_battle_config(path: Option<&PathBuf>) -> anyhow::Result<BattleConfig> {
    let Some(path) = path else {
        return Ok(BattleConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
    let config: BattleConfig = toml::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))?;
    Ok(config)
}
