use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::domain::model::YoloParams;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub model_path: PathBuf,
    pub params: YoloParams,
    pub intra_threads: usize,
    pub use_cuda: bool,
    pub pool_max_idle: usize,
    pub shutdown_grace: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construye la configuración desde cualquier fuente clave → valor; las claves ausentes toman el valor por defecto.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = YoloParams::default();
        let params = YoloParams {
            input_size: parse_or(&lookup, "MODEL_INPUT_SIZE", defaults.input_size)?,
            conf_threshold: parse_or(&lookup, "CONF_THRESHOLD", defaults.conf_threshold)?,
        };
        if !(0.0..=1.0).contains(&params.conf_threshold) {
            bail!("CONF_THRESHOLD must be within 0..=1, got {}", params.conf_threshold);
        }
        if params.input_size == 0 {
            bail!("MODEL_INPUT_SIZE must be positive");
        }

        Ok(Self {
            port: parse_or(&lookup, "PORT", 8080)?,
            model_path: lookup("MODEL_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("yolo26n.onnx")),
            params,
            intra_threads: parse_or(&lookup, "INTRA_THREADS", 4)?,
            use_cuda: parse_or(&lookup, "USE_CUDA", false)?,
            pool_max_idle: parse_or(&lookup, "POOL_MAX_IDLE", 64)?,
            shutdown_grace: Duration::from_secs(parse_or(&lookup, "SHUTDOWN_GRACE_SECS", 10)?),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        _ => Ok(default),
    }
}
