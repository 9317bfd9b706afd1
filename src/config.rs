use crate::types::*;
use std::{env, fs, path::PathBuf};

pub fn repo_root() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn resolve_repo_path(raw: &str) -> PathBuf {
  let path = PathBuf::from(raw);
  if path.is_absolute() {
    path
  } else {
    repo_root().join(path)
  }
}

pub fn config_path() -> PathBuf {
  match env_default("MATCHUP_CONFIG_PATH") {
    Some(raw) => resolve_repo_path(&raw),
    None => repo_root().join("config.json"),
  }
}

pub fn env_default(key: &str) -> Option<String> {
  env::var(key)
    .ok()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
}

pub fn apply_env_defaults(mut config: AppConfig) -> AppConfig {
  if config.listen_addr.trim().is_empty() {
    config.listen_addr = env_default("MATCHUP_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
  }
  if config.image_service_url.trim().is_empty() {
    if let Some(value) = env_default("IMAGE_SERVICE_URL") {
      config.image_service_url = value;
    }
  }
  if config.image_service_key.trim().is_empty() {
    if let Some(value) = env_default("IMAGE_SERVICE_KEY") {
      config.image_service_key = value;
    }
  }
  if config.data_path.trim().is_empty() {
    if let Some(value) = env_default("MATCHUP_DATA_PATH") {
      config.data_path = value;
    }
  }
  if config.static_dir.trim().is_empty() {
    if let Some(value) = env_default("MATCHUP_STATIC_DIR") {
      config.static_dir = value;
    }
  }
  if config.min_entrants == 0 {
    config.min_entrants = MIN_ENTRANTS;
  }
  if config.max_entrants < config.min_entrants {
    config.max_entrants = config.min_entrants.max(MAX_ENTRANTS);
  }
  config
}

pub fn load_config_inner() -> Result<AppConfig, String> {
  let path = config_path();
  if !path.is_file() {
    return Ok(apply_env_defaults(AppConfig::default()));
  }
  let data = fs::read_to_string(&path).map_err(|e| format!("read config {}: {e}", path.display()))?;
  let config =
    serde_json::from_str::<AppConfig>(&data).map_err(|e| format!("parse config {}: {e}", path.display()))?;
  Ok(apply_env_defaults(config))
}

pub fn load_env_file() {
  let env_path = repo_root().join(".env");
  if !env_path.is_file() {
    return;
  }
  let contents = match fs::read_to_string(&env_path) {
    Ok(data) => data,
    Err(_) => return,
  };
  for line in contents.lines() {
    if let Some((key, value)) = parse_env_line(line) {
      if env::var_os(&key).is_none() {
        env::set_var(key, value);
      }
    }
  }
}

pub fn parse_env_line(line: &str) -> Option<(String, String)> {
  let trimmed = line.trim();
  if trimmed.is_empty() || trimmed.starts_with('#') {
    return None;
  }
  let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
  let (key, raw_value) = trimmed.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  let mut value = raw_value.trim();
  if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2 {
    value = &value[1..value.len() - 1];
  } else if let Some(idx) = value.find('#') {
    value = value[..idx].trim_end();
  }
  Some((key.to_string(), value.to_string()))
}

pub fn data_path_from_config(config: &AppConfig) -> Option<PathBuf> {
  let trimmed = config.data_path.trim();
  if trimmed.is_empty() {
    return None;
  }
  Some(resolve_repo_path(trimmed))
}

pub fn static_dir_from_config(config: &AppConfig) -> Option<PathBuf> {
  let trimmed = config.static_dir.trim();
  if trimmed.is_empty() {
    return None;
  }
  Some(resolve_repo_path(trimmed)).filter(|path| path.is_dir())
}

pub fn logs_dir_from_config(config: &AppConfig) -> PathBuf {
  let trimmed = config.logs_dir.trim();
  if trimmed.is_empty() {
    return repo_root().join("logs");
  }
  resolve_repo_path(trimmed)
}

pub fn log_env_warnings(config: &AppConfig) {
  let mut warnings = Vec::new();

  if config.image_service_url.trim().is_empty() {
    warnings.push("IMAGE_SERVICE_URL not set and no image service in config — entrants get placeholder images");
  } else if config.image_service_key.trim().is_empty() {
    warnings.push("IMAGE_SERVICE_KEY not set — image requests are sent without credentials");
  }
  if config.data_path.trim().is_empty() {
    warnings.push("MATCHUP_DATA_PATH not set and no data path in config — match-ups are kept in memory only");
  }

  for msg in warnings {
    tracing::warn!("{}", msg);
  }
}
