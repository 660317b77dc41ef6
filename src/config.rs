use serde::Deserialize;

use crate::error::SpicompError;

/// Mirrors the external settings loader's output. The loader itself
/// (file format, search paths) is out of scope; this crate only owns the
/// parsed shape and its validation.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// `0` means "seed from OS entropy" at `Config::resolve_seed`'s caller.
    #[serde(default)]
    pub rand_seed: u32,
    #[serde(default)]
    pub is_show_rand_seed: bool,
    pub window_size_x: i32,
    pub window_size_y: i32,
    pub scene_size_x: f64,
    pub scene_size_y: f64,
    pub scene_size_z: f64,
}

impl Config {
    pub fn from_str(text: &str) -> Result<Self, SpicompError> {
        toml_like_parse(text)
    }

    pub fn validate(&self) -> Result<(), SpicompError> {
        if self.scene_size_x <= 0.0 || self.scene_size_y <= 0.0 || self.scene_size_z <= 0.0 {
            return Err(SpicompError::ConfigError(
                "scene_size_x/y/z must be positive".into(),
            ));
        }
        if self.window_size_x <= 0 || self.window_size_y <= 0 {
            return Err(SpicompError::ConfigError(
                "window_size_x/y must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rand_seed: 0,
            is_show_rand_seed: false,
            window_size_x: 800,
            window_size_y: 600,
            scene_size_x: 2000.0,
            scene_size_y: 2000.0,
            scene_size_z: 1000.0,
        }
    }
}

/// Minimal `key = value` line parser so the demo binary can load a config
/// file without depending on a TOML crate the rest of the corpus never
/// reaches for. One `key = value` pair per line; `#` starts a comment.
fn toml_like_parse(text: &str) -> Result<Config, SpicompError> {
    let mut config = Config::default();
    for line in text.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(SpicompError::ConfigError(format!(
                "malformed config line: {line}"
            )));
        };
        let key = key.trim();
        let value = value.trim();
        match key {
            "rand_seed" => config.rand_seed = parse_field(key, value)?,
            "is_show_rand_seed" => config.is_show_rand_seed = parse_field(key, value)?,
            "window_size_x" => config.window_size_x = parse_field(key, value)?,
            "window_size_y" => config.window_size_y = parse_field(key, value)?,
            "scene_size_x" => config.scene_size_x = parse_field(key, value)?,
            "scene_size_y" => config.scene_size_y = parse_field(key, value)?,
            "scene_size_z" => config.scene_size_z = parse_field(key, value)?,
            other => {
                return Err(SpicompError::ConfigError(format!(
                    "unknown config key: {other}"
                )));
            }
        }
    }
    config.validate()?;
    Ok(config)
}

fn parse_field<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SpicompError> {
    value
        .parse()
        .map_err(|_| SpicompError::ConfigError(format!("bad value for {key}: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_config() {
        let text = "
            rand_seed = 42
            window_size_x = 1024
            window_size_y = 768
            scene_size_x = 2000.0
            scene_size_y = 2000.0
            scene_size_z = 1000.0
        ";
        let config = Config::from_str(text).unwrap();
        assert_eq!(config.rand_seed, 42);
        assert_eq!(config.window_size_x, 1024);
        assert!((config.scene_size_z - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_unknown_key() {
        assert!(Config::from_str("bogus = 1").is_err());
    }

    #[test]
    fn rejects_non_positive_scene_size() {
        let text = "
            window_size_x = 100
            window_size_y = 100
            scene_size_x = 0.0
            scene_size_y = 100.0
            scene_size_z = 100.0
        ";
        assert!(Config::from_str(text).is_err());
    }
}
