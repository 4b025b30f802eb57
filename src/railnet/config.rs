use anyhow::{Context, Result, bail};
use railnet::railnet_formats::{CargoLabel, cargo_label_name, parse_cargo_label};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const MIN_STRETCH: f32 = 0.01;
pub const MAX_STRETCH: f32 = 100.0;

/// Comma separated cargo labels, e.g. `PASS,MAIL`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct CargoFilter(pub Vec<CargoLabel>);

impl FromStr for CargoFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let labels = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                parse_cargo_label(part).ok_or_else(|| {
                    format!("'{}' is not a cargo label (four characters, A-Z or _)", part)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if labels.is_empty() {
            return Err("cargo filter is empty".to_string());
        }
        Ok(CargoFilter(labels))
    }
}

impl TryFrom<String> for CargoFilter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for CargoFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.0.iter().map(|label| cargo_label_name(*label)).collect();
        write!(f, "{}", names.join(","))
    }
}

pub fn parse_stretch(s: &str) -> Result<f32, String> {
    let stretch: f32 = s
        .parse()
        .map_err(|_| format!("'{}' is not a number", s))?;
    if !(MIN_STRETCH..=MAX_STRETCH).contains(&stretch) {
        return Err(format!(
            "stretch factor should be in range [{}, {}]",
            MIN_STRETCH, MAX_STRETCH
        ));
    }
    Ok(stretch)
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GraphConfig {
    /// Keep only these cargo labels. `None` keeps everything.
    pub cargo: Option<CargoFilter>,
    pub hide_short_trains: bool,
    pub hide_express_trains: bool,
    /// Scale applied to station coordinates.
    pub stretch: f32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            cargo: None,
            hide_short_trains: false,
            hide_express_trains: false,
            stretch: 1.0,
        }
    }
}

impl GraphConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: GraphConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_STRETCH..=MAX_STRETCH).contains(&self.stretch) {
            bail!(
                "stretch factor {} should be in range [{}, {}]",
                self.stretch,
                MIN_STRETCH,
                MAX_STRETCH
            );
        }
        Ok(())
    }
}
