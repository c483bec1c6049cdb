//! TOML configuration loading
//!
//! ```toml
//! safe_height = 100.0
//!
//! [[pipette]]
//! name = "p200"
//! axis = "B"
//! max_volume = 200.0
//! min_volume = 10.0
//!
//! [pipette.plunger]
//! top = 0.0
//! bottom = 10.0
//! blow_out = 12.0
//! drop_tip = 13.0
//! ```

use core::fmt;

use super::types::RobotConfig;
use crate::error::InvalidArgument;

/// Configuration loading errors
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// TOML could not be parsed into a robot configuration
    TomlParse,
    /// Parsed configuration failed validation
    Invalid(InvalidArgument),
}

impl From<InvalidArgument> for ConfigError {
    fn from(e: InvalidArgument) -> Self {
        ConfigError::Invalid(e)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::TomlParse => write!(f, "failed to parse configuration"),
            ConfigError::Invalid(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

/// Parse and validate a TOML robot configuration
pub fn parse_config(input: &str) -> Result<RobotConfig, ConfigError> {
    let config: RobotConfig = toml::from_str(input).map_err(|_e| {
        #[cfg(feature = "defmt")]
        defmt::warn!("config parse failed");
        ConfigError::TomlParse
    })?;
    config.validate()?;

    #[cfg(feature = "defmt")]
    defmt::debug!("loaded config with {} pipettes", config.pipettes.len());

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::Axis;

    const SAMPLE: &str = r#"
safe_height = 90.0

[[pipette]]
name = "p200"
axis = "B"
max_volume = 200.0
min_volume = 10.0

[pipette.speeds]
aspirate = 0.5

[pipette.plunger]
top = 0.0
bottom = 10.0
blow_out = 12.0
drop_tip = 13.0

[[pipette]]
name = "p10x8"
axis = "A"
channels = 8
max_volume = 10.0
min_volume = 0.5
"#;

    #[test]
    fn test_parse_sample() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.safe_height, 90.0);
        assert_eq!(config.pipettes.len(), 2);

        let p200 = config.pipette(Axis::B).unwrap();
        assert_eq!(p200.name.as_str(), "p200");
        assert_eq!(p200.speeds.aspirate, 0.5);
        assert_eq!(p200.speeds.dispense, 1.0);
        assert_eq!(p200.plunger.drop_tip, Some(13.0));

        let multi = config.pipette(Axis::A).unwrap();
        assert_eq!(multi.channels, 8);
        assert_eq!(multi.min_volume, 0.5);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_config("[[pipette]\n"), Err(ConfigError::TomlParse));
    }

    #[test]
    fn test_parse_validates() {
        let input = r#"
[[pipette]]
axis = "B"
max_volume = 5.0
min_volume = 10.0
"#;
        assert_eq!(
            parse_config(input),
            Err(ConfigError::Invalid(InvalidArgument::InvalidCapacity))
        );
    }
}
