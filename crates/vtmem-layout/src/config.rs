//! Runtime configuration: reference width, GC header shape and flattening.
//!
//! A [`RuntimeConfig`] is immutable once built and is handed to every
//! [`LayoutEngine`](crate::LayoutEngine) explicitly, so engines with different
//! configurations can live side by side.
use crate::error::ConfigError;
use serde::Serialize;
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};
use tracing::debug;

pub const OPTIONS_ENV_VAR: &str = "VTMEM_OPTIONS";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressingMode {
    /// 4-byte reference slots.
    Compressed,
    /// 8-byte reference slots.
    Full,
}

impl AddressingMode {
    pub const fn reference_size(self) -> usize {
        match self {
            AddressingMode::Compressed => 4,
            AddressingMode::Full => 8,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GcPolicy {
    Gencon,
    OptThruput,
    OptAvgPause,
    Balanced,
    Metronome,
}

impl GcPolicy {
    pub const fn name(self) -> &'static str {
        match self {
            GcPolicy::Gencon => "gencon",
            GcPolicy::OptThruput => "optthruput",
            GcPolicy::OptAvgPause => "optavgpause",
            GcPolicy::Balanced => "balanced",
            GcPolicy::Metronome => "metronome",
        }
    }
}

impl Display for GcPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GcPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gencon" => Ok(GcPolicy::Gencon),
            "optthruput" => Ok(GcPolicy::OptThruput),
            "optavgpause" => Ok(GcPolicy::OptAvgPause),
            "balanced" => Ok(GcPolicy::Balanced),
            "metronome" => Ok(GcPolicy::Metronome),
            other => Err(ConfigError::UnknownGcPolicy(other.to_string())),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct GcHeaderPolicy {
    pub dual_header_shape: bool,
    pub policy: GcPolicy,
}

impl Default for GcHeaderPolicy {
    fn default() -> Self {
        Self {
            dual_header_shape: true,
            policy: GcPolicy::Gencon,
        }
    }
}

impl GcHeaderPolicy {
    /// The dual header shape drops the array `dataAddr` slot, and only does so
    /// under the generational collector.
    pub const fn has_data_addr_slot(&self) -> bool {
        !(self.dual_header_shape && matches!(self.policy, GcPolicy::Gencon))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct RuntimeConfig {
    pub addressing: AddressingMode,
    pub gc: GcHeaderPolicy,
    /// Largest value payload, in bytes, that is stored inline in a field.
    /// `0` disables field flattening.
    pub flattening_threshold: usize,
    pub array_flattening: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            addressing: AddressingMode::Full,
            gc: GcHeaderPolicy::default(),
            flattening_threshold: 0,
            array_flattening: false,
        }
    }
}

impl RuntimeConfig {
    pub const fn reference_size(&self) -> usize {
        self.addressing.reference_size()
    }

    pub const fn field_flattening_enabled(&self) -> bool {
        self.flattening_threshold > 0
    }

    pub fn with_addressing(mut self, addressing: AddressingMode) -> Self {
        self.addressing = addressing;
        self
    }

    pub fn with_flattening_threshold(mut self, threshold: usize) -> Self {
        self.flattening_threshold = threshold;
        self
    }

    pub fn with_array_flattening(mut self, enabled: bool) -> Self {
        self.array_flattening = enabled;
        self
    }

    pub fn with_gc(mut self, dual_header_shape: bool, policy: GcPolicy) -> Self {
        self.gc = GcHeaderPolicy {
            dual_header_shape,
            policy,
        };
        self
    }

    /// Builds a configuration from runtime option strings. Later options win;
    /// anything unrecognised is skipped.
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();
        for arg in args {
            config.apply(arg.as_ref())?;
        }
        debug!("resolved runtime config: {}", config);
        Ok(config)
    }

    /// Reads whitespace-separated options from `VTMEM_OPTIONS`. An unset
    /// variable yields the default configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(OPTIONS_ENV_VAR) {
            Ok(options) => Self::from_args(options.split_whitespace()),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Environment {
                name: OPTIONS_ENV_VAR.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn apply(&mut self, arg: &str) -> Result<(), ConfigError> {
        match arg {
            "-Xcompressedrefs" => self.addressing = AddressingMode::Compressed,
            "-Xnocompressedrefs" => self.addressing = AddressingMode::Full,
            "-XX:+EnableArrayFlattening" => self.array_flattening = true,
            "-XX:-EnableArrayFlattening" => self.array_flattening = false,
            "-XXgc:disableIndexableDualHeaderShape" => self.gc.dual_header_shape = false,
            _ => {
                if let Some(value) = arg.strip_prefix("-XX:ValueTypeFlatteningThreshold=") {
                    self.flattening_threshold =
                        value.parse().map_err(|_| ConfigError::InvalidValue {
                            option: "-XX:ValueTypeFlatteningThreshold".to_string(),
                            value: value.to_string(),
                        })?;
                } else if let Some(policy) = arg.strip_prefix("-Xgcpolicy:") {
                    self.gc.policy = policy.parse()?;
                } else {
                    debug!("ignoring unrecognised option {}", arg);
                }
            }
        }
        Ok(())
    }

    /// The option strings that reproduce this configuration.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![match self.addressing {
            AddressingMode::Compressed => "-Xcompressedrefs".to_string(),
            AddressingMode::Full => "-Xnocompressedrefs".to_string(),
        }];
        args.push(format!("-Xgcpolicy:{}", self.gc.policy));
        if !self.gc.dual_header_shape {
            args.push("-XXgc:disableIndexableDualHeaderShape".to_string());
        }
        if self.flattening_threshold > 0 {
            args.push(format!(
                "-XX:ValueTypeFlatteningThreshold={}",
                self.flattening_threshold
            ));
        }
        args.push(
            if self.array_flattening {
                "-XX:+EnableArrayFlattening"
            } else {
                "-XX:-EnableArrayFlattening"
            }
            .to_string(),
        );
        args
    }
}

impl Display for RuntimeConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_args().join(" "))
    }
}
