use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::colour::colour_order::ColourOrder;
use crate::Settings;

/// Configuration manager for bridge settings
/// Settings are persisted as JSON in the working directory by default and validated against a
/// schema describing every option
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

/// Available configuration options with validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub mapping: MappingConfigSchema,
    pub artnet: ArtNetConfigSchema,
    pub sacn: SacnConfigSchema,
    pub diagnostics: DiagnosticsConfigSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfigSchema {
    pub colour_order: ConfigOption<String>,
    pub packing: ConfigOption<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtNetConfigSchema {
    pub artnet_enabled: ConfigOption<bool>,
    pub artnet_bind_ip: ConfigOption<String>,
    pub artnet_port: ConfigOption<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SacnConfigSchema {
    pub sacn_enabled: ConfigOption<bool>,
    pub sacn_bind_ip: ConfigOption<String>,
    pub sacn_port: ConfigOption<u16>,
    pub multicast_refresh_ms: ConfigOption<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsConfigSchema {
    pub debug: ConfigOption<bool>,
    pub debug_packet_interval: ConfigOption<u32>,
}

/// Configuration option with validation and available choices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption<T> {
    pub default: T,
    pub valid_range: Option<(T, T)>,
    pub valid_choices: Option<Vec<T>>,
    pub description: String,
    pub requires_restart: bool,
}

/// Persisted configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    pub settings: Settings,
    pub created_at: String,
    pub modified_at: String,
}

impl ConfigManager {
    /// Create a new configuration manager
    /// If no path is provided, defaults to 'pixelbridge.json' in the current working directory
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from("pixelbridge.json"));

        Self {
            config_path,
            settings: Settings::default(),
        }
    }

    /// Load settings from configuration file
    /// Writes a default file first if none exists
    pub fn load(&mut self) -> Result<Settings, ConfigError> {
        if !self.config_path.exists() {
            self.save()?;
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config_file: ConfigFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if config_file.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "Config file version {} doesn't match application version {}. Using defaults for new settings.",
                config_file.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        Self::validate_settings(&config_file.settings).map_err(ConfigError::ValidationError)?;

        self.settings = config_file.settings;
        Ok(self.settings.clone())
    }

    /// Save current settings to configuration file
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
            }
        }

        let now = chrono::Utc::now().to_rfc3339();
        let config_file = ConfigFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: self.settings.clone(),
            created_at: now.clone(),
            modified_at: now,
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(&self.config_path, content)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Validate, then update settings and save to file
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), ConfigError> {
        Self::validate_settings(&settings).map_err(ConfigError::ValidationError)?;
        self.settings = settings;
        self.save()
    }

    /// Get current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get configuration schema with available options
    pub fn schema() -> ConfigSchema {
        ConfigSchema {
            mapping: MappingConfigSchema {
                colour_order: ConfigOption {
                    default: "RGB".to_string(),
                    valid_range: None,
                    valid_choices: Some(
                        ["RGB", "RBG", "GRB", "GBR", "BRG", "BGR"]
                            .iter()
                            .map(|s| s.to_string())
                            .collect(),
                    ),
                    description: "Order of the red, green and blue bytes in incoming pixels"
                        .to_string(),
                    requires_restart: true,
                },
                packing: ConfigOption {
                    default: true,
                    valid_range: None,
                    valid_choices: None,
                    description:
                        "Fill each universe before moving on (off: every strip starts a new universe)"
                            .to_string(),
                    requires_restart: true,
                },
            },
            artnet: ArtNetConfigSchema {
                artnet_enabled: ConfigOption {
                    default: true,
                    valid_range: None,
                    valid_choices: None,
                    description: "Listen for Art-Net DMX".to_string(),
                    requires_restart: true,
                },
                artnet_bind_ip: ConfigOption {
                    default: "0.0.0.0".to_string(),
                    valid_range: None,
                    valid_choices: None,
                    description: "Local address the Art-Net listener binds to".to_string(),
                    requires_restart: true,
                },
                artnet_port: ConfigOption {
                    default: 6454,
                    valid_range: Some((1, 65535)),
                    valid_choices: None,
                    description: "UDP port for Art-Net input".to_string(),
                    requires_restart: true,
                },
            },
            sacn: SacnConfigSchema {
                sacn_enabled: ConfigOption {
                    default: true,
                    valid_range: None,
                    valid_choices: None,
                    description: "Listen for sACN (E1.31) DMX".to_string(),
                    requires_restart: true,
                },
                sacn_bind_ip: ConfigOption {
                    default: "0.0.0.0".to_string(),
                    valid_range: None,
                    valid_choices: None,
                    description: "Local interface used to join sACN multicast groups".to_string(),
                    requires_restart: true,
                },
                sacn_port: ConfigOption {
                    default: 5568,
                    valid_range: Some((1, 65535)),
                    valid_choices: None,
                    description: "UDP port for sACN input".to_string(),
                    requires_restart: true,
                },
                multicast_refresh_ms: ConfigOption {
                    default: 1000,
                    valid_range: Some((100, 60_000)),
                    valid_choices: None,
                    description: "How often newly mapped universes are joined".to_string(),
                    requires_restart: true,
                },
            },
            diagnostics: DiagnosticsConfigSchema {
                debug: ConfigOption {
                    default: false,
                    valid_range: None,
                    valid_choices: None,
                    description: "Log a line every few hundred DMX packets".to_string(),
                    requires_restart: false,
                },
                debug_packet_interval: ConfigOption {
                    default: 100,
                    valid_range: Some((1, 100_000)),
                    valid_choices: None,
                    description: "Packets between debug log lines".to_string(),
                    requires_restart: false,
                },
            },
        }
    }

    /// Validate settings against schema
    pub fn validate_settings(settings: &Settings) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let schema = Self::schema();

        // Mapping settings: any letter case is accepted
        if let Err(e) = settings.colour_order.parse::<ColourOrder>() {
            errors.push(e.to_string());
        }

        // Listener settings
        if settings.artnet_bind_ip.parse::<IpAddr>().is_err() {
            errors.push(format!(
                "artnet_bind_ip is not a valid IP address: {}",
                settings.artnet_bind_ip
            ));
        }
        // multicast membership is joined per IPv4 interface
        if settings.sacn_bind_ip.parse::<Ipv4Addr>().is_err() {
            errors.push(format!(
                "sacn_bind_ip is not a valid IPv4 address: {}",
                settings.sacn_bind_ip
            ));
        }

        if let Some((min, max)) = schema.artnet.artnet_port.valid_range {
            if settings.artnet_port < min || settings.artnet_port > max {
                errors.push(format!("artnet_port must be between {} and {}", min, max));
            }
        }

        if let Some((min, max)) = schema.sacn.sacn_port.valid_range {
            if settings.sacn_port < min || settings.sacn_port > max {
                errors.push(format!("sacn_port must be between {} and {}", min, max));
            }
        }

        if let Some((min, max)) = schema.sacn.multicast_refresh_ms.valid_range {
            if settings.multicast_refresh_ms < min || settings.multicast_refresh_ms > max {
                errors.push(format!(
                    "multicast_refresh_ms must be between {} and {}",
                    min, max
                ));
            }
        }

        if let Some((min, max)) = schema.diagnostics.debug_packet_interval.valid_range {
            if settings.debug_packet_interval < min || settings.debug_packet_interval > max {
                errors.push(format!(
                    "debug_packet_interval must be between {} and {}",
                    min, max
                ));
            }
        }

        // Static devices
        for device in &settings.devices {
            if let Err(e) = device.to_device() {
                errors.push(e);
            }
        }

        if settings.artnet_enabled
            && settings.sacn_enabled
            && settings.artnet_port == settings.sacn_port
        {
            errors.push("artnet_port and sacn_port must differ".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    ReadError(String),
    WriteError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(msg) => write!(f, "Failed to read config file: {}", msg),
            ConfigError::WriteError(msg) => write!(f, "Failed to write config file: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config file: {}", msg),
            ConfigError::SerializeError(msg) => write!(f, "Failed to serialize config: {}", msg),
            ConfigError::ValidationError(errors) => {
                write!(f, "Config validation errors: {}", errors.join(", "))
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::device::pixel_device::ColourModel;
    use crate::messages::DeviceConfig;

    #[test]
    fn test_config_manager_new() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.json");

        let manager = ConfigManager::new(Some(config_path.clone()));
        assert_eq!(manager.config_path(), config_path);
        assert_eq!(manager.settings(), &Settings::default());
    }

    #[test]
    fn test_load_creates_default_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("bridge.json");

        let mut manager = ConfigManager::new(Some(config_path.clone()));
        let settings = manager.load().unwrap();

        assert_eq!(settings, Settings::default());
        assert!(config_path.exists());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.json");

        let mut manager = ConfigManager::new(Some(config_path.clone()));

        let mut settings = Settings::default();
        settings.colour_order = "grb".to_string();
        settings.packing = false;

        manager.update_settings(settings.clone()).unwrap();

        let mut manager2 = ConfigManager::new(Some(config_path));
        let loaded_settings = manager2.load().unwrap();

        assert_eq!(loaded_settings.colour_order, "grb");
        assert!(!loaded_settings.packing);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.json");
        fs::write(
            &config_path,
            r#"{
                "version": "0.0.1",
                "settings": { "colour_order": "BGR" },
                "created_at": "",
                "modified_at": ""
            }"#,
        )
        .unwrap();

        let mut manager = ConfigManager::new(Some(config_path));
        let settings = manager.load().unwrap();
        assert_eq!(settings.colour_order, "BGR");
        assert_eq!(settings.artnet_port, 6454);
        assert!(settings.packing);
    }

    #[test]
    fn test_unparseable_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.json");
        fs::write(&config_path, "{ not json").unwrap();

        let mut manager = ConfigManager::new(Some(config_path));
        assert!(matches!(manager.load(), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();

        assert!(ConfigManager::validate_settings(&settings).is_ok());

        settings.colour_order = "RGBW".to_string();
        assert!(ConfigManager::validate_settings(&settings).is_err());

        settings.colour_order = "RGB".to_string();
        settings.artnet_bind_ip = "not-an-ip".to_string();
        assert!(ConfigManager::validate_settings(&settings).is_err());

        settings.artnet_bind_ip = "0.0.0.0".to_string();
        settings.sacn_bind_ip = "::".to_string();
        assert!(ConfigManager::validate_settings(&settings).is_err());

        settings.sacn_bind_ip = "0.0.0.0".to_string();
        settings.sacn_port = settings.artnet_port;
        assert!(ConfigManager::validate_settings(&settings).is_err());

        settings.sacn_enabled = false;
        assert!(ConfigManager::validate_settings(&settings).is_ok());

        settings.devices.push(DeviceConfig {
            id: "not-a-mac".to_string(),
            strips: vec![ColourModel::Rgb],
            pixels_per_strip: 10,
            artnet_universe: 1,
            artnet_channel: 1,
        });
        assert!(ConfigManager::validate_settings(&settings).is_err());
    }

    #[test]
    fn test_static_devices_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("devices.json");

        let mut settings = Settings::default();
        settings.devices.push(DeviceConfig {
            id: "d8:80:39:66:4b:0f".to_string(),
            strips: vec![ColourModel::Rgb, ColourModel::Rgbow],
            pixels_per_strip: 60,
            artnet_universe: 3,
            artnet_channel: 1,
        });

        let mut manager = ConfigManager::new(Some(config_path.clone()));
        manager.update_settings(settings.clone()).unwrap();

        let loaded = ConfigManager::new(Some(config_path)).load().unwrap();
        assert_eq!(loaded.devices, settings.devices);

        let device = loaded.devices[0].to_device().unwrap();
        assert_eq!(device.strip_count(), 2);
        assert_eq!(device.strip_model(1), ColourModel::Rgbow);
    }

    #[test]
    fn test_update_rejects_invalid_settings() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = ConfigManager::new(Some(temp_dir.path().join("c.json")));

        let mut settings = Settings::default();
        settings.debug_packet_interval = 0;
        assert!(matches!(
            manager.update_settings(settings),
            Err(ConfigError::ValidationError(_))
        ));
        assert_eq!(manager.settings(), &Settings::default());
    }

    #[test]
    fn test_schema_completeness() {
        let schema = ConfigManager::schema();

        assert_eq!(schema.mapping.colour_order.default, Settings::default().colour_order);
        assert_eq!(schema.artnet.artnet_port.default, Settings::default().artnet_port);
        assert_eq!(schema.sacn.sacn_port.default, Settings::default().sacn_port);
        assert!(schema.diagnostics.debug_packet_interval.valid_range.is_some());
    }
}
