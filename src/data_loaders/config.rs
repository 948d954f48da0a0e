use std::path::Path;

use serde_yaml::{Mapping, Value};

use super::yaml::{bool_any, bool_at, load_yaml, mapping_at, point_at, str_any, u64_any};

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub debug: bool,
    pub log_level: String,
    pub settings: AppSettings,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppSettings {
    pub runtime: RuntimeSettings,
    pub mascots: MascotSettings,
    pub animation: AnimationSettings,
    pub development: DevelopmentSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSettings {
    pub tick_sleep_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MascotSettings {
    pub spawn_offset: (i32, i32),
    pub default_position: (i32, i32),
    pub ask_to_show_new: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSettings {
    pub min_frame_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DevelopmentSettings {
    pub debug: bool,
    pub log_level: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self { tick_sleep_ms: 8 }
    }
}

impl Default for MascotSettings {
    fn default() -> Self {
        Self {
            spawn_offset: (20, 20),
            default_position: (0, 0),
            ask_to_show_new: true,
        }
    }
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self { min_frame_delay_ms: 20 }
    }
}

impl Default for DevelopmentSettings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let settings = AppSettings::default();
        Self {
            debug: settings.development.debug,
            log_level: settings.development.log_level.clone(),
            settings,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Option<Self> {
        let value = load_yaml(path)?;
        Self::from_yaml(&value)
    }

    pub fn from_yaml(root: &Value) -> Option<Self> {
        let map = root.as_mapping()?;
        let settings = parse_settings(map);

        Some(Self {
            debug: settings.development.debug,
            log_level: settings.development.log_level.clone(),
            settings,
        })
    }
}

fn parse_settings(root: &Mapping) -> AppSettings {
    let mut settings = AppSettings::default();

    // Top-level shorthands, overridden by the `settings.development` section.
    settings.development.debug = bool_at(root, "debug").unwrap_or(settings.development.debug);
    settings.development.log_level = str_any(root, &["log_level"])
        .unwrap_or(&settings.development.log_level)
        .to_lowercase();

    let Some(settings_map) = mapping_at(root, "settings") else {
        return settings;
    };

    if let Some(runtime) = mapping_at(settings_map, "runtime") {
        settings.runtime.tick_sleep_ms = u64_any(runtime, &["tick_sleep_ms", "tick_ms"])
            .unwrap_or(settings.runtime.tick_sleep_ms)
            .max(1);
    }

    if let Some(mascots) = mapping_at(settings_map, "mascots") {
        let defaults = MascotSettings::default();
        settings.mascots.spawn_offset =
            point_at(mascots, "spawn_offset", defaults.spawn_offset).unwrap_or(defaults.spawn_offset);
        settings.mascots.default_position = point_at(mascots, "default_position", defaults.default_position)
            .unwrap_or(defaults.default_position);
        settings.mascots.ask_to_show_new = bool_any(mascots, &["ask_to_show_new", "confirm_show"])
            .unwrap_or(defaults.ask_to_show_new);
    }

    if let Some(animation) = mapping_at(settings_map, "animation") {
        settings.animation.min_frame_delay_ms =
            u64_any(animation, &["min_frame_delay_ms", "min_delay_ms"])
                .unwrap_or(settings.animation.min_frame_delay_ms)
                .max(10);
    }

    if let Some(dev) = mapping_at(settings_map, "development") {
        settings.development.debug =
            bool_any(dev, &["debug", "debug_mode"]).unwrap_or(settings.development.debug);
        settings.development.log_level = str_any(dev, &["log_level", "logging"])
            .unwrap_or(&settings.development.log_level)
            .to_lowercase();
    }

    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> AppConfig {
        let value: Value = serde_yaml::from_str(src).expect("yaml");
        AppConfig::from_yaml(&value).expect("config")
    }

    #[test]
    fn empty_mapping_gives_defaults() {
        assert_eq!(parse("{}"), AppConfig::default());
    }

    #[test]
    fn non_mapping_root_is_rejected() {
        let value: Value = serde_yaml::from_str("- 1\n- 2\n").expect("yaml");
        assert!(AppConfig::from_yaml(&value).is_none());
    }

    #[test]
    fn nested_sections_override_defaults() {
        let config = parse(
            r#"
settings:
  runtime:
    tick_sleep_ms: 0
  mascots:
    spawn_offset: { x: 32, y: 8 }
    default_position: { x: 100, y: 200 }
    ask_to_show_new: false
  animation:
    min_frame_delay_ms: 1
  development:
    debug: true
    log_level: INFO
"#,
        );

        let s = &config.settings;
        assert_eq!(s.runtime.tick_sleep_ms, 1);
        assert_eq!(s.mascots.spawn_offset, (32, 8));
        assert_eq!(s.mascots.default_position, (100, 200));
        assert!(!s.mascots.ask_to_show_new);
        assert_eq!(s.animation.min_frame_delay_ms, 10);
        assert!(config.debug);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn top_level_debug_shorthand_is_honoured() {
        let config = parse("debug: true\nlog_level: Debug\n");
        assert!(config.debug);
        assert_eq!(config.log_level, "debug");
    }
}
