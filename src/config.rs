// =============================================================================
// CONFIGURATION - Load settings from vk-present.toml
// =============================================================================
//
// This module handles loading and parsing configuration from vk-present.toml.
// Provides sensible defaults if config file is missing or has errors.
//
// `RenderConfig` is the device/format policy. It is built once and moved into
// the backend; nothing reads it from global state.

use anyhow::{Context, Result};
use ash::vk;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "vk-present.toml";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub render: RenderConfig,
}

/// Window settings (demo binary)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_color: [f32; 4],
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "vk-present".to_string(),
            width: 1280,
            height: 720,
            clear_color: [0.1, 0.2, 0.8, 1.0],
        }
    }
}

/// Policy consulted while negotiating devices, formats and frame pacing.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub device: DeviceConfig,
    pub formats: FormatConfig,
    pub sync: SyncConfig,
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Acceptable physical device types.
    pub types: Vec<DeviceKind>,
    /// Required queue capabilities; order is assignment preference.
    pub queue_capabilities: Vec<QueueCapability>,
    /// Device extensions required on top of the presentation extension.
    pub extensions: Vec<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            types: vec![DeviceKind::Integrated, DeviceKind::Discrete],
            queue_capabilities: vec![
                QueueCapability::Graphics,
                QueueCapability::Compute,
                QueueCapability::Transfer,
            ],
            extensions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormatConfig {
    /// Ranked acceptable swapchain formats.
    pub surface: Vec<ColorFormat>,
    /// Ranked depth buffer formats.
    pub depth: Vec<DepthFormat>,
    /// Used only when the surface leaves its extent to the swapchain.
    pub fallback_extent: [u32; 2],
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            surface: vec![ColorFormat::R8g8b8a8Unorm, ColorFormat::B8g8r8a8Unorm],
            depth: vec![
                DepthFormat::D32Sfloat,
                DepthFormat::D32SfloatS8Uint,
                DepthFormat::D24UnormS8Uint,
            ],
            fallback_extent: [1280, 720],
        }
    }
}

/// Bounded waits: each wait is retried in slices, never blocks forever.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub wait_slice_ms: u64,
    pub max_wait_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            wait_slice_ms: 100,
            max_wait_attempts: 50,
        }
    }
}

/// Debug settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    pub validation: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation: cfg!(debug_assertions),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Integrated,
    Discrete,
    Virtual,
    Cpu,
}

impl DeviceKind {
    pub fn to_vk(self) -> vk::PhysicalDeviceType {
        match self {
            DeviceKind::Integrated => vk::PhysicalDeviceType::INTEGRATED_GPU,
            DeviceKind::Discrete => vk::PhysicalDeviceType::DISCRETE_GPU,
            DeviceKind::Virtual => vk::PhysicalDeviceType::VIRTUAL_GPU,
            DeviceKind::Cpu => vk::PhysicalDeviceType::CPU,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueueCapability {
    Graphics,
    Compute,
    Transfer,
    SparseBinding,
}

impl QueueCapability {
    pub fn to_vk(self) -> vk::QueueFlags {
        match self {
            QueueCapability::Graphics => vk::QueueFlags::GRAPHICS,
            QueueCapability::Compute => vk::QueueFlags::COMPUTE,
            QueueCapability::Transfer => vk::QueueFlags::TRANSFER,
            QueueCapability::SparseBinding => vk::QueueFlags::SPARSE_BINDING,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColorFormat {
    R8g8b8a8Unorm,
    B8g8r8a8Unorm,
    R8g8b8a8Srgb,
    B8g8r8a8Srgb,
    A2b10g10r10UnormPack32,
    R16g16b16a16Sfloat,
}

impl ColorFormat {
    pub fn to_vk(self) -> vk::Format {
        match self {
            ColorFormat::R8g8b8a8Unorm => vk::Format::R8G8B8A8_UNORM,
            ColorFormat::B8g8r8a8Unorm => vk::Format::B8G8R8A8_UNORM,
            ColorFormat::R8g8b8a8Srgb => vk::Format::R8G8B8A8_SRGB,
            ColorFormat::B8g8r8a8Srgb => vk::Format::B8G8R8A8_SRGB,
            ColorFormat::A2b10g10r10UnormPack32 => vk::Format::A2B10G10R10_UNORM_PACK32,
            ColorFormat::R16g16b16a16Sfloat => vk::Format::R16G16B16A16_SFLOAT,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DepthFormat {
    D32Sfloat,
    D32SfloatS8Uint,
    D24UnormS8Uint,
    D16Unorm,
    D16UnormS8Uint,
}

impl DepthFormat {
    pub fn to_vk(self) -> vk::Format {
        match self {
            DepthFormat::D32Sfloat => vk::Format::D32_SFLOAT,
            DepthFormat::D32SfloatS8Uint => vk::Format::D32_SFLOAT_S8_UINT,
            DepthFormat::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
            DepthFormat::D16Unorm => vk::Format::D16_UNORM,
            DepthFormat::D16UnormS8Uint => vk::Format::D16_UNORM_S8_UINT,
        }
    }
}

impl RenderConfig {
    pub fn device_types(&self) -> Vec<vk::PhysicalDeviceType> {
        self.device.types.iter().map(|kind| kind.to_vk()).collect()
    }

    pub fn queue_flags(&self) -> Vec<vk::QueueFlags> {
        self.device
            .queue_capabilities
            .iter()
            .map(|cap| cap.to_vk())
            .collect()
    }

    pub fn surface_formats(&self) -> Vec<vk::Format> {
        self.formats.surface.iter().map(|f| f.to_vk()).collect()
    }

    pub fn depth_formats(&self) -> Vec<vk::Format> {
        self.formats.depth.iter().map(|f| f.to_vk()).collect()
    }

    pub fn fallback_extent(&self) -> vk::Extent2D {
        let [width, height] = self.formats.fallback_extent;
        vk::Extent2D { width, height }
    }

    pub fn validation_layers(&self) -> Vec<String> {
        if self.debug.validation {
            vec!["VK_LAYER_KHRONOS_validation".to_string()]
        } else {
            Vec::new()
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults if not found
    pub fn load() -> Self {
        Self::load_from_path(DEFAULT_CONFIG_PATH).unwrap_or_else(|e| {
            log::warn!("Failed to load {}: {:#}. Using defaults.", DEFAULT_CONFIG_PATH, e);
            Config::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_negotiation_policy() {
        let render = RenderConfig::default();
        assert_eq!(
            render.device_types(),
            vec![
                vk::PhysicalDeviceType::INTEGRATED_GPU,
                vk::PhysicalDeviceType::DISCRETE_GPU
            ]
        );
        assert_eq!(
            render.queue_flags(),
            vec![
                vk::QueueFlags::GRAPHICS,
                vk::QueueFlags::COMPUTE,
                vk::QueueFlags::TRANSFER
            ]
        );
        assert_eq!(
            render.surface_formats(),
            vec![vk::Format::R8G8B8A8_UNORM, vk::Format::B8G8R8A8_UNORM]
        );
        assert_eq!(render.depth_formats()[0], vk::Format::D32_SFLOAT);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [render.device]
            types = ["discrete"]
            queue_capabilities = ["graphics", "transfer"]

            [render.formats]
            depth = ["d24_unorm_s8_uint"]

            [render.debug]
            validation = false
            "#,
        )
        .unwrap();

        assert_eq!(config.render.device.types, vec![DeviceKind::Discrete]);
        assert_eq!(
            config.render.queue_flags(),
            vec![vk::QueueFlags::GRAPHICS, vk::QueueFlags::TRANSFER]
        );
        assert_eq!(config.render.depth_formats(), vec![vk::Format::D24_UNORM_S8_UINT]);
        assert_eq!(config.render.formats.surface, FormatConfig::default().surface);
        assert!(config.render.validation_layers().is_empty());
        assert_eq!(config.window.width, 1280);
    }

    #[test]
    fn unknown_format_name_is_rejected() {
        let result = Config::from_toml(
            r#"
            [render.formats]
            surface = ["rgb565"]
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from_path("definitely/not/here.toml").unwrap();
        assert_eq!(config.render, RenderConfig::default());
    }
}
