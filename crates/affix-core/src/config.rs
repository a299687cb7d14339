//! Configuration module
//!
//! Per-field options (`AttachmentOptions`), variant recipes (`VariantSpec`)
//! and the process-wide `AttachmentConfig`. The global configuration is built
//! once at startup through `AttachmentConfigBuilder` and is read-only
//! thereafter; per-field defaults are merged once at registration time,
//! never per call.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::attachment::RawFile;
use crate::converter::Converter;
use crate::driver::StorageDriver;
use crate::entity::AttachmentHost;
use crate::error::{AttachmentError, AttachmentResult};

/// How a resized image is fitted into the requested box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeFit {
    /// Fill the box, cropping overflow (default).
    #[default]
    Cover,
    /// Fit within the box, letterboxing onto a background canvas.
    Contain,
    /// Stretch to the exact box, ignoring aspect ratio.
    Fill,
    /// Fit within the box, output may be smaller than the box.
    Inside,
    /// Cover the box without cropping, output may be larger than the box.
    Outside,
}

/// Resize parameters for a variant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResizeSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: ResizeFit,
    /// RGBA canvas fill used by `Contain`. Transparent black when unset.
    pub background: Option<[u8; 4]>,
    /// Never scale above the source dimensions.
    pub without_enlargement: bool,
}

/// Target encode format for a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Gif => "gif",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Gif => "image/gif",
            OutputFormat::Webp => "image/webp",
        }
    }
}

/// Encode format plus encoder options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeSpec {
    pub format: OutputFormat,
    /// 1..=100, encoder default when unset.
    pub quality: Option<u8>,
    pub lossless: bool,
}

impl Default for EncodeSpec {
    fn default() -> Self {
        EncodeSpec {
            format: OutputFormat::Webp,
            quality: None,
            lossless: false,
        }
    }
}

impl From<OutputFormat> for EncodeSpec {
    fn from(format: OutputFormat) -> Self {
        EncodeSpec {
            format,
            ..EncodeSpec::default()
        }
    }
}

/// Blurhash component grid, 1..=9 per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurhashComponents {
    pub x: u32,
    pub y: u32,
}

impl Default for BlurhashComponents {
    fn default() -> Self {
        BlurhashComponents { x: 4, y: 4 }
    }
}

/// Whether and how to compute a perceptual hash for image attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlurhashPolicy {
    Disabled,
    #[default]
    Enabled,
    Custom {
        enabled: bool,
        components: BlurhashComponents,
    },
}

impl BlurhashPolicy {
    pub fn is_enabled(&self) -> bool {
        match self {
            BlurhashPolicy::Disabled => false,
            BlurhashPolicy::Enabled => true,
            BlurhashPolicy::Custom { enabled, .. } => *enabled,
        }
    }

    pub fn components(&self) -> BlurhashComponents {
        match self {
            BlurhashPolicy::Custom { components, .. } => *components,
            _ => BlurhashComponents::default(),
        }
    }
}

/// A named transformation recipe. Pure configuration: resolved to a concrete
/// set at processing time and handed to converters as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantSpec {
    pub resize: Option<ResizeSpec>,
    /// Target format; converters default to webp when unset.
    pub format: Option<EncodeSpec>,
    /// Apply EXIF orientation before transforming. On by default.
    pub auto_orient: bool,
    /// Per-variant hint carried through to converters. The perceptual hash
    /// on the record itself follows the field-level policy.
    pub blurhash: Option<bool>,
}

impl Default for VariantSpec {
    fn default() -> Self {
        VariantSpec {
            resize: None,
            format: None,
            auto_orient: true,
            blurhash: None,
        }
    }
}

/// One entry of a per-field variant selection: either a reference into the
/// global variant table or an inline ad-hoc spec.
#[derive(Debug, Clone)]
pub enum VariantRef {
    Named(String),
    Inline(String, VariantSpec),
}

/// Ordered per-field variant selection.
pub type VariantSelection = Vec<VariantRef>;

/// Custom rename callback: `(file, field name, host entity) -> new name`.
/// The returned name is normalized before use.
pub type RenameFn = dyn Fn(&RawFile, &str, &dyn AttachmentHost) -> String + Send + Sync;

/// How stored object names are derived from uploads.
#[derive(Clone, Default)]
pub enum RenamePolicy {
    /// Keep the (normalized) client-supplied file name.
    Keep,
    /// Generate a fresh time-ordered identifier.
    #[default]
    Random,
    Custom(Arc<RenameFn>),
}

impl fmt::Debug for RenamePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenamePolicy::Keep => write!(f, "Keep"),
            RenamePolicy::Random => write!(f, "Random"),
            RenamePolicy::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Per-field configuration, immutable once registered.
#[derive(Debug, Clone)]
pub struct AttachmentOptions {
    /// Folder template; `:identifier` placeholders are substituted with
    /// normalized entity field values at key generation time.
    pub folder: String,
    pub blurhash: BlurhashPolicy,
    pub variants: VariantSelection,
    /// Drive override; the configured default drive when unset.
    pub driver: Option<String>,
}

impl Default for AttachmentOptions {
    fn default() -> Self {
        AttachmentOptions {
            folder: "attachments".to_string(),
            blurhash: BlurhashPolicy::default(),
            variants: Vec::new(),
            driver: None,
        }
    }
}

/// Process-wide pipeline configuration: driver registry, rename policy,
/// ordered converter list and the global variant table. Constructed once at
/// process start, read-only thereafter; safe for concurrent reads.
pub struct AttachmentConfig {
    drivers: HashMap<String, Arc<dyn StorageDriver>>,
    default_driver: String,
    rename: RenamePolicy,
    converters: Vec<Arc<dyn Converter>>,
    variants: HashMap<String, VariantSpec>,
}

impl AttachmentConfig {
    pub fn builder(default_driver: impl Into<String>) -> AttachmentConfigBuilder {
        AttachmentConfigBuilder {
            drivers: HashMap::new(),
            default_driver: default_driver.into(),
            rename: RenamePolicy::default(),
            converters: Vec::new(),
            variants: HashMap::new(),
        }
    }

    /// Look up a registered driver by drive name.
    pub fn driver(&self, name: &str) -> Option<Arc<dyn StorageDriver>> {
        self.drivers.get(name).cloned()
    }

    pub fn default_driver_name(&self) -> &str {
        &self.default_driver
    }

    pub fn rename(&self) -> &RenamePolicy {
        &self.rename
    }

    /// Converters in registration order; first match wins.
    pub fn converters(&self) -> &[Arc<dyn Converter>] {
        &self.converters
    }

    pub fn global_variant(&self, name: &str) -> Option<&VariantSpec> {
        self.variants.get(name)
    }

    /// Expand a per-field variant selection into an ordered, concrete
    /// `(name, spec)` set. Named references are resolved against the global
    /// table; an unknown name is an `UnknownVariant` error. Names are unique
    /// in the result: a repeated name keeps its original position but takes
    /// the last spec given for it.
    pub fn resolve_variants(
        &self,
        selection: &VariantSelection,
    ) -> AttachmentResult<Vec<(String, VariantSpec)>> {
        let mut resolved: Vec<(String, VariantSpec)> = Vec::with_capacity(selection.len());
        for entry in selection {
            let (name, spec) = match entry {
                VariantRef::Named(name) => {
                    let spec = self
                        .variants
                        .get(name)
                        .ok_or_else(|| AttachmentError::UnknownVariant(name.clone()))?;
                    (name, spec.clone())
                }
                VariantRef::Inline(name, spec) => (name, spec.clone()),
            };
            match resolved.iter().position(|(existing, _)| existing == name) {
                Some(idx) => resolved[idx].1 = spec,
                None => resolved.push((name.clone(), spec)),
            }
        }
        Ok(resolved)
    }
}

impl fmt::Debug for AttachmentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentConfig")
            .field("drivers", &self.drivers.keys().collect::<Vec<_>>())
            .field("default_driver", &self.default_driver)
            .field("rename", &self.rename)
            .field("converters", &self.converters.len())
            .field("variants", &self.variants.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`AttachmentConfig`].
pub struct AttachmentConfigBuilder {
    drivers: HashMap<String, Arc<dyn StorageDriver>>,
    default_driver: String,
    rename: RenamePolicy,
    converters: Vec<Arc<dyn Converter>>,
    variants: HashMap<String, VariantSpec>,
}

impl AttachmentConfigBuilder {
    pub fn driver(mut self, name: impl Into<String>, driver: Arc<dyn StorageDriver>) -> Self {
        self.drivers.insert(name.into(), driver);
        self
    }

    pub fn rename(mut self, policy: RenamePolicy) -> Self {
        self.rename = policy;
        self
    }

    /// Append a converter; registration order is the polling order.
    pub fn converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converters.push(converter);
        self
    }

    /// Register a global named variant.
    pub fn variant(mut self, name: impl Into<String>, spec: VariantSpec) -> Self {
        self.variants.insert(name.into(), spec);
        self
    }

    /// Finalize the configuration. Fails with `UnknownDriver` when the
    /// default drive name was never registered.
    pub fn build(self) -> AttachmentResult<AttachmentConfig> {
        if !self.drivers.contains_key(&self.default_driver) {
            return Err(AttachmentError::UnknownDriver(self.default_driver));
        }
        Ok(AttachmentConfig {
            drivers: self.drivers,
            default_driver: self.default_driver,
            rename: self.rename,
            converters: self.converters,
            variants: self.variants,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{ByteStream, StorageResult};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::time::Duration;

    struct NullDriver;

    #[async_trait]
    impl StorageDriver for NullDriver {
        async fn put(&self, _key: &str, _data: Bytes, _content_type: &str) -> StorageResult<()> {
            Ok(())
        }
        async fn get_url(&self, _key: &str) -> StorageResult<Option<String>> {
            Ok(None)
        }
        async fn get_signed_url(&self, key: &str, _expires_in: Duration) -> StorageResult<String> {
            Ok(format!("null://{key}"))
        }
        async fn get_bytes(&self, _key: &str) -> StorageResult<Bytes> {
            Ok(Bytes::new())
        }
        async fn get_stream(&self, _key: &str) -> StorageResult<ByteStream> {
            Ok(Box::pin(futures::stream::empty()))
        }
    }

    fn config_with_variant() -> AttachmentConfig {
        AttachmentConfig::builder("null")
            .driver("null", std::sync::Arc::new(NullDriver))
            .variant(
                "thumbnail",
                VariantSpec {
                    resize: Some(ResizeSpec {
                        width: Some(64),
                        height: Some(64),
                        ..ResizeSpec::default()
                    }),
                    ..VariantSpec::default()
                },
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_default_driver() {
        let err = AttachmentConfig::builder("missing").build().unwrap_err();
        assert!(matches!(err, AttachmentError::UnknownDriver(name) if name == "missing"));
    }

    #[test]
    fn test_resolve_named_and_inline_variants() {
        let config = config_with_variant();
        let selection = vec![
            VariantRef::Named("thumbnail".to_string()),
            VariantRef::Inline("2x".to_string(), VariantSpec::default()),
        ];
        let resolved = config.resolve_variants(&selection).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].0, "thumbnail");
        assert_eq!(resolved[0].1.resize.unwrap().width, Some(64));
        assert_eq!(resolved[1].0, "2x");
    }

    #[test]
    fn test_resolve_dedupes_repeated_names_last_wins() {
        let config = config_with_variant();
        let inline = VariantSpec {
            resize: Some(ResizeSpec {
                width: Some(128),
                height: Some(128),
                ..ResizeSpec::default()
            }),
            ..VariantSpec::default()
        };
        let selection = vec![
            VariantRef::Named("thumbnail".to_string()),
            VariantRef::Inline("2x".to_string(), VariantSpec::default()),
            VariantRef::Inline("thumbnail".to_string(), inline),
        ];
        let resolved = config.resolve_variants(&selection).unwrap();
        assert_eq!(resolved.len(), 2);
        // the repeated name keeps its position but takes the later spec
        assert_eq!(resolved[0].0, "thumbnail");
        assert_eq!(resolved[0].1.resize.unwrap().width, Some(128));
        assert_eq!(resolved[1].0, "2x");
    }

    #[test]
    fn test_resolve_unknown_variant() {
        let config = config_with_variant();
        let selection = vec![VariantRef::Named("huge".to_string())];
        let err = config.resolve_variants(&selection).unwrap_err();
        assert!(matches!(err, AttachmentError::UnknownVariant(name) if name == "huge"));
    }

    #[test]
    fn test_blurhash_policy_defaults() {
        assert!(BlurhashPolicy::default().is_enabled());
        assert_eq!(BlurhashPolicy::default().components(), BlurhashComponents { x: 4, y: 4 });
        let custom = BlurhashPolicy::Custom {
            enabled: false,
            components: BlurhashComponents { x: 6, y: 5 },
        };
        assert!(!custom.is_enabled());
        assert_eq!(custom.components(), BlurhashComponents { x: 6, y: 5 });
    }
}
