//! Shared fixtures for lifecycle integration tests.

use std::io::Cursor;
use std::sync::Arc;

use affix::{
    Attachment, AttachmentConfig, AttachmentConfigBuilder, AttachmentHost, AttachmentOptions,
    FieldRegistry, ImageConverter, MemoryDriver, RenamePolicy, ResizeFit, ResizeSpec, VariantRef,
    VariantSpec,
};
use image::{ImageFormat, Rgba, RgbaImage};

/// Blog article with a cover image and an arbitrary document attachment.
pub struct Article {
    pub slug: Option<String>,
    pub cover: Option<Attachment>,
    pub manual: Option<Attachment>,
}

impl Article {
    pub fn new(slug: &str) -> Self {
        Article {
            slug: Some(slug.to_string()),
            cover: None,
            manual: None,
        }
    }
}

impl AttachmentHost for Article {
    fn entity_name(&self) -> &'static str {
        "Article"
    }

    fn placeholder_value(&self, field: &str) -> Option<String> {
        match field {
            "slug" => self.slug.clone(),
            _ => None,
        }
    }

    fn attachment_fields(&self) -> Vec<&'static str> {
        vec!["cover", "manual"]
    }

    fn take_attachment(&mut self, field: &str) -> Option<Attachment> {
        match field {
            "cover" => self.cover.take(),
            "manual" => self.manual.take(),
            _ => None,
        }
    }

    fn restore_attachment(&mut self, field: &str, attachment: Attachment) {
        match field {
            "cover" => self.cover = Some(attachment),
            "manual" => self.manual = Some(attachment),
            _ => {}
        }
    }
}

/// Solid-color PNG, large enough to downscale.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([120, 40, 200, 255]));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("png encoding");
    buffer
}

/// Config with one memory drive, keep-name renaming, the image converter and
/// a global "thumbnail" variant.
pub fn base_config(driver: Arc<MemoryDriver>) -> AttachmentConfigBuilder {
    AttachmentConfig::builder("memory")
        .driver("memory", driver)
        .rename(RenamePolicy::Keep)
        .converter(Arc::new(ImageConverter))
        .variant(
            "thumbnail",
            VariantSpec {
                resize: Some(ResizeSpec {
                    width: Some(16),
                    height: Some(16),
                    fit: ResizeFit::Cover,
                    ..ResizeSpec::default()
                }),
                ..VariantSpec::default()
            },
        )
}

/// Registry with the article cover configured for thumbnails under
/// `articles/:slug`.
pub fn base_registry() -> FieldRegistry {
    let mut registry = FieldRegistry::new();
    registry.register(
        "Article",
        "cover",
        AttachmentOptions {
            folder: "articles/:slug".to_string(),
            variants: vec![VariantRef::Named("thumbnail".to_string())],
            ..AttachmentOptions::default()
        },
    );
    registry
}
