//! Conversion pipeline
//!
//! `AttachmentProcessor` drives one pending attachment to completion:
//! analyze the raw bytes, resolve the stored object name, upload the
//! original, fan out variants through the configured converters, compute the
//! perceptual hash for images and commit the assembled record into the
//! attachment.
//!
//! The source buffer is read at most once and cached on the processor; all
//! later steps (converters, hashing) reuse it. Any step failure aborts the
//! whole call with nothing committed: the attachment stays pending and
//! already-uploaded objects are left behind as accepted garbage (no
//! compensating delete).

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use uuid::Uuid;

use affix_core::{
    Attachment, AttachmentConfig, AttachmentError, AttachmentHost, AttachmentOptions,
    AttachmentRecord, AttachmentResult, ConvertInput, Converter, RawFile, RenamePolicy,
    StorageDriver, VariantRecord,
};
use affix_storage::{generate_key, normalize_file_name};

use crate::blur::image_to_blurhash;
use crate::sniff::{analyze, FileInfo};

/// Single-use orchestrator for one attachment field. Construct, call
/// [`process`](AttachmentProcessor::process), drop.
pub struct AttachmentProcessor<'a> {
    attachment: &'a mut Attachment,
    entity: &'a dyn AttachmentHost,
    field_name: &'a str,
    drive_name: &'a str,
    driver: Arc<dyn StorageDriver>,
    options: &'a AttachmentOptions,
    config: &'a AttachmentConfig,
    /// Source bytes, populated lazily on first read and reused afterwards.
    buffer: Option<Bytes>,
}

impl<'a> AttachmentProcessor<'a> {
    pub fn new(
        attachment: &'a mut Attachment,
        entity: &'a dyn AttachmentHost,
        field_name: &'a str,
        drive_name: &'a str,
        driver: Arc<dyn StorageDriver>,
        options: &'a AttachmentOptions,
        config: &'a AttachmentConfig,
    ) -> Self {
        AttachmentProcessor {
            attachment,
            entity,
            field_name,
            drive_name,
            driver,
            options,
            config,
            buffer: None,
        }
    }

    /// Run the pipeline to completion and commit the record. A no-op when
    /// the attachment is already processed, so repeat invocations within one
    /// commit cycle never re-upload.
    pub async fn process(&mut self) -> AttachmentResult<()> {
        if self.attachment.is_processed() {
            tracing::debug!(field = %self.field_name, "attachment already processed, skipping");
            return Ok(());
        }
        let Some(file) = self.attachment.raw_file().cloned() else {
            return Ok(());
        };

        let start = Instant::now();
        let record = self.build_record(&file).await?;
        let variant_count = record.variants.len();
        let path = record.path.clone();

        self.attachment.commit(record);

        tracing::info!(
            field = %self.field_name,
            key = %path,
            variants = variant_count,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "attachment processed"
        );
        Ok(())
    }

    async fn build_record(&mut self, file: &RawFile) -> AttachmentResult<AttachmentRecord> {
        let buffer = self.file_buffer(file).await?;
        let info = analyze(&buffer, file);

        let name = self.resolve_name(file);
        let original_key = generate_key(
            &self.options.folder,
            self.entity,
            &name,
            &[&format!("{}.{}", name, info.extname)],
        )?;

        self.driver
            .put(&original_key, buffer.clone(), &info.mime_type)
            .await?;
        let url = self.driver.get_url(&original_key).await?;

        let variants = self.process_variants(&buffer, &info, &name).await?;
        let blurhash = self.compute_blurhash(&buffer, &info)?;

        Ok(AttachmentRecord {
            drive: self.drive_name.to_string(),
            name,
            extname: info.extname,
            size: info.size,
            mime_type: info.mime_type,
            path: original_key,
            original_name: file.name().to_string(),
            url,
            blurhash,
            variants,
        })
    }

    /// Fan out configured variants, in selection order. Variants with no
    /// capable converter are skipped; that is a valid configuration state,
    /// not an error.
    async fn process_variants(
        &self,
        buffer: &Bytes,
        info: &FileInfo,
        base_name: &str,
    ) -> AttachmentResult<Vec<VariantRecord>> {
        let resolved = self.config.resolve_variants(&self.options.variants)?;
        let mut variants = Vec::new();

        for (variant_name, spec) in &resolved {
            let input = ConvertInput {
                buffer: buffer.as_ref(),
                size: info.size,
                mime_type: &info.mime_type,
                extname: &info.extname,
                variant_name,
                variant: spec,
            };

            let Some(converter) = self.pick_converter(&input).await else {
                tracing::debug!(
                    field = %self.field_name,
                    variant = %variant_name,
                    mime_type = %info.mime_type,
                    "no converter supports this input, skipping variant"
                );
                continue;
            };

            let output = converter.handle(&input, spec).await.map_err(|source| {
                AttachmentError::ProcessingFailed {
                    field: self.field_name.to_string(),
                    source: source.context(format!("variant \"{variant_name}\" conversion")),
                }
            })?;

            let variant_key = generate_key(
                &self.options.folder,
                self.entity,
                base_name,
                &[&format!("{}.{}.{}", base_name, variant_name, output.extname)],
            )?;
            self.driver
                .put(&variant_key, output.buffer.clone(), &output.mime_type)
                .await?;

            variants.push(VariantRecord {
                name: variant_name.clone(),
                extname: output.extname,
                size: output.buffer.len() as u64,
                mime_type: output.mime_type,
                path: variant_key,
            });
        }

        Ok(variants)
    }

    /// First converter in registration order whose `supports` returns true.
    async fn pick_converter(&self, input: &ConvertInput<'_>) -> Option<Arc<dyn Converter>> {
        for converter in self.config.converters() {
            if converter.supports(input).await {
                return Some(converter.clone());
            }
        }
        None
    }

    fn compute_blurhash(&self, buffer: &Bytes, info: &FileInfo) -> AttachmentResult<Option<String>> {
        if !info.mime_type.starts_with("image/") || !self.options.blurhash.is_enabled() {
            return Ok(None);
        }
        let components = self.options.blurhash.components();
        let hash = image_to_blurhash(buffer, components).map_err(|source| {
            AttachmentError::ProcessingFailed {
                field: self.field_name.to_string(),
                source: source.context("blurhash computation"),
            }
        })?;
        Ok(Some(hash))
    }

    /// Stored object name per the rename policy. Generated identifiers are
    /// safe by construction and skip normalization.
    fn resolve_name(&self, file: &RawFile) -> String {
        match self.config.rename() {
            RenamePolicy::Keep => normalize_file_name(strip_extension(file.name())),
            RenamePolicy::Custom(rename) => {
                normalize_file_name(&rename(file, self.field_name, self.entity))
            }
            RenamePolicy::Random => Uuid::now_v7().to_string(),
        }
    }

    async fn file_buffer(&mut self, file: &RawFile) -> AttachmentResult<Bytes> {
        if let Some(buffer) = &self.buffer {
            return Ok(buffer.clone());
        }
        let buffer = file.read().await?;
        self.buffer = Some(buffer.clone());
        Ok(buffer)
    }
}

fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((base, _)) if !base.is_empty() => base,
        _ => name,
    }
}

/// Convenience entry point for one-shot processing of a single field.
pub async fn process_attachment(
    attachment: &mut Attachment,
    entity: &dyn AttachmentHost,
    field_name: &str,
    drive_name: &str,
    driver: Arc<dyn StorageDriver>,
    options: &AttachmentOptions,
    config: &AttachmentConfig,
) -> AttachmentResult<()> {
    let mut processor = AttachmentProcessor::new(
        attachment, entity, field_name, drive_name, driver, options, config,
    );
    processor.process().await
}
