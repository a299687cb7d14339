//! Persistence lifecycle coordination.
//!
//! `AttachmentSubscriber` is the bridge between an ORM-style entity lifecycle
//! and the conversion pipeline. Hosts call [`on_load`] after hydrating an
//! entity from the database so stored attachments regain a usable storage
//! driver, and [`before_flush`] right before persisting so pending uploads
//! are processed and committed into serializable records.
//!
//! Attachments are moved out of the entity for the duration of each step and
//! always moved back, including on error, so a failed flush leaves the entity
//! intact for retry.
//!
//! [`on_load`]: AttachmentSubscriber::on_load
//! [`before_flush`]: AttachmentSubscriber::before_flush

use std::sync::Arc;

use affix_core::{
    AttachmentConfig, AttachmentError, AttachmentHost, AttachmentResult, StorageDriver,
};
use affix_processing::process_attachment;

use crate::registry::FieldRegistry;

pub struct AttachmentSubscriber {
    config: Arc<AttachmentConfig>,
    registry: FieldRegistry,
}

impl AttachmentSubscriber {
    pub fn new(config: Arc<AttachmentConfig>, registry: FieldRegistry) -> Self {
        AttachmentSubscriber { config, registry }
    }

    pub fn config(&self) -> &Arc<AttachmentConfig> {
        &self.config
    }

    /// Rebind storage drivers on attachments hydrated from persisted column
    /// values. Pending attachments are left untouched. The stored drive name
    /// wins; when it is no longer configured (e.g. a drive was renamed), the
    /// field's configured or default drive takes over, and `UnknownDriver`
    /// names the stored drive when nothing resolves.
    pub fn on_load(&self, entity: &mut dyn AttachmentHost) -> AttachmentResult<()> {
        let entity_name = entity.entity_name();
        for field in entity.attachment_fields() {
            let Some(mut attachment) = entity.take_attachment(field) else {
                continue;
            };
            let result = self.bind_loaded(&mut attachment, entity_name, field);
            entity.restore_attachment(field, attachment);
            result?;
        }
        Ok(())
    }

    fn bind_loaded(
        &self,
        attachment: &mut affix_core::Attachment,
        entity_name: &str,
        field: &str,
    ) -> AttachmentResult<()> {
        if !attachment.is_processed() {
            return Ok(());
        }
        let stored = attachment.drive_name()?.to_string();
        let driver = match self.config.driver(&stored) {
            Some(driver) => driver,
            None => {
                let options = self.registry.options_for(entity_name, field);
                let fallback = options
                    .driver
                    .as_deref()
                    .unwrap_or_else(|| self.config.default_driver_name());
                tracing::warn!(
                    field = %field,
                    stored_drive = %stored,
                    fallback_drive = %fallback,
                    "stored drive no longer configured, falling back"
                );
                self.config
                    .driver(fallback)
                    .ok_or(AttachmentError::UnknownDriver(stored))?
            }
        };
        attachment.bind_driver(driver);
        Ok(())
    }

    /// Process every pending attachment on the given entities. Already
    /// processed attachments are skipped, so retrying a failed flush never
    /// re-uploads what the previous attempt completed.
    pub async fn before_flush(
        &self,
        entities: &mut [&mut dyn AttachmentHost],
    ) -> AttachmentResult<()> {
        for entity in entities.iter_mut() {
            self.handle_entity(&mut **entity).await?;
        }
        Ok(())
    }

    async fn handle_entity(&self, entity: &mut dyn AttachmentHost) -> AttachmentResult<()> {
        let entity_name = entity.entity_name();
        for field in entity.attachment_fields() {
            let Some(mut attachment) = entity.take_attachment(field) else {
                continue;
            };
            if attachment.is_processed() {
                entity.restore_attachment(field, attachment);
                continue;
            }

            let options = self.registry.options_for(entity_name, field);
            let result = self
                .process_field(&mut attachment, &*entity, field, &options)
                .await;
            entity.restore_attachment(field, attachment);
            result.map_err(|err| match err {
                err @ (AttachmentError::MissingPlaceholderValue { .. }
                | AttachmentError::UnknownVariant(_)
                | AttachmentError::UnknownDriver(_)) => err,
                other => other.into_processing_failed(field),
            })?;
        }
        Ok(())
    }

    async fn process_field(
        &self,
        attachment: &mut affix_core::Attachment,
        entity: &dyn AttachmentHost,
        field: &str,
        options: &affix_core::AttachmentOptions,
    ) -> AttachmentResult<()> {
        let drive_name = options
            .driver
            .as_deref()
            .unwrap_or_else(|| self.config.default_driver_name());
        let driver: Arc<dyn StorageDriver> = self
            .config
            .driver(drive_name)
            .ok_or_else(|| AttachmentError::UnknownDriver(drive_name.to_string()))?;

        attachment.bind_driver(driver.clone());
        process_attachment(
            attachment,
            entity,
            field,
            drive_name,
            driver,
            options,
            &self.config,
        )
        .await
    }
}
