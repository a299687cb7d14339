//! Host entity integration
//!
//! The pipeline never reflects over host types. Instead, entities that carry
//! attachment fields implement [`AttachmentHost`]: a small trait giving the
//! lifecycle coordinator named access to those fields and to the stringified
//! field values referenced by `:placeholders` in folder templates.
//!
//! Fields are handed over by value (`take`/`restore`) so the pipeline can
//! hold the attachment mutably while still reading placeholder values off
//! the entity. Implementors typically back each attachment field with an
//! `Option<Attachment>`.

use crate::attachment::Attachment;

pub trait AttachmentHost: Send {
    /// Stable name used to look up registered attachment fields for this
    /// entity type (usually the type name).
    fn entity_name(&self) -> &'static str;

    /// Stringified value of the field referenced by a `:placeholder` in a
    /// folder template, or `None` when the field is absent/null.
    fn placeholder_value(&self, field: &str) -> Option<String>;

    /// Names of every attachment field on this entity, in declaration order.
    fn attachment_fields(&self) -> Vec<&'static str>;

    /// Move the attachment out of `field`, leaving the slot empty.
    fn take_attachment(&mut self, field: &str) -> Option<Attachment>;

    /// Put an attachment back into `field` after processing.
    fn restore_attachment(&mut self, field: &str, attachment: Attachment);
}
