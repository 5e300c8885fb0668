//! The transform that writes whatever it is fed to a protocol writer.
//!
//! Fed by a payload reader it transcodes; fed by a [`ValueReader`] it
//! serializes an in-memory object. Only in the latter case are optional
//! fields equal to their default left out, and only when the writer allows
//! it. Untagged writers receive schema fields only: unknown fields are
//! dropped and mismatched basic values converted to the schema type.
//!
//! [`ValueReader`]: crate::value_reader::ValueReader

use crate::bonded::{Bonded, ContainerValue, FieldValue};
use crate::error::Result;
use crate::protocol::{ContainerHeader, Reader, Writer};
use crate::schema::{Metadata, Schema};
use crate::transform::Transform;
use crate::types::DataType;

pub struct Serializer<'w, W> {
    output: &'w mut W,
    base: bool,
}

impl<'w, W: Writer> Serializer<'w, W> {
    pub fn new(output: &'w mut W) -> Self {
        Serializer { output, base: false }
    }

    fn with_base(output: &'w mut W) -> Self {
        Serializer { output, base: true }
    }

    fn write_field<R: Reader, S: Schema>(
        &mut self,
        id: u16,
        metadata: Option<&Metadata>,
        value: &mut FieldValue<'_, R, S>,
    ) -> Result<()> {
        let omittable = R::IN_MEMORY && W::MAY_OMIT_FIELDS && metadata.is_some_and(Metadata::is_optional);
        match value {
            FieldValue::Basic(v) => {
                let ty = v.data_type();
                if omittable && metadata.and_then(|md| md.default_value.to_value(ty)).as_ref() == Some(&*v) {
                    return Ok(());
                }
                self.output.write_field_begin(ty, id, metadata)?;
                self.output.write_basic(v)?;
            }
            FieldValue::Mismatched { value: v, expected } if !W::TAGGED => {
                // The slot must hold the schema type.
                match (v.clone().coerce(*expected), metadata) {
                    (Ok(coerced), _) => {
                        self.output.write_field_begin(*expected, id, metadata)?;
                        self.output.write_basic(&coerced)?;
                    }
                    (Err(_), Some(md)) => {
                        tracing::trace!(id, wire = ?v.data_type(), ?expected, "writing default for mismatched field");
                        return self.output.write_field_omitted(*expected, id, md);
                    }
                    (Err(err), None) => return Err(err),
                }
            }
            FieldValue::Mismatched { value: v, .. } => {
                self.output.write_field_begin(v.data_type(), id, metadata)?;
                self.output.write_basic(v)?;
            }
            FieldValue::Struct(bonded) => {
                self.output.write_field_begin(DataType::Struct, id, metadata)?;
                bonded.apply(&mut Serializer::new(&mut *self.output))?;
            }
            FieldValue::Container(container) => {
                let header = container.begin()?;
                if omittable && header.len == 0 {
                    return container.end();
                }
                self.output.write_field_begin(header.kind, id, metadata)?;
                self.transfer_container(container, header)?;
            }
        }
        self.output.write_field_end()
    }

    fn transfer_container<R: Reader, S: Schema>(
        &mut self,
        container: &mut ContainerValue<'_, R, S>,
        header: ContainerHeader,
    ) -> Result<()> {
        self.output.write_container_begin(&header)?;
        for _ in 0..header.len {
            if header.key.is_some() {
                self.transfer_value(&mut container.key()?)?;
            }
            self.transfer_value(&mut container.element()?)?;
        }
        container.end()?;
        self.output.write_container_end()
    }

    fn transfer_value<R: Reader, S: Schema>(&mut self, value: &mut FieldValue<'_, R, S>) -> Result<()> {
        match value {
            FieldValue::Basic(v) | FieldValue::Mismatched { value: v, .. } => self.output.write_basic(v),
            FieldValue::Struct(bonded) => bonded.apply(&mut Serializer::new(&mut *self.output)).map(drop),
            FieldValue::Container(container) => {
                let header = container.begin()?;
                self.transfer_container(container, header)
            }
        }
    }
}

impl<W: Writer> Transform for Serializer<'_, W> {
    fn begin(&mut self, metadata: &Metadata) -> Result<()> {
        self.output.write_struct_begin(metadata, self.base)
    }

    fn end(&mut self) -> Result<()> {
        self.output.write_struct_end(self.base)
    }

    fn unknown_end(&mut self) -> Result<()> {
        if !W::TAGGED {
            return Ok(());
        }
        self.output.write_struct_end(true)
    }

    fn base<R: Reader, S: Schema>(&mut self, value: &mut Bonded<'_, R, S>) -> Result<bool> {
        value.apply(&mut Serializer::with_base(&mut *self.output))
    }

    fn field<R: Reader, S: Schema>(
        &mut self,
        id: u16,
        metadata: &Metadata,
        value: &mut FieldValue<'_, R, S>,
    ) -> Result<bool> {
        self.write_field(id, Some(metadata), value)?;
        Ok(false)
    }

    fn unknown_field<R: Reader, S: Schema>(&mut self, id: u16, value: &mut FieldValue<'_, R, S>) -> Result<bool> {
        if W::TAGGED {
            self.write_field(id, None, value)?;
        } else {
            tracing::trace!(id, "dropping unknown field for untagged output");
        }
        Ok(false)
    }

    fn omitted_field(&mut self, id: u16, metadata: &Metadata, ty: DataType) -> Result<bool> {
        self.output.write_field_omitted(ty, id, metadata)?;
        Ok(false)
    }
}

/// A [`Serializer`] that precedes the payload with the protocol header.
pub struct Marshaler<'w, W> {
    inner: Serializer<'w, W>,
    started: bool,
}

impl<'w, W: Writer> Marshaler<'w, W> {
    pub fn new(output: &'w mut W) -> Self {
        Marshaler { inner: Serializer::new(output), started: false }
    }
}

impl<W: Writer> Transform for Marshaler<'_, W> {
    fn begin(&mut self, metadata: &Metadata) -> Result<()> {
        if !self.started {
            self.started = true;
            self.inner.output.write_version()?;
        }
        self.inner.begin(metadata)
    }

    fn end(&mut self) -> Result<()> {
        self.inner.end()
    }

    fn unknown_end(&mut self) -> Result<()> {
        self.inner.unknown_end()
    }

    fn base<R: Reader, S: Schema>(&mut self, value: &mut Bonded<'_, R, S>) -> Result<bool> {
        self.inner.base(value)
    }

    fn field<R: Reader, S: Schema>(
        &mut self,
        id: u16,
        metadata: &Metadata,
        value: &mut FieldValue<'_, R, S>,
    ) -> Result<bool> {
        self.inner.field(id, metadata, value)
    }

    fn unknown_field<R: Reader, S: Schema>(&mut self, id: u16, value: &mut FieldValue<'_, R, S>) -> Result<bool> {
        self.inner.unknown_field(id, value)
    }

    fn omitted_field(&mut self, id: u16, metadata: &Metadata, ty: DataType) -> Result<bool> {
        self.inner.omitted_field(id, metadata, ty)
    }
}
