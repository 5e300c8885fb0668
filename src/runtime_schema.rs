//! Runtime schemas: a schema-definition document ingested once and then
//! walked through borrowed [`RuntimeSchema`] views.
//!
//! The document shape follows the usual `SchemaDef` layout: a flat list of
//! struct definitions referenced by index, plus the root type. It is loaded
//! from JSON with serde; [`SchemaDef::from_static`] derives one from a
//! compile-time schema.

use crate::error::{CoreError, Result};
use crate::reflection::{StaticSchema, StaticStruct, StaticType};
use crate::schema::{FieldDescriptor, Metadata, Schema};
use crate::types::{DataType, TypeClass, INVALID_FIELD_ID};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    pub structs: Vec<StructDef>,
    pub root: TypeDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_def: Option<TypeDef>,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub id: u16,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(rename = "type")]
    pub type_def: TypeDef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub id: DataType,
    /// Index into `SchemaDef::structs` when `id` is `Struct`.
    #[serde(default)]
    pub struct_def: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<Box<TypeDef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Box<TypeDef>>,
}

impl TypeDef {
    pub const fn basic(id: DataType) -> Self {
        TypeDef { id, struct_def: 0, element: None, key: None }
    }

    pub const fn structure(index: u16) -> Self {
        TypeDef { id: DataType::Struct, struct_def: index, element: None, key: None }
    }

    pub fn list(element: TypeDef) -> Self {
        TypeDef { element: Some(Box::new(element)), ..TypeDef::basic(DataType::List) }
    }

    pub fn set(element: TypeDef) -> Self {
        TypeDef { element: Some(Box::new(element)), ..TypeDef::basic(DataType::Set) }
    }

    pub fn map(key: TypeDef, value: TypeDef) -> Self {
        TypeDef {
            key: Some(Box::new(key)),
            element: Some(Box::new(value)),
            ..TypeDef::basic(DataType::Map)
        }
    }
}

static UNKNOWN_STRUCT_DEF: StructDef = StructDef {
    metadata: Metadata::structure("Unknown", "Unknown"),
    base_def: None,
    fields: Vec::new(),
};

static EMPTY_SCHEMA_DEF: SchemaDef = SchemaDef { structs: Vec::new(), root: TypeDef::structure(0) };

impl SchemaDef {
    /// Build and validate. Fields of every struct are sorted by id.
    pub fn new(structs: Vec<StructDef>, root: TypeDef) -> Result<Self> {
        let mut def = SchemaDef { structs, root };
        def.normalize()?;
        Ok(def)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let mut def: SchemaDef = serde_json::from_str(s)?;
        def.normalize()?;
        tracing::debug!(
            structs = def.structs.len(),
            root = %def.root_struct().metadata.qualified_name,
            "loaded schema definition"
        );
        Ok(def)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        SchemaDef::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Runtime description of a compile-time schema and everything it
    /// references.
    pub fn from_static(schema: StaticSchema) -> SchemaDef {
        let mut importer = StaticImporter::default();
        let root = importer.import_struct(schema.definition());
        SchemaDef { structs: importer.structs, root: TypeDef::structure(root) }
    }

    pub fn root(&self) -> RuntimeSchema<'_> {
        RuntimeSchema::root(self)
    }

    fn root_struct(&self) -> &StructDef {
        self.structs.get(self.root.struct_def as usize).unwrap_or(&UNKNOWN_STRUCT_DEF)
    }

    fn normalize(&mut self) -> Result<()> {
        if self.root.id != DataType::Struct {
            return Err(CoreError::Schema(format!("root type must be a struct, found {:?}", self.root.id)));
        }
        self.check_type(&self.root)?;
        for s in &mut self.structs {
            s.fields.sort_by_key(|f| f.id);
        }
        for (index, s) in self.structs.iter().enumerate() {
            if let Some(base) = &s.base_def {
                if base.id != DataType::Struct {
                    return Err(CoreError::Schema(format!(
                        "base of {} is not a struct",
                        s.metadata.qualified_name
                    )));
                }
                self.check_type(base)?;
            }
            let mut previous = None;
            for f in &s.fields {
                if f.id == INVALID_FIELD_ID {
                    return Err(CoreError::Schema(format!(
                        "field id 0xffff is reserved ({})",
                        s.metadata.qualified_name
                    )));
                }
                if previous == Some(f.id) {
                    return Err(CoreError::Schema(format!(
                        "duplicate field id {} in {}",
                        f.id, s.metadata.qualified_name
                    )));
                }
                previous = Some(f.id);
                self.check_type(&f.type_def)?;
            }
            self.check_hierarchy(index)?;
        }
        Ok(())
    }

    fn check_type(&self, ty: &TypeDef) -> Result<()> {
        match ty.id.class() {
            TypeClass::Basic | TypeClass::String => Ok(()),
            TypeClass::Marker => Err(CoreError::Schema(format!("{:?} is not a field type", ty.id))),
            TypeClass::Struct => {
                if (ty.struct_def as usize) < self.structs.len() {
                    Ok(())
                } else {
                    Err(CoreError::Schema(format!("struct index {} out of range", ty.struct_def)))
                }
            }
            TypeClass::Container => {
                let element = ty
                    .element
                    .as_deref()
                    .ok_or_else(|| CoreError::Schema(format!("{:?} without element type", ty.id)))?;
                self.check_type(element)?;
                match (ty.id, ty.key.as_deref()) {
                    (DataType::Map, Some(key)) => self.check_type(key),
                    (DataType::Map, None) => Err(CoreError::Schema("map without key type".into())),
                    _ => Ok(()),
                }
            }
        }
    }

    fn check_hierarchy(&self, start: usize) -> Result<()> {
        let mut current = start;
        for _ in 0..=self.structs.len() {
            match self.structs.get(current).and_then(|s| s.base_def.as_ref()) {
                Some(base) => current = base.struct_def as usize,
                None => return Ok(()),
            }
        }
        Err(CoreError::Schema(format!(
            "inheritance cycle through {}",
            self.structs[start].metadata.qualified_name
        )))
    }
}

#[derive(Default)]
struct StaticImporter {
    structs: Vec<StructDef>,
    index: HashMap<*const StaticStruct, u16>,
}

impl StaticImporter {
    fn import_struct(&mut self, s: &'static StaticStruct) -> u16 {
        let key = s as *const StaticStruct;
        if let Some(index) = self.index.get(&key) {
            return *index;
        }
        let index = self.structs.len() as u16;
        self.index.insert(key, index);
        self.structs.push(StructDef { metadata: s.metadata.clone(), base_def: None, fields: Vec::new() });

        let base_def = s.base.map(|base| TypeDef::structure(self.import_struct(base())));
        let mut fields = Vec::with_capacity(s.fields.len());
        for f in s.fields {
            fields.push(FieldDef { id: f.id, metadata: f.metadata.clone(), type_def: self.import_type(f.ty) });
        }
        let slot = &mut self.structs[index as usize];
        slot.base_def = base_def;
        slot.fields = fields;
        index
    }

    fn import_type(&mut self, ty: &'static StaticType) -> TypeDef {
        match ty {
            StaticType::Basic(dt) => TypeDef::basic(*dt),
            StaticType::Struct(s) => TypeDef::structure(self.import_struct(s())),
            StaticType::List(e) => TypeDef::list(self.import_type(e)),
            StaticType::Set(e) => TypeDef::set(self.import_type(e)),
            StaticType::Map(k, v) => {
                let key = self.import_type(k);
                TypeDef::map(key, self.import_type(v))
            }
        }
    }
}

/// Borrowed view of one struct level of a [`SchemaDef`].
#[derive(Clone, Copy)]
pub struct RuntimeSchema<'a> {
    def: &'a SchemaDef,
    strukt: &'a StructDef,
}

/// Borrowed view of a type inside a [`SchemaDef`].
#[derive(Clone, Copy)]
pub struct RuntimeType<'a> {
    def: &'a SchemaDef,
    ty: &'a TypeDef,
}

impl<'a> RuntimeSchema<'a> {
    pub fn root(def: &'a SchemaDef) -> Self {
        RuntimeSchema { def, strukt: def.root_struct() }
    }

    fn at(def: &'a SchemaDef, index: u16) -> Self {
        RuntimeSchema { def, strukt: def.structs.get(index as usize).unwrap_or(&UNKNOWN_STRUCT_DEF) }
    }

    pub fn struct_def(&self) -> &'a StructDef {
        self.strukt
    }
}

impl<'a> RuntimeType<'a> {
    pub fn type_def(&self) -> &'a TypeDef {
        self.ty
    }
}

impl fmt::Debug for RuntimeSchema<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RuntimeSchema").field(&self.strukt.metadata.qualified_name).finish()
    }
}

impl fmt::Debug for RuntimeType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.ty, f)
    }
}

impl<'a> Schema for RuntimeSchema<'a> {
    type Type = RuntimeType<'a>;

    fn metadata(&self) -> &Metadata {
        &self.strukt.metadata
    }

    fn field_count(&self) -> usize {
        self.strukt.fields.len()
    }

    fn field(&self, index: usize) -> FieldDescriptor<'_, Self::Type> {
        let f = &self.strukt.fields[index];
        FieldDescriptor { id: f.id, metadata: &f.metadata, ty: RuntimeType { def: self.def, ty: &f.type_def } }
    }

    fn base(&self) -> Option<Self> {
        self.strukt.base_def.as_ref().map(|b| RuntimeSchema::at(self.def, b.struct_def))
    }

    fn unknown() -> Self {
        RuntimeSchema { def: &EMPTY_SCHEMA_DEF, strukt: &UNKNOWN_STRUCT_DEF }
    }

    fn data_type(ty: Self::Type) -> DataType {
        ty.ty.id
    }

    fn nested(ty: Self::Type) -> Option<Self> {
        (ty.ty.id == DataType::Struct).then(|| RuntimeSchema::at(ty.def, ty.ty.struct_def))
    }

    fn element(ty: Self::Type) -> Option<Self::Type> {
        ty.ty.element.as_deref().map(|e| RuntimeType { def: ty.def, ty: e })
    }

    fn key(ty: Self::Type) -> Option<Self::Type> {
        ty.ty.key.as_deref().map(|k| RuntimeType { def: ty.def, ty: k })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DefaultValue, Modifier};

    fn field(id: u16, name: &'static str, type_def: TypeDef) -> FieldDef {
        FieldDef { id, metadata: Metadata::field(name, Modifier::Optional, DefaultValue::Nothing), type_def }
    }

    fn strukt(name: &'static str, fields: Vec<FieldDef>) -> StructDef {
        StructDef { metadata: Metadata::structure(name, name), base_def: None, fields }
    }

    #[test]
    fn fields_sorted_on_build() {
        let def = SchemaDef::new(
            vec![strukt("S", vec![field(5, "b", TypeDef::basic(DataType::Int32)), field(1, "a", TypeDef::basic(DataType::Bool))])],
            TypeDef::structure(0),
        )
        .expect("valid");
        let root = def.root();
        assert_eq!(root.field(0).id, 1);
        assert_eq!(root.field(1).id, 5);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = SchemaDef::new(
            vec![strukt("S", vec![field(2, "a", TypeDef::basic(DataType::Int32)), field(2, "b", TypeDef::basic(DataType::Int8))])],
            TypeDef::structure(0),
        )
        .expect_err("duplicate ids");
        assert!(matches!(err, CoreError::Schema(_)));
    }

    #[test]
    fn rejects_reserved_id_and_bad_index() {
        assert!(SchemaDef::new(
            vec![strukt("S", vec![field(0xFFFF, "a", TypeDef::basic(DataType::Int32))])],
            TypeDef::structure(0)
        )
        .is_err());
        assert!(SchemaDef::new(
            vec![strukt("S", vec![field(1, "a", TypeDef::structure(4))])],
            TypeDef::structure(0)
        )
        .is_err());
        assert!(SchemaDef::new(
            vec![strukt("S", vec![field(1, "a", TypeDef::basic(DataType::List))])],
            TypeDef::structure(0)
        )
        .is_err());
    }

    #[test]
    fn rejects_inheritance_cycle() {
        let mut a = strukt("A", vec![]);
        a.base_def = Some(TypeDef::structure(1));
        let mut b = strukt("B", vec![]);
        b.base_def = Some(TypeDef::structure(0));
        assert!(SchemaDef::new(vec![a, b], TypeDef::structure(0)).is_err());
    }

    #[test]
    fn navigates_nested_and_base() {
        let mut derived = strukt("D", vec![field(1, "items", TypeDef::list(TypeDef::structure(2)))]);
        derived.base_def = Some(TypeDef::structure(1));
        let def = SchemaDef::new(
            vec![derived, strukt("B", vec![field(0, "x", TypeDef::basic(DataType::UInt8))]), strukt("E", vec![])],
            TypeDef::structure(0),
        )
        .expect("valid");
        let root = def.root();
        assert_eq!(root.base().expect("base").metadata().name, "B");
        let items = root.field(0).ty;
        assert_eq!(RuntimeSchema::data_type(items), DataType::List);
        let element = RuntimeSchema::element(items).expect("element");
        assert_eq!(RuntimeSchema::nested(element).expect("struct").metadata().name, "E");
        assert_eq!(RuntimeSchema::unknown().field_count(), 0);
    }
}
