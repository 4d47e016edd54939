//! Structured body schemas.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use crate::binder::convert_default;
use crate::error::SpecError;
use crate::types::{Constraints, ParamType};

/// One field of a structured schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub ty: ParamType,
    pub required: bool,
    pub default: Option<Value>,
    pub constraints: Constraints,
    /// Lookup key in the payload, overriding `name`.
    pub alias: Option<String>,
    pub description: Option<String>,
}

impl FieldSpec {
    /// A field that must be present in the payload.
    pub fn required(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            default: None,
            constraints: Constraints::default(),
            alias: None,
            description: None,
        }
    }

    /// A field that binds as null when absent.
    pub fn optional(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty)
        }
    }

    /// Set a default. Implies the field is optional.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Key used to find this field in the payload.
    pub fn lookup_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A named structured schema, validated at construction.
///
/// Shared between routes through `Arc`; immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    name: String,
    fields: Vec<FieldSpec>,
    strict: bool,
}

impl ObjectSchema {
    pub fn builder(name: impl Into<String>) -> ObjectSchemaBuilder {
        ObjectSchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            strict: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// When true, payload members that match no field are rejected.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Find a field by its lookup key.
    pub fn field_by_key(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.lookup_key() == key)
    }
}

/// Builder for [`ObjectSchema`].
#[derive(Debug, Clone)]
pub struct ObjectSchemaBuilder {
    name: String,
    fields: Vec<FieldSpec>,
    strict: bool,
}

impl ObjectSchemaBuilder {
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = FieldSpec>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Reject members not declared by any field.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Validate the fields and freeze the schema.
    ///
    /// Defaults are normalized to their converted form (e.g. `3.0` for an
    /// integer field becomes `3`).
    ///
    /// # Errors
    ///
    /// Returns `SpecError` for duplicate field names or lookup keys,
    /// constraints that do not apply to a field's type, contradictory
    /// required/default declarations, or defaults of the wrong type.
    pub fn build(self) -> Result<Arc<ObjectSchema>, SpecError> {
        let mut names = HashSet::new();
        let mut keys = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());

        for mut field in self.fields {
            if !names.insert(field.name.clone()) || !keys.insert(field.lookup_key().to_string())
            {
                return Err(SpecError::DuplicateField {
                    schema: self.name,
                    name: field.name,
                });
            }
            field.default = check_declaration(
                &field.name,
                &field.ty,
                field.required,
                field.default.take(),
                &field.constraints,
            )?;
            fields.push(field);
        }

        Ok(Arc::new(ObjectSchema {
            name: self.name,
            fields,
            strict: self.strict,
        }))
    }
}

/// Checks shared by body fields and request parameters.
///
/// Returns the normalized default.
pub(crate) fn check_declaration(
    name: &str,
    ty: &ParamType,
    required: bool,
    default: Option<Value>,
    constraints: &Constraints,
) -> Result<Option<Value>, SpecError> {
    constraints.check_applicable(name, ty)?;

    let Some(default) = default.filter(|d| !d.is_null()) else {
        return Ok(None);
    };
    if required {
        return Err(SpecError::RequiredWithDefault {
            name: name.to_string(),
        });
    }
    convert_default(ty, &default)
        .map(Some)
        .map_err(|message| SpecError::InvalidDefault {
            name: name.to_string(),
            message,
        })
}
