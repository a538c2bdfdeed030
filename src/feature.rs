//! Features, their attribute schema, and the vector layer they belong to.

use std::sync::Arc;

use crate::expression::Value;
use crate::geometry::Geometry;

/// Ordered attribute schema of a layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fields {
    names: Vec<String>,
}

impl Fields {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Fields {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of a field, compared case-sensitively first and then
    /// case-insensitively.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .or_else(|| self.names.iter().position(|n| n.eq_ignore_ascii_case(name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Feature identifier.
pub type FeatureId = i64;

/// One record of a vector layer: attributes plus an optional geometry.
///
/// Cloning is cheap for the schema (shared) and deep for values and
/// geometry, so a clone can take a new geometry without touching the
/// original.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    id: FeatureId,
    fields: Arc<Fields>,
    attributes: Vec<Value>,
    geometry: Option<Geometry>,
}

impl Feature {
    /// A feature with every attribute NULL and no geometry.
    pub fn new(id: FeatureId, fields: Arc<Fields>) -> Self {
        let attributes = vec![Value::Null; fields.len()];
        Feature {
            id,
            fields,
            attributes,
            geometry: None,
        }
    }

    /// A schema-less feature that only carries geometry.
    pub fn from_geometry(id: FeatureId, geometry: Geometry) -> Self {
        Feature::new(id, Arc::new(Fields::default())).with_geometry(geometry)
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn id(&self) -> FeatureId {
        self.id
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub fn set_geometry(&mut self, geometry: Option<Geometry>) {
        self.geometry = geometry;
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.fields.index_of(name).and_then(|i| self.attributes.get(i))
    }

    /// Set an attribute by field name; returns false when the field is unknown.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match self.fields.index_of(name) {
            Some(i) => {
                self.attributes[i] = value.into();
                true
            }
            None => false,
        }
    }

    pub fn attributes(&self) -> &[Value] {
        &self.attributes
    }
}

/// The vector layer a symbol is rendering for.
///
/// Symbols only keep a `Weak` handle to it, valid between `start_render`
/// and `stop_render`.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorLayer {
    pub id: String,
    pub name: String,
    pub fields: Arc<Fields>,
}

impl VectorLayer {
    pub fn new(id: impl Into<String>, name: impl Into<String>, fields: Arc<Fields>) -> Self {
        VectorLayer {
            id: id.into(),
            name: name.into(),
            fields,
        }
    }
}
