//! Layer factories keyed by type name

use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{SymbolError, suggest};

use super::SymbolType;
use super::fill::{self, SimpleFillLayer};
use super::generator::{self, GeometryGeneratorLayer};
use super::layer::SymbolLayer;
use super::line::{self, SimpleLineLayer};
use super::marker::{self, SimpleMarkerLayer};
use super::props::PropertyMap;

/// Builds a layer from its serialized properties.
pub type LayerFactory = fn(&PropertyMap) -> Box<dyn SymbolLayer>;

/// Registry entry for one layer type.
#[derive(Clone, Copy)]
pub struct LayerMetadata {
    pub name: &'static str,
    pub symbol_type: SymbolType,
    pub factory: LayerFactory,
}

impl fmt::Debug for LayerMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerMetadata")
            .field("name", &self.name)
            .field("symbol_type", &self.symbol_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolLayerRegistry {
    entries: BTreeMap<&'static str, LayerMetadata>,
}

impl SymbolLayerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in simple layers and the geometry generator.
    pub fn with_defaults() -> Self {
        let mut registry = SymbolLayerRegistry::new();
        registry.register(marker::LAYER_TYPE, SymbolType::Marker, |props| {
            Box::new(SimpleMarkerLayer::create(props))
        });
        registry.register(line::LAYER_TYPE, SymbolType::Line, |props| {
            Box::new(SimpleLineLayer::create(props))
        });
        registry.register(fill::LAYER_TYPE, SymbolType::Fill, |props| {
            Box::new(SimpleFillLayer::create(props))
        });
        registry.register(generator::LAYER_TYPE, SymbolType::Hybrid, |props| {
            Box::new(GeometryGeneratorLayer::create(props))
        });
        registry
    }

    /// Add or replace a layer type. Returns `true` if the name was new.
    pub fn register(&mut self, name: &'static str, symbol_type: SymbolType, factory: LayerFactory) -> bool {
        self.entries
            .insert(
                name,
                LayerMetadata {
                    name,
                    symbol_type,
                    factory,
                },
            )
            .is_none()
    }

    pub fn metadata(&self, name: &str) -> Option<&LayerMetadata> {
        self.entries.get(name)
    }

    pub fn create_layer(&self, name: &str, props: &PropertyMap) -> Result<Box<dyn SymbolLayer>, SymbolError> {
        match self.entries.get(name) {
            Some(meta) => Ok((meta.factory)(props)),
            None => Err(SymbolError::UnknownLayerType {
                name: name.to_string(),
                suggestion: suggest(name, self.entries.keys().copied()),
            }),
        }
    }

    /// Registered names for one symbol kind, in name order.
    pub fn layer_types(&self, symbol_type: SymbolType) -> Vec<&'static str> {
        self.entries
            .values()
            .filter(|meta| meta.symbol_type == symbol_type)
            .map(|meta| meta.name)
            .collect()
    }

    /// Default layer for a symbol kind, built from empty properties.
    pub fn default_layer(&self, symbol_type: SymbolType) -> Option<Box<dyn SymbolLayer>> {
        let name = match symbol_type {
            SymbolType::Marker => marker::LAYER_TYPE,
            SymbolType::Line => line::LAYER_TYPE,
            SymbolType::Fill => fill::LAYER_TYPE,
            SymbolType::Hybrid => generator::LAYER_TYPE,
        };
        self.create_layer(name, &PropertyMap::new()).ok()
    }
}
