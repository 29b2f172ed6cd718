use std::{collections::HashMap, sync::Arc, sync::Mutex};

/// A parsed font descriptor: `"Family N"` where N is the pixel size.
///
/// Descriptors come in as opaque strings from the settings layer; parsing
/// keeps the exact input around as the cache key.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FontSpec {
    pub descriptor: String,
    pub family: String,
    pub size_px: f32,
}

pub const DEFAULT_FONT_SIZE: f32 = 8.0;

impl FontSpec {
    pub fn parse(descriptor: &str) -> Self {
        let trimmed = descriptor.trim();
        if trimmed.is_empty() {
            return Self {
                descriptor: descriptor.to_string(),
                family: String::new(),
                size_px: DEFAULT_FONT_SIZE,
            };
        }

        let (family, size_px) = match trimmed.rsplit_once(' ') {
            Some((family, size)) => match size.parse::<f32>() {
                Ok(px) if px.is_finite() && px > 0.0 => (family.to_string(), px),
                _ => (trimmed.to_string(), DEFAULT_FONT_SIZE),
            },
            None => (trimmed.to_string(), DEFAULT_FONT_SIZE),
        };

        Self {
            descriptor: descriptor.to_string(),
            family,
            size_px,
        }
    }
}

/// Caches parsed font specs by their exact descriptor string, so repeated
/// per-frame lookups skip the parse. Owned by the rendering context and
/// injected into the engines; no eviction.
#[derive(Debug, Default)]
pub struct FontCache {
    specs: Mutex<HashMap<String, Arc<FontSpec>>>,
}

impl FontCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, descriptor: &str) -> Arc<FontSpec> {
        let mut specs = self.specs.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(spec) = specs.get(descriptor) {
            return Arc::clone(spec);
        }
        let spec = Arc::new(FontSpec::parse(descriptor));
        specs.insert(descriptor.to_string(), Arc::clone(&spec));
        spec
    }

    pub fn len(&self) -> usize {
        self.specs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
