use std::collections::HashMap;

use oci_spec::image::Descriptor;

/// Layer metadata as listed by an image manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDescriptor
{
    pub digest: String,
    pub media_type: String,
    pub size: u64,
    pub annotations: HashMap<String, String>,
}

impl LayerDescriptor
{
    pub fn has_annotation(&self, key: &str, value: &str) -> bool
    {
        self.annotations.get(key).is_some_and(|v| v == value)
    }
}

impl From<&Descriptor> for LayerDescriptor
{
    fn from(descriptor: &Descriptor) -> Self
    {
        LayerDescriptor {
            digest: descriptor.digest().to_string(),
            media_type: descriptor.media_type().to_string(),
            size: u64::try_from(descriptor.size().to_owned()).unwrap_or_default(),
            annotations: descriptor.annotations().clone().unwrap_or_default(),
        }
    }
}

/// Layers annotated with exactly `key` = `value`, in manifest order.
pub fn select_layers<'a>(layers: &'a [LayerDescriptor], key: &str, value: &str) -> Vec<&'a LayerDescriptor>
{
    layers
        .iter()
        .filter(|layer| layer.has_annotation(key, value))
        .collect()
}
