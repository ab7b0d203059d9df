//! JSON form of a descriptor
//!
//! The output is pretty-printed with a trailing newline, and field order
//! follows [`PluginDescriptor`]'s declaration order.

use std::io::Write;

use crate::errors::DescriptorError;
use crate::types::PluginDescriptor;

/// Render a descriptor exactly as it is written to disk
pub fn to_json(descriptor: &PluginDescriptor) -> Result<String, DescriptorError> {
    let mut json = serde_json::to_string_pretty(descriptor)?;
    json.push('\n');
    Ok(json)
}

pub fn write_descriptor<W: Write>(
    descriptor: &PluginDescriptor,
    mut sink: W,
) -> Result<(), DescriptorError> {
    let json = to_json(descriptor)?;
    sink.write_all(json.as_bytes())?;
    sink.flush()?;
    Ok(())
}
