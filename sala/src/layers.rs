use crate::error::{Result, SalaError};
use crate::persist::{read_bool, read_string, write_bool, write_string};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Read, Write};

/// Bitmask of layer memberships; layer `i` owns bit `i`.
pub type LayerKey = u64;

pub const MAX_LAYERS: usize = 64;
pub const EVERYTHING: &str = "Everything";

/// Named visibility layers. Layer 0 ("Everything") always exists and every
/// row belongs to it.
#[derive(Clone, Debug, Serialize)]
pub struct LayerManager {
    names: Vec<String>,
    #[serde(skip)]
    lookup: HashMap<String, usize>,
    visible: LayerKey,
}

impl Default for LayerManager {
    fn default() -> Self { Self::new() }
}

impl LayerManager {
    pub fn new() -> Self {
        let mut lookup = HashMap::new();
        lookup.insert(EVERYTHING.to_string(), 0);
        LayerManager { names: vec![EVERYTHING.to_string()], lookup, visible: 1 }
    }

    /// Add a layer, returning its index. New layers start visible.
    pub fn add_layer(&mut self, name: &str) -> Result<usize> {
        if self.lookup.contains_key(name) {
            return Err(SalaError::DuplicateLayer(name.to_string()));
        }
        let index = self.names.len();
        if index >= MAX_LAYERS {
            return Err(SalaError::OutOfLayers);
        }
        self.names.push(name.to_string());
        self.lookup.insert(name.to_string(), index);
        self.visible |= 1 << index;
        Ok(index)
    }

    #[inline] pub fn num_layers(&self) -> usize { self.names.len() }
    pub fn layer_index(&self, name: &str) -> Option<usize> { self.lookup.get(name).copied() }
    pub fn layer_name(&self, index: usize) -> Option<&str> { self.names.get(index).map(String::as_str) }
    #[inline] pub fn visible_mask(&self) -> LayerKey { self.visible }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.names.len() { Ok(()) } else { Err(SalaError::UnknownLayer(index)) }
    }

    pub fn key(&self, index: usize) -> Result<LayerKey> {
        self.check_index(index)?;
        Ok(1 << index)
    }

    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        let k = self.key(index)?;
        if visible { self.visible |= k } else { self.visible &= !k }
        Ok(())
    }

    pub fn is_layer_visible(&self, index: usize) -> Result<bool> {
        Ok(self.visible & self.key(index)? != 0)
    }

    /// A combined membership key is visible only if every layer in it is
    /// visible. The empty key is never visible.
    #[inline]
    pub fn is_visible(&self, key: LayerKey) -> bool {
        key != 0 && key & !self.visible == 0
    }

    /// Layer count, then one (name, bit, visible) triple per layer.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32::<LittleEndian>(self.names.len() as u32)?;
        for (i, name) in self.names.iter().enumerate() {
            write_string(w, name)?;
            w.write_u32::<LittleEndian>(i as u32)?;
            write_bool(w, self.visible & (1 << i) != 0)?;
        }
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let count = r.read_u32::<LittleEndian>()? as usize;
        if count == 0 || count > MAX_LAYERS {
            return Err(SalaError::Format(format!("layer count {} out of range", count)));
        }
        let mut names = Vec::with_capacity(count);
        let mut lookup = HashMap::with_capacity(count);
        let mut visible: LayerKey = 0;
        for i in 0..count {
            let name = read_string(r)?;
            let bit = r.read_u32::<LittleEndian>()? as usize;
            if bit != i {
                return Err(SalaError::Format(format!("layer {} stored with bit {}", i, bit)));
            }
            if read_bool(r)? {
                visible |= 1 << i;
            }
            if lookup.insert(name.clone(), i).is_some() {
                return Err(SalaError::DuplicateLayer(name));
            }
            names.push(name);
        }
        Ok(LayerManager { names, lookup, visible })
    }
}
