use bytemuck::{Pod, Zeroable};

/// Per-keyword render data read by the presenter from linear memory.
/// Must match the presenter protocol: 12 floats = 48 bytes stride.
///
/// Keywords are billboards: the presenter orients each quad with the camera
/// orientation, then applies `spin` about the quad's own Y axis.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct KeywordInstance {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Uniform scale (1.0 = base glyph size).
    pub scale: f32,
    /// Opacity (0.0 = invisible, 1.0 = opaque).
    pub opacity: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    /// Extra rotation about the billboard's Y axis in radians.
    pub spin: f32,
    /// Index into the word table announced to the presenter.
    pub word: f32,
    /// Interaction state tag.
    pub state: f32,
    pub _pad: f32,
}

impl KeywordInstance {
    pub const FLOATS: usize = 12;
    pub const STRIDE_BYTES: usize = Self::FLOATS * 4;
}

/// Screen-space overlay element (sentence glyphs, titles, panels, overlays).
/// 8 floats = 32 bytes stride. Offsets are in CSS pixels from the element's
/// laid-out position.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct ElementInstance {
    /// Element handle announced in the `element_created` message.
    pub id: f32,
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub opacity: f32,
    /// Rotation in radians.
    pub rotation: f32,
    pub kind: f32,
    pub _pad: f32,
}

impl ElementInstance {
    pub const FLOATS: usize = 8;
    pub const STRIDE_BYTES: usize = Self::FLOATS * 4;
}

/// Flat, reusable instance buffer.
pub struct InstanceBuffer<T: Pod> {
    pub instances: Vec<T>,
}

impl<T: Pod> InstanceBuffer<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            instances: Vec::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }

    pub fn push(&mut self, instance: T) {
        self.instances.push(instance);
    }

    pub fn instance_count(&self) -> u32 {
        self.instances.len() as u32
    }

    /// Raw pointer to instance data for presenter reads.
    pub fn instances_ptr(&self) -> *const f32 {
        self.instances.as_ptr() as *const f32
    }

    /// Instance data as plain floats.
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.instances)
    }
}

impl<T: Pod> Default for InstanceBuffer<T> {
    fn default() -> Self {
        Self::with_capacity(512)
    }
}

/// Keyword billboards for the current frame.
pub type RenderBuffer = InstanceBuffer<KeywordInstance>;

/// Overlay elements for the current frame.
pub type ElementBuffer = InstanceBuffer<ElementInstance>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_match_protocol() {
        assert_eq!(std::mem::size_of::<KeywordInstance>(), KeywordInstance::STRIDE_BYTES);
        assert_eq!(std::mem::size_of::<ElementInstance>(), ElementInstance::STRIDE_BYTES);
    }

    #[test]
    fn buffer_exposes_flat_floats() {
        let mut buf = RenderBuffer::with_capacity(4);
        buf.push(KeywordInstance { x: 1.0, opacity: 0.6, ..Default::default() });
        buf.push(KeywordInstance { y: 2.0, ..Default::default() });
        assert_eq!(buf.instance_count(), 2);
        let floats = buf.as_floats();
        assert_eq!(floats.len(), 24);
        assert_eq!(floats[0], 1.0);
        assert_eq!(floats[4], 0.6);
        assert_eq!(floats[13], 2.0);
        buf.clear();
        assert_eq!(buf.instance_count(), 0);
    }
}
