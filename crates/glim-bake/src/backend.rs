use glim_scene::TextureId;

/// Pixel layout the backend expects from the baker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgb,
    /// Four bytes per pixel; the baker forces the alpha byte to 255.
    Rgba,
}

/// Render-system boundary: allocate a texture from raw pixel bytes and
/// refresh it on re-composition. The baker serializes every call behind a
/// mutex because real backends are also reachable from non-bake code.
pub trait TextureBackend: Send {
    fn format(&self) -> TextureFormat {
        TextureFormat::Rgb
    }

    /// Uploads a new texture; `pixels` is `width * height` pixels in the
    /// layout reported by [`TextureBackend::format`].
    fn create_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> TextureId;

    /// Replaces the pixels of a texture previously created by this backend.
    fn update_texture(&mut self, id: TextureId, width: u32, height: u32, pixels: &[u8]);
}
