use std::path::{Path, PathBuf};

/// File-name segment that marks the main container.
pub const PERM_TOKEN: &str = ".perm.";
/// Replacement segment naming the companion payload file.
pub const TEMP_TOKEN: &str = ".temp.";

/// Everything one scan needs to know about its surroundings.
///
/// A context is built once per container and passed by reference to every stage of the
/// decode, so two scans never share state.
#[derive(Debug, Clone)]
pub struct ParseContext {
    source_path: PathBuf,
    output_dir: PathBuf,
    model_name: String,
    write_textures: bool,
    png_previews: bool,
}

impl ParseContext {
    /// Builds a context for the container at `source_path`.
    ///
    /// Textures go next to the container and the model name is the file name up to its
    /// first `.` (`chr_wei.perm.bin` becomes `chr_wei`).
    pub fn new(source_path: impl Into<PathBuf>) -> ParseContext {
        let source_path = source_path.into();

        let output_dir = source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let model_name = source_path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.split('.').next())
            .filter(|name| !name.is_empty())
            .unwrap_or("model")
            .to_string();

        ParseContext {
            source_path,
            output_dir,
            model_name,
            write_textures: true,
            png_previews: false,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> ParseContext {
        self.output_dir = dir.into();
        self
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> ParseContext {
        self.model_name = name.into();
        self
    }

    /// Turns writing `<id>.dds` files on or off. Textures are still decoded either way.
    pub fn with_texture_output(mut self, enabled: bool) -> ParseContext {
        self.write_textures = enabled;
        self
    }

    pub fn with_png_previews(mut self, enabled: bool) -> ParseContext {
        self.png_previews = enabled;
        self
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn writes_textures(&self) -> bool {
        self.write_textures
    }

    pub fn png_previews(&self) -> bool {
        self.png_previews
    }

    /// Path of the companion payload file, or `None` if the container's file name doesn't
    /// carry the `.perm.` segment.
    pub fn companion_path(&self) -> Option<PathBuf> {
        let file_name = self.source_path.file_name()?.to_str()?;

        if !file_name.contains(PERM_TOKEN) {
            return None;
        }

        Some(
            self.source_path
                .with_file_name(file_name.replacen(PERM_TOKEN, TEMP_TOKEN, 1)),
        )
    }

    /// Where the texture decoded from section `id` is written, and what face groups point at.
    pub fn texture_path(&self, id: i32) -> PathBuf {
        self.output_dir.join(format!("{}.dds", id))
    }
}
