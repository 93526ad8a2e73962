pub(crate) mod d3d;

pub(crate) mod images;

pub mod asset;
pub mod context;
pub mod cursor;
pub mod error;
pub mod export;
pub mod section;

use std::{fs, sync::Arc};

pub use context::ParseContext;
pub use d3d::CompressedFormat;
pub use error::{DecodeError, DecodeResult, Diagnostic, DiagnosticKind};

use crate::{
    asset::{
        BoneTable, ExtractedTexture, MaterialTable, Mesh, MeshAssembler, StreamTable,
        texture::extract_texture,
    },
    section::{SectionBody, SectionHeader, SectionScanner},
};

/// Everything decoded from one perm container.
#[derive(Debug)]
pub struct PermFile {
    meshes: Vec<Mesh>,
    bones: Arc<BoneTable>,
    textures: Vec<ExtractedTexture>,
    diagnostics: Vec<Diagnostic>,
    section_count: usize,
}

impl PermFile {
    /**
    Reads and decodes the container named by the context.

    # Errors
    - [`DecodeError::File`] when the container can't be read
    - any fatal error of [`PermFile::from_bytes`]

    # Examples
    ```no_run
    use permbin::{ParseContext, PermFile};

    let ctx = ParseContext::new("./chr_wei.perm.bin");
    let perm = PermFile::open(&ctx).expect("Unable to decode container.");

    for mesh in perm.meshes() {
        println!("{}: {} vertices", mesh.name(), mesh.vertex_count());
    }
    ```
    */
    pub fn open(ctx: &ParseContext) -> DecodeResult<PermFile> {
        let bytes = fs::read(ctx.source_path())
            .map_err(|e| DecodeError::File(ctx.source_path().to_path_buf(), e))?;

        PermFile::from_bytes(&bytes, ctx)
    }

    /**
    Decodes a container that is already in memory.

    Sections are handled strictly in file order, so a mesh-info record can only use the
    streams and materials declared before it. Problems with a single record or section are
    logged, kept in [`PermFile::diagnostics`] and skipped.

    # Errors
    - [`DecodeError::Truncated`] when a read runs past the end of `bytes`, including stray
      trailing bytes after the last section
    - [`DecodeError::MalformedSection`] when a section header points outside `bytes`
    */
    pub fn from_bytes(bytes: &[u8], ctx: &ParseContext) -> DecodeResult<PermFile> {
        let mut scan = Scan {
            ctx,
            bytes,
            streams: StreamTable::default(),
            materials: MaterialTable::default(),
            bones: BoneTable::default(),
            assembler: MeshAssembler::new(),
            textures: Vec::new(),
            diagnostics: Vec::new(),
        };

        let mut scanner = SectionScanner::new(bytes);
        let mut section_count = 0;

        while let Some(section) = scanner.next_section()? {
            section_count += 1;

            let result = section
                .body
                .and_then(|body| scan.apply(&section.header, body));

            if let Err(e) = result {
                if e.is_fatal() {
                    return Err(e);
                }
                scan.report(&section.header, None, e);
            }
        }

        let bones = Arc::new(scan.bones);
        let meshes = scan.assembler.finish(Arc::clone(&bones));

        tracing::info!(
            "decoded {} meshes, {} bones and {} textures from {} sections ({} skipped)",
            meshes.len(),
            bones.len(),
            scan.textures.len(),
            section_count,
            scan.diagnostics.len()
        );

        Ok(PermFile {
            meshes,
            bones,
            textures: scan.textures,
            diagnostics: scan.diagnostics,
            section_count,
        })
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn into_meshes(self) -> Vec<Mesh> {
        self.meshes
    }

    pub fn bones(&self) -> &Arc<BoneTable> {
        &self.bones
    }

    pub fn textures(&self) -> &[ExtractedTexture] {
        &self.textures
    }

    /// Every record or section that was skipped, and why.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn section_count(&self) -> usize {
        self.section_count
    }
}

/// State owned by one pass over a container.
struct Scan<'a> {
    ctx: &'a ParseContext,
    bytes: &'a [u8],
    streams: StreamTable,
    materials: MaterialTable,
    bones: BoneTable,
    assembler: MeshAssembler,
    textures: Vec<ExtractedTexture>,
    diagnostics: Vec<Diagnostic>,
}

impl Scan<'_> {
    fn apply(&mut self, header: &SectionHeader, body: SectionBody) -> DecodeResult<()> {
        let id = header.section_id();

        match body {
            SectionBody::Stream(entry) => self.streams.insert(id, entry)?,
            SectionBody::Material(binding) => self.materials.insert(id, binding),
            SectionBody::Skeleton(bones) => self.bones.extend(bones),
            SectionBody::Texture(descriptor) => {
                let texture = extract_texture(self.ctx, id, &descriptor)?;
                self.textures.push(texture);
            }
            SectionBody::MeshInfo(records) => {
                for (m, record) in records.into_iter().enumerate() {
                    let result = record.and_then(|record| {
                        self.assembler.add_record(
                            self.ctx,
                            self.bytes,
                            &self.streams,
                            &self.materials,
                            &record,
                        )
                    });

                    if let Err(e) = result {
                        if e.is_fatal() {
                            return Err(e);
                        }
                        self.report(header, Some(m), e);
                    }
                }
            }
            SectionBody::Unknown(tag) => {
                tracing::trace!(tag, section = id, "skipping unknown section");
            }
        }

        Ok(())
    }

    fn report(&mut self, header: &SectionHeader, record: Option<usize>, error: DecodeError) {
        let diagnostic = Diagnostic {
            section_offset: header.offset,
            section_id: header.section_id(),
            record,
            error,
        };

        tracing::warn!("skipped {}", diagnostic);

        self.diagnostics.push(diagnostic);
    }
}
