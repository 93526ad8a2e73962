use std::{fs, path::PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use permbin::{ParseContext, PermFile, export};

/// Extracts meshes and textures from a perm container.
#[derive(Parser, Debug)]
#[command(name = "permtool", version)]
struct Args {
    /// Path to the .perm.bin container. Its .temp.bin companion is looked up next to it.
    input: PathBuf,

    /// Where to write textures and models. Defaults to the container's directory.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Also write a PNG preview of every texture.
    #[arg(long)]
    png: bool,

    /// Write every mesh as an OBJ with a matching MTL.
    #[arg(long)]
    obj: bool,

    /// Decode textures without writing any DDS files.
    #[arg(long)]
    no_textures: bool,

    /// Log every section as it is read.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let mut ctx = ParseContext::new(&args.input)
        .with_texture_output(!args.no_textures)
        .with_png_previews(args.png);

    if let Some(out) = &args.out {
        ctx = ctx.with_output_dir(out);
    }

    if ctx.output_dir().is_file() {
        eprintln!(
            "Unable to write to {} (A file already exists by that name)",
            ctx.output_dir().display()
        );
        error_exit();
    } else if !ctx.output_dir().as_os_str().is_empty() && !ctx.output_dir().exists() {
        if let Err(e) = fs::create_dir_all(ctx.output_dir()) {
            eprintln!(
                "Unable to create directory {}.\nError: {}",
                ctx.output_dir().display(),
                e
            );
            error_exit();
        }
    }

    println!("Opening {}", args.input.display());

    let perm = match PermFile::open(&ctx) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Unable to process {}: {}", args.input.display(), e);
            error_exit();
        }
    };

    println!(
        "{} sections, {} meshes, {} bones, {} textures",
        perm.section_count(),
        perm.meshes().len(),
        perm.bones().len(),
        perm.textures().len()
    );

    for mesh in perm.meshes() {
        println!(
            "  {}: {} vertices, {} triangles, {} face groups, {} skin groups",
            mesh.name(),
            mesh.vertex_count(),
            mesh.triangle_count(),
            mesh.face_groups().len(),
            mesh.skin_groups().len()
        );

        if args.obj {
            match export::write_obj(mesh, ctx.output_dir()) {
                Ok(path) => println!("    wrote {}", path.display()),
                Err(e) => eprintln!("Unable to write OBJ for {}\nError: {}", mesh.name(), e),
            }
        }
    }

    for texture in perm.textures() {
        println!(
            "  texture {}: {}x{} {:?}, {} bytes",
            texture.section_id, texture.width, texture.height, texture.format, texture.payload_len
        );
    }

    if !perm.diagnostics().is_empty() {
        println!("{} sections or records skipped:", perm.diagnostics().len());
        for diagnostic in perm.diagnostics() {
            println!("  {}", diagnostic);
        }
    }
}

fn error_exit() -> ! {
    eprintln!("\nUnable to continue.");

    std::process::exit(1);
}
