use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::arg_enum;
use structopt::StructOpt;

use plymesh::formats::ply;
use plymesh::mesh::ArrayMesh;
use plymesh::Options;

arg_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TargetFormat {
        Ascii,
        BinaryLe,
        BinaryBe
    }
}

#[derive(Debug, StructOpt)]
#[structopt(name = "plytool", about = "Inspect and re-encode PLY mesh files")]
struct Opt {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Print a summary of what a PLY file contains
    Info {
        /// File to inspect
        file: PathBuf,
    },

    /// Re-encode a PLY file
    Convert {
        /// Target encoding
        #[structopt(short, long, default_value = "ascii")]
        format: TargetFormat,

        /// File to read
        input: PathBuf,
        /// File to write
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let opt = Opt::from_args();

    match opt.command {
        Command::Info { file } => info(&file),
        Command::Convert {
            format,
            input,
            output,
        } => convert(&input, &output, format),
    }
}

/// Ask the reader for everything; the reconciled result tells us what the
/// file actually had.
fn read_all(path: &Path) -> anyhow::Result<(ArrayMesh, Options)> {
    let requested = Options::VERTEX_NORMAL
        | Options::VERTEX_TEXCOORD
        | Options::VERTEX_COLOR
        | Options::COLOR_ALPHA
        | Options::FACE_TEXCOORD
        | Options::TEX_FILE
        | Options::CUSTOM;
    let mut mesh = ArrayMesh::new();
    let observed = ply::read_ply_path(path, &mut mesh, requested)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok((mesh, observed))
}

fn info(path: &Path) -> anyhow::Result<()> {
    let (mesh, observed) = read_all(path)?;

    println!(
        "{}: {} vertices, {} edges, {} faces",
        path.display(),
        mesh.n_vertices(),
        mesh.n_edges(),
        mesh.n_faces()
    );
    let encoding = if !observed.is_binary() {
        "ascii"
    } else if observed.contains(Options::MSB) {
        "binary (big endian)"
    } else {
        "binary (little endian)"
    };
    println!("  encoding: {}", encoding);

    let mut attributes = Vec::new();
    if observed.vertex_has_normal() {
        attributes.push("vertex normals");
    }
    if observed.vertex_has_texcoord() {
        attributes.push("vertex texcoords");
    }
    if observed.vertex_has_color() {
        attributes.push(if observed.color_is_float() {
            "vertex colors (float)"
        } else {
            "vertex colors"
        });
    }
    if observed.face_has_texcoord() {
        attributes.push("face texcoords");
    }
    if observed.contains(Options::CUSTOM) {
        attributes.push("custom properties");
    }
    if attributes.is_empty() {
        println!("  attributes: none");
    } else {
        println!("  attributes: {}", attributes.join(", "));
    }

    if let Some(name) = mesh.texfile() {
        println!("  texture: {}", name);
    }
    Ok(())
}

fn convert(input: &Path, output: &Path, format: TargetFormat) -> anyhow::Result<()> {
    let (mesh, observed) = read_all(input)?;

    let mut write_options = observed
        & (Options::VERTEX_NORMAL
            | Options::VERTEX_TEXCOORD
            | Options::VERTEX_COLOR
            | Options::COLOR_ALPHA
            | Options::COLOR_FLOAT
            | Options::FACE_TEXCOORD
            | Options::TEX_FILE);
    match format {
        TargetFormat::Ascii => {}
        TargetFormat::BinaryLe => write_options |= Options::BINARY | Options::LSB,
        TargetFormat::BinaryBe => write_options |= Options::BINARY | Options::MSB,
    }

    ply::write_ply_path(&mesh, output, write_options)
        .with_context(|| format!("writing {}", output.display()))?;
    println!(
        "{} -> {} ({} vertices, {} faces)",
        input.display(),
        output.display(),
        mesh.n_vertices(),
        mesh.n_faces()
    );
    Ok(())
}
