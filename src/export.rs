use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::asset::Mesh;

/// Writes `mesh` as `<name>.obj` with a matching `<name>.mtl` into `dir`.
///
/// Positions are written as decoded, with no axis conversion. Texture coordinates get the
/// usual OBJ vertical flip. Every face group becomes a `usemtl` block, and its diffuse
/// texture (if any) becomes the material's `map_Kd`.
pub fn write_obj(mesh: &Mesh, dir: &Path) -> io::Result<PathBuf> {
    let obj_path = dir.join(format!("{}.obj", mesh.name()));
    let mtl_name = format!("{}.mtl", mesh.name());

    write_mtl(mesh, &dir.join(&mtl_name))?;

    let file = File::create(&obj_path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "mtllib {}", mtl_name)?;
    writeln!(writer, "o {}", mesh.name())?;

    for [x, y, z] in mesh.positions() {
        writeln!(writer, "v {} {} {}", x, y, z)?;
    }

    // UVs only line up with vertices when there is one per vertex.
    let has_uvs = !mesh.uvs().is_empty() && mesh.uvs().len() == mesh.vertex_count();
    if has_uvs {
        for [u, v] in mesh.uvs() {
            writeln!(writer, "vt {} {}", u, 1.0 - v)?;
        }
    }

    let triangles: Vec<[u16; 3]> = mesh.triangles().collect();

    for group in mesh.face_groups() {
        writeln!(writer, "usemtl {}", group.name)?;

        let end = (group.first_triangle + group.triangle_count).min(triangles.len());
        for tri in &triangles[group.first_triangle.min(end)..end] {
            let [a, b, c] = tri.map(|i| u32::from(i) + 1);

            if has_uvs {
                writeln!(writer, "f {}/{} {}/{} {}/{}", a, a, b, b, c, c)?;
            } else {
                writeln!(writer, "f {} {} {}", a, b, c)?;
            }
        }
    }

    writer.flush()?;

    Ok(obj_path)
}

fn write_mtl(mesh: &Mesh, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    for group in mesh.face_groups() {
        writeln!(writer, "newmtl {}", group.name)?;
        writeln!(writer, "Kd 1.0 1.0 1.0")?;

        if let Some(diffuse) = &group.diffuse_texture_path {
            writeln!(writer, "map_Kd {}", diffuse.display())?;
        }
        if let Some(specular) = &group.specular_texture_path {
            writeln!(writer, "map_Ks {}", specular.display())?;
        }

        writeln!(writer)?;
    }

    writer.flush()
}
