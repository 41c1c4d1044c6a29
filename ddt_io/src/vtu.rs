//! VTU/PVTU output: one `.vtu` piece per tile plus a `.pvtu` index. Cell
//! data and point data each carry a `"tile"` scalar. Written in VTK's ASCII
//! data mode rather than the appended-binary mode the original tool uses,
//! since appended-binary framing (base64 vs. raw, the leading `_` marker's
//! exact offset bookkeeping) is easy to get subtly wrong without a writer
//! under test; ASCII is a conforming, if larger, VTU file.

use crate::snapshot::{snapshot, TileSnapshot};
use anyhow::{Context, Result};
use ddt_container::{Serializer, TileContainer};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub fn write_vtu_pvtu<S: Serializer>(container: &TileContainer<S>, basename: &Path) -> Result<()> {
	let dimension = container.dimension();
	let cell_type = match dimension {
		2 => 5,  // VTK_TRIANGLE
		3 => 10, // VTK_TETRA
		d => anyhow::bail!("VTU output only supports dimension 2 or 3, got {d}"),
	};

	let indices = container.tile_indices();
	for index in &indices {
		let snap = snapshot(container, *index)?;
		let path = piece_path(basename, *index);
		write_piece(&snap, cell_type, &path).with_context(|| format!("writing {}", path.display()))?;
	}
	write_pvtu_index(basename, &indices)?;
	Ok(())
}

fn piece_path(basename: &Path, index: ddt_tile::TileIndex) -> std::path::PathBuf {
	basename.with_file_name(format!("{}.{}.vtu", basename.file_name().unwrap().to_string_lossy(), index.value()))
}

fn write_piece(snap: &TileSnapshot, cell_type: u32, path: &Path) -> Result<()> {
	let file = File::create(path)?;
	let mut w = BufWriter::new(file);

	writeln!(w, r#"<?xml version="1.0"?>"#)?;
	writeln!(w, r#"<VTKFile type="UnstructuredGrid" version="0.1" byte_order="LittleEndian">"#)?;
	writeln!(w, "  <UnstructuredGrid>")?;
	writeln!(w, r#"    <Piece NumberOfPoints="{}" NumberOfCells="{}">"#, snap.vertices.len(), snap.cells.len())?;

	writeln!(w, r#"      <PointData Scalars="tile">"#)?;
	writeln!(w, r#"        <DataArray type="UInt64" Name="tile" format="ascii">"#)?;
	for _ in &snap.vertices {
		write!(w, "{} ", snap.index.value())?;
	}
	writeln!(w)?;
	writeln!(w, "        </DataArray>")?;
	writeln!(w, "      </PointData>")?;

	writeln!(w, "      <Points>")?;
	writeln!(w, r#"        <DataArray type="Float64" NumberOfComponents="3" format="ascii">"#)?;
	for v in &snap.vertices {
		let z = if snap.dimension >= 3 { v.point.coord(2) } else { 0.0 };
		writeln!(w, "{} {} {}", v.point.coord(0), v.point.coord(1), z)?;
	}
	writeln!(w, "        </DataArray>")?;
	writeln!(w, "      </Points>")?;

	writeln!(w, "      <Cells>")?;
	writeln!(w, r#"        <DataArray type="Int64" Name="connectivity" format="ascii">"#)?;
	for cell in &snap.cells {
		let line: Vec<String> = cell.vertex_indices.iter().map(std::string::ToString::to_string).collect();
		writeln!(w, "{}", line.join(" "))?;
	}
	writeln!(w, "        </DataArray>")?;
	writeln!(w, r#"        <DataArray type="Int64" Name="offsets" format="ascii">"#)?;
	let mut offset = 0usize;
	for cell in &snap.cells {
		offset += cell.vertex_indices.len();
		write!(w, "{offset} ")?;
	}
	writeln!(w)?;
	writeln!(w, "        </DataArray>")?;
	writeln!(w, r#"        <DataArray type="UInt8" Name="types" format="ascii">"#)?;
	for _ in &snap.cells {
		write!(w, "{cell_type} ")?;
	}
	writeln!(w)?;
	writeln!(w, "        </DataArray>")?;
	writeln!(w, "      </Cells>")?;

	writeln!(w, r#"      <CellData Scalars="tile">"#)?;
	writeln!(w, r#"        <DataArray type="UInt64" Name="tile" format="ascii">"#)?;
	for _ in &snap.cells {
		write!(w, "{} ", snap.index.value())?;
	}
	writeln!(w)?;
	writeln!(w, "        </DataArray>")?;
	writeln!(w, r#"        <DataArray type="UInt8" Name="local" format="ascii">"#)?;
	for cell in &snap.cells {
		write!(w, "{} ", cell.local_count)?;
	}
	writeln!(w)?;
	writeln!(w, "        </DataArray>")?;
	writeln!(w, "      </CellData>")?;

	writeln!(w, "    </Piece>")?;
	writeln!(w, "  </UnstructuredGrid>")?;
	writeln!(w, "</VTKFile>")?;
	w.flush()?;
	Ok(())
}

fn write_pvtu_index(basename: &Path, indices: &[ddt_tile::TileIndex]) -> Result<()> {
	let path = basename.with_extension("pvtu");
	let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
	let mut w = BufWriter::new(file);

	writeln!(w, r#"<?xml version="1.0"?>"#)?;
	writeln!(w, r#"<VTKFile type="PUnstructuredGrid" version="0.1" byte_order="LittleEndian">"#)?;
	writeln!(w, "  <PUnstructuredGrid GhostLevel=\"0\">")?;
	writeln!(w, r#"    <PPointData Scalars="tile">"#)?;
	writeln!(w, r#"      <PDataArray type="UInt64" Name="tile"/>"#)?;
	writeln!(w, "    </PPointData>")?;
	writeln!(w, r#"    <PCellData Scalars="tile">"#)?;
	writeln!(w, r#"      <PDataArray type="UInt64" Name="tile"/>"#)?;
	writeln!(w, r#"      <PDataArray type="UInt8" Name="local"/>"#)?;
	writeln!(w, "    </PCellData>")?;
	writeln!(w, r#"    <PPoints><PDataArray type="Float64" NumberOfComponents="3"/></PPoints>"#)?;
	for index in indices {
		let piece = piece_path(basename, *index);
		let name = piece.file_name().unwrap().to_string_lossy();
		writeln!(w, r#"    <Piece Source="{name}"/>"#)?;
	}
	writeln!(w, "  </PUnstructuredGrid>")?;
	writeln!(w, "</VTKFile>")?;
	w.flush()?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use ddt_container::NullSerializer;
	use ddt_kernel::Point;
	use ddt_tile::TileIndex;

	#[test]
	fn writes_a_piece_per_tile_and_one_pvtu_index() {
		let container = TileContainer::new(2, None, NullSerializer);
		container
			.with_tile(TileIndex::new(0), |t| {
				t.insert(Point::new(vec![-10.0, -10.0]), TileIndex::new(0));
				t.insert(Point::new(vec![10.0, -10.0]), TileIndex::new(0));
				t.insert(Point::new(vec![0.0, 10.0]), TileIndex::new(0));
			})
			.unwrap();

		let dir = tempfile::tempdir().unwrap();
		let basename = dir.path().join("mesh");
		write_vtu_pvtu(&container, &basename).unwrap();
		assert!(dir.path().join("mesh.0.vtu").exists());
		assert!(dir.path().join("mesh.pvtu").exists());
	}
}
