//! Binary little-endian PLY, one file per tile: a vertex element carrying
//! each vertex's tile label and per-tile id, and a face element carrying
//! the owning tile and how many of the face's vertices are local to it.

use crate::snapshot::{snapshot, TileSnapshot};
use anyhow::{Context, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use ddt_container::{Serializer, TileContainer};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub fn write_ply<S: Serializer>(container: &TileContainer<S>, basename: &Path) -> Result<()> {
	for index in container.tile_indices() {
		let snap = snapshot(container, index)?;
		let path = basename.with_file_name(format!("{}.{}.ply", basename.file_name().unwrap().to_string_lossy(), index.value()));
		write_tile_ply(&snap, &path).with_context(|| format!("writing {}", path.display()))?;
	}
	Ok(())
}

fn write_tile_ply(snap: &TileSnapshot, path: &Path) -> Result<()> {
	let file = File::create(path)?;
	let mut w = BufWriter::new(file);

	write!(w, "ply\n")?;
	write!(w, "format binary_little_endian 1.0\n")?;
	write!(w, "element vertex {}\n", snap.vertices.len())?;
	for axis in 0..snap.dimension {
		write!(w, "property float {}\n", axis_name(axis))?;
	}
	write!(w, "property uint tile\n")?;
	write!(w, "property uint id\n")?;
	write!(w, "element face {}\n", snap.cells.len())?;
	write!(w, "property list uchar int vertex_indices\n")?;
	write!(w, "property uint tile\n")?;
	write!(w, "property uchar local\n")?;
	write!(w, "end_header\n")?;

	for (id, v) in snap.vertices.iter().enumerate() {
		for axis in 0..snap.dimension {
			w.write_f32::<LittleEndian>(v.point.coord(axis) as f32)?;
		}
		w.write_u32::<LittleEndian>(snap.index.value() as u32)?;
		w.write_u32::<LittleEndian>(id as u32)?;
	}
	for cell in &snap.cells {
		w.write_u8(cell.vertex_indices.len() as u8)?;
		for idx in &cell.vertex_indices {
			w.write_i32::<LittleEndian>(*idx as i32)?;
		}
		w.write_u32::<LittleEndian>(snap.index.value() as u32)?;
		w.write_u8(cell.local_count as u8)?;
	}
	w.flush()?;
	Ok(())
}

fn axis_name(axis: usize) -> &'static str {
	match axis {
		0 => "x",
		1 => "y",
		2 => "z",
		_ => "w",
	}
}
