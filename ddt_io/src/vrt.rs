//! VRT + CSV output: four layer kinds (vertices, facets, cells, TINs), each
//! a directory of one `.vrt`/`.csv` pair per tile plus a top-level union
//! `.vrt` that references every tile's layer.

use crate::snapshot::{snapshot, FacetRow, TileSnapshot};
use anyhow::{Context, Result};
use ddt_container::{Serializer, TileContainer};
use ddt_tile::TileIndex;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const LAYER_DIRS: [(&str, &str); 4] = [("v", "vertices"), ("f", "facets"), ("c", "cells"), ("t", "tins")];

pub fn write_vrt_csv<S: Serializer>(container: &TileContainer<S>, root: &Path) -> Result<()> {
	for (dir, _) in LAYER_DIRS {
		fs::create_dir_all(root.join(dir)).with_context(|| format!("creating {}", root.join(dir).display()))?;
	}

	let indices = container.tile_indices();
	for index in &indices {
		let snap = snapshot(container, *index)?;
		write_vertices_layer(root, &snap)?;
		write_facets_layer(root, &snap)?;
		write_cells_layer(root, &snap, "c", "cells", false)?;
		write_cells_layer(root, &snap, "t", "tins", true)?;
	}

	write_union_vrt(root, "v", "vertices", "wkbPoint", &indices)?;
	write_union_vrt(root, "f", "facets", "wkbLineString", &indices)?;
	write_union_vrt(root, "c", "cells", "wkbPolygon", &indices)?;
	write_union_vrt(root, "t", "tins", "wkbMultiPolygon", &indices)?;
	Ok(())
}

fn point_wkt(snap: &TileSnapshot, local: usize) -> String {
	let p = &snap.vertices[local].point;
	if snap.dimension >= 3 {
		format!("POINT Z ({} {} {})", p.coord(0), p.coord(1), p.coord(2))
	} else {
		format!("POINT ({} {})", p.coord(0), p.coord(1))
	}
}

fn ring_wkt(snap: &TileSnapshot, indices: &[usize]) -> String {
	let mut coords: Vec<String> = indices.iter().map(|i| format!("{} {}", snap.vertices[*i].point.coord(0), snap.vertices[*i].point.coord(1))).collect();
	if let Some(first) = coords.first().cloned() {
		coords.push(first);
	}
	coords.join(", ")
}

fn write_vertices_layer(root: &Path, snap: &TileSnapshot) -> Result<()> {
	let path = tile_csv_path(root, "v", snap.index);
	let file = File::create(&path)?;
	let mut w = std::io::BufWriter::new(file);
	writeln!(w, "wkt,tile,id,is_local")?;
	for (id, v) in snap.vertices.iter().enumerate() {
		writeln!(w, "\"{}\",{},{},{}", point_wkt(snap, id), snap.index.value(), id, v.is_local)?;
	}
	write_vrt_header(root, "v", snap.index, "wkbPoint")?;
	Ok(())
}

fn write_facets_layer(root: &Path, snap: &TileSnapshot) -> Result<()> {
	let path = tile_csv_path(root, "f", snap.index);
	let file = File::create(&path)?;
	let mut w = std::io::BufWriter::new(file);
	writeln!(w, "wkt,tile,id,local,is_main")?;
	for (id, f) in snap.facets.iter().enumerate() {
		writeln!(w, "\"{}\",{},{},{},{}", facet_wkt(snap, f), snap.index.value(), id, f.local_count, f.is_main)?;
	}
	write_vrt_header(root, "f", snap.index, "wkbLineString")?;
	Ok(())
}

fn facet_wkt(snap: &TileSnapshot, f: &FacetRow) -> String {
	let coords: Vec<String> = f.vertex_indices.iter().map(|i| format!("{} {}", snap.vertices[*i].point.coord(0), snap.vertices[*i].point.coord(1))).collect();
	format!("LINESTRING ({})", coords.join(", "))
}

fn write_cells_layer(root: &Path, snap: &TileSnapshot, dir: &str, _layer: &str, as_tin: bool) -> Result<()> {
	let path = tile_csv_path(root, dir, snap.index);
	let file = File::create(&path)?;
	let mut w = std::io::BufWriter::new(file);
	if as_tin {
		writeln!(w, "wkt,tile,main_count")?;
		let polygons: Vec<String> = snap.cells.iter().map(|c| format!("(({}))", ring_wkt(snap, &c.vertex_indices))).collect();
		let main_count = snap.cells.iter().filter(|c| c.is_main).count();
		writeln!(w, "\"MULTIPOLYGON ({})\",{},{}", polygons.join(", "), snap.index.value(), main_count)?;
	} else {
		writeln!(w, "wkt,tile,id,local,is_main")?;
		for (id, c) in snap.cells.iter().enumerate() {
			writeln!(w, "\"POLYGON (({}))\",{},{},{},{}", ring_wkt(snap, &c.vertex_indices), snap.index.value(), id, c.local_count, c.is_main)?;
		}
	}
	let geometry_type = if as_tin { "wkbMultiPolygon" } else { "wkbPolygon" };
	write_vrt_header(root, dir, snap.index, geometry_type)?;
	Ok(())
}

fn tile_csv_path(root: &Path, dir: &str, index: TileIndex) -> PathBuf {
	root.join(dir).join(format!("{}.csv", index.value()))
}

fn tile_vrt_path(root: &Path, dir: &str, index: TileIndex) -> PathBuf {
	root.join(dir).join(format!("{}.vrt", index.value()))
}

fn write_vrt_header(root: &Path, dir: &str, index: TileIndex, geometry_type: &str) -> Result<()> {
	let csv_path = tile_csv_path(root, dir, index);
	let path = tile_vrt_path(root, dir, index);
	let file = File::create(&path)?;
	let mut w = std::io::BufWriter::new(file);
	writeln!(w, r#"<OGRVRTDataSource>"#)?;
	writeln!(w, r#"  <OGRVRTLayer name="{}">"#, csv_path.file_stem().unwrap().to_string_lossy())?;
	writeln!(w, "    <SrcDataSource>{}</SrcDataSource>", csv_path.file_name().unwrap().to_string_lossy())?;
	writeln!(w, "    <GeometryType>{geometry_type}</GeometryType>")?;
	writeln!(w, r#"    <GeometryField encoding="WKT" field="wkt"/>"#)?;
	writeln!(w, r#"    <LayerSRS>WGS84</LayerSRS>"#)?;
	writeln!(w, "  </OGRVRTLayer>")?;
	writeln!(w, "</OGRVRTDataSource>")?;
	w.flush()?;
	Ok(())
}

fn write_union_vrt(root: &Path, dir: &str, layer_name: &str, geometry_type: &str, indices: &[TileIndex]) -> Result<()> {
	let path = root.join(format!("{layer_name}.vrt"));
	let file = File::create(&path)?;
	let mut w = std::io::BufWriter::new(file);
	writeln!(w, r#"<OGRVRTDataSource>"#)?;
	writeln!(w, r#"  <OGRVRTUnionLayer name="{layer_name}">"#)?;
	for index in indices {
		let vrt = tile_vrt_path(root, dir, *index);
		writeln!(w, r#"    <OGRVRTLayer name="{}"><SrcDataSource>{}</SrcDataSource></OGRVRTLayer>"#, vrt.file_stem().unwrap().to_string_lossy(), vrt.file_name().unwrap().to_string_lossy())?;
	}
	writeln!(w, r#"    <GeometryType>{geometry_type}</GeometryType>"#)?;
	writeln!(w, "  </OGRVRTUnionLayer>")?;
	writeln!(w, "</OGRVRTDataSource>")?;
	w.flush()?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use ddt_container::NullSerializer;
	use ddt_kernel::Point;

	#[test]
	fn writes_all_four_layer_kinds_per_tile_and_a_union_index() {
		let container = TileContainer::new(2, None, NullSerializer);
		container
			.with_tile(TileIndex::new(0), |t| {
				t.insert(Point::new(vec![-10.0, -10.0]), TileIndex::new(0));
				t.insert(Point::new(vec![10.0, -10.0]), TileIndex::new(0));
				t.insert(Point::new(vec![0.0, 10.0]), TileIndex::new(0));
			})
			.unwrap();

		let dir = tempfile::tempdir().unwrap();
		write_vrt_csv(&container, dir.path()).unwrap();
		for (kind, layer) in LAYER_DIRS {
			assert!(dir.path().join(kind).join("0.csv").exists());
			assert!(dir.path().join(kind).join("0.vrt").exists());
			assert!(dir.path().join(format!("{layer}.vrt")).exists());
		}
	}
}
