//! A single `FeatureCollection` mixing point features (vertices) and
//! polygon features (finite cells), each carrying `tile`, `id` and `local`
//! properties; cell features additionally report `is_main`.

use crate::snapshot::{snapshot, TileSnapshot};
use anyhow::{Context, Result};
use ddt_container::{Serializer, TileContainer};
use serde_json::{json, Value};
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub fn write_geojson<S: Serializer>(container: &TileContainer<S>, path: &Path) -> Result<()> {
	let mut features = Vec::new();
	for index in container.tile_indices() {
		let snap = snapshot(container, index)?;
		features.extend(vertex_features(&snap));
		features.extend(cell_features(&snap));
	}

	let collection = json!({
		"type": "FeatureCollection",
		"features": features,
	});

	let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
	let mut w = std::io::BufWriter::new(file);
	serde_json::to_writer_pretty(&mut w, &collection).context("serializing GeoJSON")?;
	w.flush()?;
	Ok(())
}

fn vertex_features(snap: &TileSnapshot) -> Vec<Value> {
	snap.vertices
		.iter()
		.enumerate()
		.map(|(id, v)| {
			let coords: Vec<f64> = v.point.coords().to_vec();
			json!({
				"type": "Feature",
				"geometry": { "type": "Point", "coordinates": coords },
				"properties": { "tile": snap.index.value(), "id": id, "is_local": v.is_local },
			})
		})
		.collect()
}

fn cell_features(snap: &TileSnapshot) -> Vec<Value> {
	snap.cells
		.iter()
		.enumerate()
		.map(|(id, c)| {
			let mut ring: Vec<Vec<f64>> = c.vertex_indices.iter().map(|i| snap.vertices[*i].point.coords()[..2].to_vec()).collect();
			if let Some(first) = ring.first().cloned() {
				ring.push(first);
			}
			json!({
				"type": "Feature",
				"geometry": { "type": "Polygon", "coordinates": [ring] },
				"properties": { "tile": snap.index.value(), "id": id, "local": c.local_count, "is_main": c.is_main },
			})
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use ddt_container::NullSerializer;
	use ddt_kernel::Point;
	use ddt_tile::TileIndex;

	#[test]
	fn writes_a_feature_collection_with_points_and_polygons() {
		let container = TileContainer::new(2, None, NullSerializer);
		container
			.with_tile(TileIndex::new(0), |t| {
				t.insert(Point::new(vec![-10.0, -10.0]), TileIndex::new(0));
				t.insert(Point::new(vec![10.0, -10.0]), TileIndex::new(0));
				t.insert(Point::new(vec![0.0, 10.0]), TileIndex::new(0));
			})
			.unwrap();

		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("out.geojson");
		write_geojson(&container, &path).unwrap();

		let contents = std::fs::read_to_string(&path).unwrap();
		let parsed: Value = serde_json::from_str(&contents).unwrap();
		assert_eq!(parsed["type"], "FeatureCollection");
		assert!(parsed["features"].as_array().unwrap().len() >= 3);
	}
}
