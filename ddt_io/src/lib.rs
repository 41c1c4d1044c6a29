//! The default file-backed serializer, synthetic point generation, grid
//! partitioning, and the PLY/VTU+PVTU/VRT+CSV/GeoJSON output writers.

pub mod file_point_serializer;
pub mod generator;
pub mod geojson;
pub mod partitioner;
pub mod ply;
pub mod snapshot;
pub mod vrt;
pub mod vtu;

pub use file_point_serializer::FilePointSerializer;
pub use generator::RandomPointGenerator;
pub use geojson::write_geojson;
pub use partitioner::GridPartitioner;
pub use ply::write_ply;
pub use vrt::write_vrt_csv;
pub use vtu::write_vtu_pvtu;
