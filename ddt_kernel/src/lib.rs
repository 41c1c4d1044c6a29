//! Dimension-generic Delaunay triangulation kernel.
//!
//! This crate is deliberately swappable: `ddt_tile` depends only on the
//! [`Kernel`] trait. `Triangulation` is the one implementation this
//! workspace ships, built around a Bowyer-Watson insertion and a single
//! infinite vertex closing the complex into a topological sphere.

pub mod kernel_trait;
pub mod point;
pub mod predicates;
pub mod triangulation;

pub use kernel_trait::{are_cells_equal, are_facets_equal, are_vertices_equal, Kernel};
pub use point::{Bbox, Point, PointKey};
pub use triangulation::{CellHandle, Facet, Triangulation, VertexHandle, INFINITE_VERTEX};
