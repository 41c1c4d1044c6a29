//! The bounded tile container and the inter-tile messaging hub that the
//! splaying engine drives.

pub mod messaging;
pub mod serializer;
pub mod tile_container;

pub use messaging::MessagingHub;
pub use serializer::{NullSerializer, Serializer};
pub use tile_container::TileContainer;
