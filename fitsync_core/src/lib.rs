pub mod assemble;
pub mod byte_counter;
pub mod config;
pub mod error;
pub mod fit;
pub mod fixup;
pub mod formatting;
pub mod geodesic;
pub mod gpx_writer;
pub mod model;
pub mod model_impls;
pub mod read;
pub mod sync;
