#[cfg(feature = "accelerate")]
extern crate accelerate_src;
#[cfg(feature = "mkl")]
extern crate intel_mkl_src;

pub mod device_map;
pub mod error;
pub mod flux;
pub mod loader;
pub mod loader_factory;
pub mod pipeline;
pub mod prepare;
pub mod service;

mod generator;
mod request;
mod util;

pub use candle_core::Device;
pub use device_map::*;
pub use error::{Error, Result};
pub use generator::Generator;
pub use loader::*;
pub use loader_factory::{load_pipeline, ModelVariant};
pub use pipeline::*;
pub use prepare::*;
pub use request::*;
pub use service::*;
pub use util::*;
