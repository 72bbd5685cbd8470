//! # spectral-rt
//!
//! Core of a stochastic spectral ray tracer.
//!
//! - [`ray`] - spectral rays, Russian roulette and recursive daughter rays
//! - [`world`] - the scene and material contracts the ray engine traces against
//! - [`pipeline`] - per-coordinate aggregation of sampled spectra across
//!   spectral slices
//! - [`observer`] - parallel driver feeding rays through a pipeline
//! - [`acceleration`] and [`mesh`] - 2D KD-tree and functions on triangle
//!   meshes
//!
//! [`materials`], [`sphere`] and [`scene`] provide a small demo world.

pub mod acceleration;
pub mod cie;
pub mod error;
pub mod fp;
pub mod materials;
pub mod mesh;
pub mod observer;
pub mod pipeline;
pub mod ray;
pub mod rng;
pub mod scene;
pub mod spectrum;
pub mod sphere;
pub mod stats;
pub mod threadpool;
pub mod types;
pub mod world;

pub use error::{Error, Result};
