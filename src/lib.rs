//! Flocksim Library
//!
//! A multithreaded boids simulation. Each tick builds a quadtree over the
//! current generation inside a reusable region arena, fans the population
//! out to a fixed worker pool in contiguous chunks, and writes the next
//! generation into a second buffer before swapping.

pub mod config;
pub mod pool;
pub mod sim;
pub mod spatial;
pub mod util;
