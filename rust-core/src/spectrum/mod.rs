//! Spectral averaging with FFT

pub mod accumulator;
pub mod fft;
pub mod taper;
pub mod transform;

pub use accumulator::{SpectralAccumulator, Spectrum};
pub use fft::{frequency_axis, FftEngine};
pub use taper::{Taper, TaperKind};
pub use transform::Transform;
