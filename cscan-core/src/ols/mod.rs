//! Ordinary least squares, the reference method the score scan is checked
//! against.

pub mod linear;
pub mod scan;

pub use linear::{fit, OlsCoefficient, OlsError, OlsFit};
pub use scan::{OlsMarkerResult, OlsScan};
