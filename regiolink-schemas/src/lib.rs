pub mod commodity;
pub mod factor;
pub mod file_formats;
pub mod geography;
pub mod process;
pub mod trade;
