//! Barcode scanning: candidate filtering and the scan session lifecycle.

mod isbn;
mod session;

pub use isbn::{is_candidate, normalize};
pub use session::{
    BarcodeDecoder, Camera, CameraStream, IsbnLookup, ScanEvent, ScanOutcome, ScanSession,
    ScanState,
};
