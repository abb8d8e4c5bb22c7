//! Domain services: OCR, classification, and the item store.

pub mod classification;
pub mod error;
pub mod ocr;
pub mod store;

pub use classification::ClassificationService;
pub use error::ServiceError;
pub use ocr::OcrService;
pub use store::{Item, ItemStore, NewItem};
