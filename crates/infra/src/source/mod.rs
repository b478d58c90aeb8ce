//! Tabular row source adapter.

mod sheets;

pub use sheets::SheetsSourceClient;
