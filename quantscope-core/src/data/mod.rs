//! Market data access: provider trait, concrete providers, alignment.

pub mod align;
pub mod csv_dir;
pub mod memory;
pub mod provider;
pub mod synthetic;

pub use align::{align_inner, aligned_returns, AlignedPanel};
pub use csv_dir::{write_series, CsvProvider};
pub use memory::InMemoryProvider;
pub use provider::{DataError, DataProvider, DataSource};
pub use synthetic::SyntheticProvider;
