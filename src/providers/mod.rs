pub mod local;
pub mod traits;
pub mod types;

pub use local::LocalProvider;
pub use traits::ModelClient;
pub use types::{ModelSettings, ProviderError};
