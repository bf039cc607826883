pub mod error;
pub mod supabase;
pub mod users;

pub use error::StoreError;
