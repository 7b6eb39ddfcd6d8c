pub mod database;
pub mod error;
pub mod postgrest;
pub mod row_helpers;
pub mod schema;
pub mod sent_facts;
pub mod subscribers;
pub mod traits;

pub use database::Database;
pub use error::StoreError;
pub use postgrest::PostgrestStore;
pub use sent_facts::SentFactRepo;
pub use subscribers::SubscriberRepo;
pub use traits::{RecipientDirectory, SentFactLog};
