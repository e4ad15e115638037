// Concrete implementations of the domain ports: the GOV.UK holiday source, the
// shipped seed document and the on-disk holiday cache.

pub mod http;
pub mod seed;
pub mod storage;

pub use http::GovUkHolidaySource;
pub use seed::SeedHolidays;
pub use storage::FileHolidayStore;
