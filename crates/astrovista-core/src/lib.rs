pub mod apod;
pub mod date;
pub mod error;

pub use apod::{Apod, ApodList, LanguageInfo, SearchResponse};
pub use date::{ApodDate, today_utc};
pub use error::{CoreError, Result};
