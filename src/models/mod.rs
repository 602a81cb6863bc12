pub mod catalog_item;
pub mod filter_params;
pub mod license;
pub mod user_profile;

pub use catalog_item::{CatalogItem, CatalogItemDraft, CatalogRow, NewCatalogItem};
pub use filter_params::{FilterParams, GenreFilter, RecommendationSet, SortKey, ALL_GENRES};
pub use license::LicenseTier;
pub use user_profile::{normalize_email, UserProfile};
