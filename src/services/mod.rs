pub mod accounts;
pub mod authorization;
pub mod catalog_sync;
pub mod catalog_view;
pub mod checkout;
pub mod overlay;
pub mod recommender;
pub mod session;
pub mod speech;

pub use authorization::{AuthorizationPolicy, SingleAdminPolicy};
pub use catalog_sync::{AssetUpload, CatalogSync, Subscription};
pub use catalog_view::{derive_genres, derive_view};
pub use checkout::{handoff_link, CheckoutSettings, Handoff};
pub use overlay::apply_overlay;
pub use recommender::{recommend, Recommender, Suggestion};
pub use session::{MemorySessionStore, Session, SessionStore};
pub use speech::{decode_pcm, PcmAudio};
