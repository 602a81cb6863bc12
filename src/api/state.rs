use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use crate::{
    db::ProfileStore,
    error::{AppError, AppResult},
    models::{CatalogItem, RecommendationSet, UserProfile},
    services::{
        AuthorizationPolicy, CatalogSync, CheckoutSettings, Recommender, Session, SessionStore,
        Subscription,
    },
};

/// Latest catalog snapshot pushed by the sync adapter
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub items: Arc<Vec<CatalogItem>>,
    /// False until the first snapshot of the current subscription arrives
    pub loaded: bool,
}

/// Collaborators wired up at startup
pub struct AppDependencies {
    pub sync: CatalogSync,
    pub profiles: Arc<dyn ProfileStore>,
    pub session_store: Arc<dyn SessionStore>,
    pub recommender: Arc<dyn Recommender>,
    pub policy: Arc<dyn AuthorizationPolicy>,
    pub checkout: CheckoutSettings,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<RwLock<AppStateInner>>,
    pub sync: CatalogSync,
    pub profiles: Arc<dyn ProfileStore>,
    pub recommender: Arc<dyn Recommender>,
    pub policy: Arc<dyn AuthorizationPolicy>,
    pub checkout: Arc<CheckoutSettings>,
    snapshot: Arc<watch::Sender<CatalogSnapshot>>,
    /// Bumped whenever sync is stopped, so a subscription opened before a
    /// sign-out is never installed after it
    sync_epoch: Arc<AtomicU64>,
}

/// Per-installation state that changes with sign-in and AI matches
pub struct AppStateInner {
    pub session: Session,
    pub recommended: RecommendationSet,
    subscription: Option<Subscription>,
}

impl AppStateInner {
    fn has_live_subscription(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }
}

impl AppState {
    /// Builds the state and resumes catalog sync for a restored session
    pub async fn new(deps: AppDependencies) -> Self {
        let session = Session::init(deps.session_store).await;
        let (snapshot, _) = watch::channel(CatalogSnapshot::default());

        let state = Self {
            inner: Arc::new(RwLock::new(AppStateInner {
                session,
                recommended: RecommendationSet::new(),
                subscription: None,
            })),
            sync: deps.sync,
            profiles: deps.profiles,
            recommender: deps.recommender,
            policy: deps.policy,
            checkout: Arc::new(deps.checkout),
            snapshot: Arc::new(snapshot),
            sync_epoch: Arc::new(AtomicU64::new(0)),
        };

        state.ensure_sync().await;

        state
    }

    pub fn snapshot(&self) -> CatalogSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Makes the profile current and starts catalog sync
    ///
    /// Store I/O happens without the state lock; the lock is only taken to
    /// swap in the new session.
    pub async fn sign_in(&self, profile: UserProfile) {
        let store = self.inner.read().await.session.store();
        Session::persist(store.as_ref(), &profile).await;

        self.inner.write().await.session.install(profile);
        self.ensure_sync().await;
    }

    /// Signs out, releasing the subscription and clearing session-bound state
    pub async fn sign_out(&self) {
        let store = {
            let mut inner = self.inner.write().await;
            inner.session.clear();
            self.stop_sync(&mut inner);
            inner.session.store()
        };
        Session::forget(store.as_ref()).await;
    }

    /// Subscribes to the catalog while signed in without a live subscription
    ///
    /// The subscription is opened with no lock held. If a concurrent sign-in
    /// installed one first, or a sign-out happened meanwhile, the new one is
    /// released; a sign-out followed by another sign-in retries.
    async fn ensure_sync(&self) {
        loop {
            let epoch = {
                let inner = self.inner.read().await;
                if !inner.session.is_signed_in() || inner.has_live_subscription() {
                    return;
                }
                self.sync_epoch.load(Ordering::SeqCst)
            };

            let mut subscription = self.subscribe().await;

            let mut inner = self.inner.write().await;
            let current = self.sync_epoch.load(Ordering::SeqCst) == epoch;
            if current && inner.session.is_signed_in() && !inner.has_live_subscription() {
                inner.subscription = Some(subscription);
                return;
            }

            subscription.unsubscribe();
            if current || inner.has_live_subscription() {
                return;
            }

            // A sign-out raced the subscribe and its reset may have been overwritten
            self.snapshot.send_replace(CatalogSnapshot::default());
            if !inner.session.is_signed_in() {
                return;
            }
        }
    }

    async fn subscribe(&self) -> Subscription {
        let sender = self.snapshot.clone();
        self.sync
            .subscribe(move |items| {
                sender.send_replace(CatalogSnapshot {
                    items: Arc::new(items),
                    loaded: true,
                });
            })
            .await
    }

    /// Releases the subscription and forgets everything tied to the session
    fn stop_sync(&self, inner: &mut AppStateInner) {
        self.sync_epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(mut subscription) = inner.subscription.take() {
            subscription.unsubscribe();
        }
        inner.recommended.clear();
        self.snapshot.send_replace(CatalogSnapshot::default());
    }

    /// Signed-in profile, taking the read lock only for the lookup
    pub async fn current_profile(&self) -> AppResult<UserProfile> {
        Self::require_profile(&*self.inner.read().await)
    }

    /// Current profile, or `AuthRejected` when nobody is signed in
    pub fn require_profile(inner: &AppStateInner) -> AppResult<UserProfile> {
        inner
            .session
            .current()
            .cloned()
            .ok_or_else(|| AppError::AuthRejected("Sign in first".to_string()))
    }

    /// Current profile if it may manage the catalog
    pub fn require_admin(&self, inner: &AppStateInner) -> AppResult<UserProfile> {
        let profile = Self::require_profile(inner)?;
        if !self.policy.can_manage_catalog(&profile) {
            tracing::warn!(user_id = %profile.id, "Catalog management refused");
            return Err(AppError::AuthRejected(
                "Only the catalog admin can do that".to_string(),
            ));
        }
        Ok(profile)
    }
}
