use std::sync::Arc;

use uuid::Uuid;

use crate::auth::IdentityProvider;
use crate::models::Event;
use crate::policy::{Authorizer, ReviewListPolicy, Validator};
use crate::store::EntityStore;
use crate::utils::error::AppError;

/// Everything a handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub authorizer: Authorizer,
    pub validator: Validator,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EntityStore>,
        identity: Arc<dyn IdentityProvider>,
        review_list: ReviewListPolicy,
    ) -> Self {
        Self {
            validator: Validator::new(Arc::clone(&store)),
            authorizer: Authorizer::new(review_list),
            store,
            identity,
        }
    }

    /// For backends that store entities and resolve tokens alike.
    pub fn with_backend<B>(backend: Arc<B>, review_list: ReviewListPolicy) -> Self
    where
        B: EntityStore + IdentityProvider + 'static,
    {
        Self::new(backend.clone(), backend, review_list)
    }

    pub async fn load_event(&self, id: Uuid) -> Result<Event, AppError> {
        self.store
            .get_event(id)
            .await?
            .ok_or_else(|| AppError::not_found("Event"))
    }
}
