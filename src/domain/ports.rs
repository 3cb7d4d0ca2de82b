use crate::domain::model::{SessionState, TokenPair};
use crate::utils::error::Result;

/// Persisted session: the token pair plus the selected city.
///
/// Implementations serialize `update` calls, so concurrent writers never
/// lose each other's changes.
pub trait SessionStore: Send + Sync {
    fn snapshot(&self) -> SessionState;
    fn update(&self, apply: &mut dyn FnMut(&mut SessionState)) -> Result<()>;

    fn access_token(&self) -> Option<String> {
        self.snapshot().access_token
    }

    fn refresh_token(&self) -> Option<String> {
        self.snapshot().refresh_token
    }

    fn city_id(&self) -> Option<i64> {
        self.snapshot().city_id
    }

    fn set_tokens(&self, pair: &TokenPair) -> Result<()> {
        self.update(&mut |state| {
            state.access_token = Some(pair.access.clone());
            state.refresh_token = Some(pair.refresh.clone());
        })
    }

    fn set_access_token(&self, token: &str) -> Result<()> {
        self.update(&mut |state| state.access_token = Some(token.to_string()))
    }

    fn set_refresh_token(&self, token: &str) -> Result<()> {
        self.update(&mut |state| state.refresh_token = Some(token.to_string()))
    }

    fn clear_tokens(&self) -> Result<()> {
        self.update(&mut |state| {
            state.access_token = None;
            state.refresh_token = None;
        })
    }

    fn set_city_id(&self, city_id: i64) -> Result<()> {
        self.update(&mut |state| state.city_id = Some(city_id))
    }
}
