// web-client/src/guard.rs
use crate::session::{SessionManager, SessionState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision<V> {
    /// Session still loading; show a neutral placeholder
    Placeholder,
    /// Not signed in; go to this path. The attempted destination is dropped.
    Redirect(String),
    Render(V),
}

/// Gates protected views on the session state.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    sign_in_path: String,
}

impl RouteGuard {
    pub fn new(sign_in_path: &str) -> Self {
        Self {
            sign_in_path: sign_in_path.to_string(),
        }
    }

    pub fn sign_in_path(&self) -> &str {
        &self.sign_in_path
    }

    pub fn check<V>(&self, state: &SessionState, view: V) -> GuardDecision<V> {
        match state {
            SessionState::Loading => GuardDecision::Placeholder,
            SessionState::Unauthenticated => GuardDecision::Redirect(self.sign_in_path.clone()),
            SessionState::Authenticated(_) => GuardDecision::Render(view),
        }
    }

    /// Like [`check`](Self::check), but never answers `Placeholder`.
    pub async fn resolve<V>(&self, session: &SessionManager, view: V) -> GuardDecision<V> {
        let state = session.ready().await;
        self.check(&state, view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use common::{Principal, Role};
    use crate::storage::MemoryStorage;
    use crate::store::CredentialStore;

    #[test]
    fn test_check_maps_each_state() {
        let guard = RouteGuard::new("/login");

        assert_eq!(guard.check(&SessionState::Loading, "tasks"), GuardDecision::Placeholder);
        assert_eq!(
            guard.check(&SessionState::Unauthenticated, "tasks"),
            GuardDecision::Redirect("/login".to_string())
        );
        assert_eq!(
            guard.check(&SessionState::Authenticated(Principal::new(1, Role::Staff)), "tasks"),
            GuardDecision::Render("tasks")
        );
    }

    #[tokio::test]
    async fn test_resolve_waits_for_hydrate() {
        let session = Arc::new(SessionManager::new(CredentialStore::new(Arc::new(
            MemoryStorage::new(),
        ))));
        let guard = RouteGuard::new("/login");

        let pending = {
            let session = session.clone();
            let guard = guard.clone();
            tokio::spawn(async move { guard.resolve(&session, "staff").await })
        };
        tokio::task::yield_now().await;

        session.hydrate();
        assert_eq!(pending.await.unwrap(), GuardDecision::Redirect("/login".to_string()));

        session.login("abc.def.ghi", Principal::new(1, Role::Director)).unwrap();
        assert_eq!(guard.resolve(&session, "staff").await, GuardDecision::Render("staff"));
    }
}
