use std::sync::Arc;

use taller_auth::CredentialVerifier;
use taller_core::TallerApp;

pub struct TallerAxumState<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    pub app: TallerApp<R, P>,
    pub verifier: Arc<dyn CredentialVerifier>,
}

impl<R, P> Clone for TallerAxumState<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    fn clone(&self) -> Self {
        Self {
            app: self.app.clone(),
            verifier: Arc::clone(&self.verifier),
        }
    }
}

impl<R, P> TallerAxumState<R, P>
where
    R: Send + 'static,
    P: Send + Clone + 'static,
{
    pub fn new(app: TallerApp<R, P>, verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { app, verifier }
    }
}
