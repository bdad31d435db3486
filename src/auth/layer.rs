//! Bearer-injection middleware with a single forced-refresh retry on 401.

// self
use crate::{
	_prelude::*,
	auth::TokenManager,
	error::AuthError,
	http::{AUTHORIZATION, Handler, HandlerFuture, Request, Response},
};

const UNAUTHORIZED: u16 = 401;

/// Middleware that stamps each outgoing request with the current bearer token.
///
/// On a 401 the layer assumes the token was revoked or rotated out of band,
/// invalidates the cache, fetches a fresh token, and retries the original
/// request exactly once. A second 401 is elevated to
/// [`AuthError::Unauthorized`]; concurrent callers hitting the same revocation
/// share one refresh through the manager's singleflight guard.
pub struct AuthLayer {
	next: Arc<dyn Handler>,
	manager: Arc<TokenManager>,
}
impl AuthLayer {
	/// Wraps the next layer with bearer injection backed by `manager`.
	pub fn new(next: Arc<dyn Handler>, manager: Arc<TokenManager>) -> Self {
		Self { next, manager }
	}

	async fn send_with_bearer(&self, request: &Request) -> Result<Response> {
		let token = self.manager.get_token().await?;

		self.next.send(request.with_header(AUTHORIZATION, token.bearer())).await
	}
}
impl Handler for AuthLayer {
	fn send(&self, request: Request) -> HandlerFuture<'_> {
		Box::pin(async move {
			let response = self.send_with_bearer(&request).await?;

			if response.status_code != UNAUTHORIZED {
				return Ok(response);
			}

			self.manager.invalidate();

			let retried = self.send_with_bearer(&request).await?;

			if retried.status_code == UNAUTHORIZED {
				return Err(AuthError::Unauthorized.into());
			}

			Ok(retried)
		})
	}
}
impl Debug for AuthLayer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthLayer").field("manager", &self.manager).finish()
	}
}
