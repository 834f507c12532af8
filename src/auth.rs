use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};

use crate::registry::Registry;

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Guard: requires the configured admin token in `X-Admin-Token`.
/// With no token configured every admin-only route is closed.
pub struct AdminToken;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AdminToken {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let expected = request
            .rocket()
            .state::<Registry>()
            .and_then(|r| r.config().admin_token.as_deref())
            .filter(|t| !t.is_empty());
        let given = request.headers().get_one(ADMIN_TOKEN_HEADER);
        match (expected, given) {
            (Some(expected), Some(given)) if token_matches(expected, given) => {
                Outcome::Success(AdminToken)
            }
            _ => Outcome::Error((Status::Forbidden, ())),
        }
    }
}

/// Length-independent comparison so response timing does not leak a matching prefix.
fn token_matches(expected: &str, given: &str) -> bool {
    let (a, b) = (expected.as_bytes(), given.as_bytes());
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= (x ^ y) as usize;
    }
    diff == 0
}
