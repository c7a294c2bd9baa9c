use chrono::Duration;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::{Id, Recipe, User};
use crate::error::{Error, HtmlError};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    /// Server-side session id; logging out deletes it.
    pub jti: String,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(user_id: Id, ttl_hours: i64) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(ttl_hours)).timestamp();

        Self {
            user_id,
            jti: uuid::Uuid::new_v4().simple().to_string(),
            iat,
            exp,
        }
    }
}

/// The authenticated requester.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub user: User,
    pub token_id: String,
}

impl SessionData {
    pub fn user_id(&self) -> Id {
        self.user.id
    }

    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(HtmlError::Forbidden.default());
        }
        Ok(())
    }

    /// Authors may change their own recipes, admins any recipe.
    pub fn authenticate_recipe(&self, recipe: &Recipe) -> Result<(), Error> {
        if recipe.author_id == self.user.id {
            self.authenticate(ActionType::ManageOwnRecipes)
        } else {
            self.authenticate(ActionType::ManageAllRecipes)
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, Error> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|_| HtmlError::InternalServerError.new("Invalid signing key"))
}

/// Signs a new session token; returns the token and its session id.
pub fn generate_jwt_session(
    user: &User,
    secret: &str,
    ttl_hours: i64,
) -> Result<(String, String), Error> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(user.id, ttl_hours);
    let jti = claims.jti.to_owned();

    let token = claims
        .sign_with_key(&key)
        .map_err(|e| HtmlError::InternalServerError.new(&format!("Could not sign token: {e}")))?;

    Ok((token, jti))
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, Error> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| HtmlError::Unauthorized.new("Invalid token."))?;

    if session.exp < Utc::now().timestamp() {
        return Err(HtmlError::Unauthorized.new("Token expired."));
    }
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::UserRole;

    fn user() -> User {
        User {
            id: 7,
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::from("Jamie"),
            last_name: String::from("Cook"),
            password: String::new(),
            role: UserRole::User,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn token_roundtrips_with_the_same_secret() {
        let (token, jti) = generate_jwt_session(&user(), "secret", 1).unwrap();

        let session = verify_jwt_session(&token, "secret").unwrap();
        assert_eq!(session.user_id, 7);
        assert_eq!(session.jti, jti);
    }

    #[test]
    fn token_with_another_secret_is_rejected() {
        let (token, _) = generate_jwt_session(&user(), "secret", 1).unwrap();

        let error = verify_jwt_session(&token, "other").unwrap_err();
        assert!(error.is(HtmlError::Unauthorized));
    }

    #[test]
    fn expired_token_is_rejected() {
        let (token, _) = generate_jwt_session(&user(), "secret", -1).unwrap();

        assert!(verify_jwt_session(&token, "secret").is_err());
    }
}
