//! Sign-in and registration

use tracing::{info, warn};

use super::users::UserService;
use crate::error::{UserError, UserResult};
use crate::jwt::JwtService;
use crate::models::{CreateUserRequest, SignInRequest, SignInResponse, User};
use crate::validation::validate_sign_in;

/// Issues tokens for known credentials and new accounts
#[derive(Clone)]
pub struct AuthService {
    users: UserService,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(users: UserService, jwt: JwtService) -> Self {
        Self { users, jwt }
    }

    /// Authenticate a user by username and password
    ///
    /// An unknown username and a wrong password are indistinguishable to the
    /// caller.
    pub async fn sign_in(&self, request: SignInRequest) -> UserResult<SignInResponse> {
        validate_sign_in(&request).map_err(UserError::Validation)?;

        let user = match self.users.get_by_username(&request.username).await? {
            Some(user) => user,
            None => {
                self.users.passwords().verify_decoy(&request.password);
                warn!(username = %request.username, "Sign-in for unknown user");
                return Err(UserError::InvalidCredentials);
            }
        };

        if !self
            .users
            .passwords()
            .matches(&request.password, &user.password_hash)
        {
            warn!(user_id = user.id, "Sign-in with wrong password");
            return Err(UserError::InvalidCredentials);
        }

        info!(user_id = user.id, "User signed in");
        self.issue(&user)
    }

    /// Create an account and sign it in
    pub async fn register(&self, request: CreateUserRequest) -> UserResult<SignInResponse> {
        let user = self.users.add(request).await?;
        info!(user_id = user.id, "User registered");
        self.issue(&user)
    }

    fn issue(&self, user: &User) -> UserResult<SignInResponse> {
        Ok(SignInResponse {
            token: self.jwt.generate_token(user)?,
            roles: user.role_names(),
        })
    }
}
