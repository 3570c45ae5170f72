//! Input validation utilities

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::models::{CreateUserRequest, PatchUserRequest, SignInRequest};

const USERNAME_MAX_LEN: usize = 50;
const EMAIL_MAX_LEN: usize = 254;
const PASSWORD_MAX_LEN: usize = 128;
const NAME_MAX_LEN: usize = 100;

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.trim().is_empty() {
        return Err("Username is required".to_string());
    }

    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(format!(
            "Username must be at most {} characters long",
            USERNAME_MAX_LEN
        ));
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > EMAIL_MAX_LEN {
        return Err(format!(
            "Email must be at most {} characters long",
            EMAIL_MAX_LEN
        ));
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Email should be valid".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.trim().is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() > PASSWORD_MAX_LEN {
        return Err(format!(
            "Password must be at most {} characters long",
            PASSWORD_MAX_LEN
        ));
    }

    Ok(())
}

/// Validate an optional first or last name
pub fn validate_name(name: Option<&str>) -> Result<(), String> {
    match name {
        Some(name) if name.chars().count() > NAME_MAX_LEN => Err(format!(
            "Must be at most {} characters long",
            NAME_MAX_LEN
        )),
        _ => Ok(()),
    }
}

/// Validate a role name list
pub fn validate_roles(roles: Option<&[String]>) -> Result<(), String> {
    let roles = roles.ok_or_else(|| "Role is required".to_string())?;

    if roles.is_empty() {
        return Err("At least one role is required".to_string());
    }

    if roles.iter().any(|r| r.trim().is_empty()) {
        return Err("Role names must not be blank".to_string());
    }

    Ok(())
}

/// Collects violations in field order
#[derive(Default)]
struct Violations(Vec<FieldViolation>);

impl Violations {
    fn check(&mut self, field: &'static str, result: Result<(), String>) {
        if let Err(message) = result {
            self.0.push(FieldViolation::new(field, message));
        }
    }

    fn finish(self) -> Result<(), Vec<FieldViolation>> {
        if self.0.is_empty() { Ok(()) } else { Err(self.0) }
    }
}

/// Validate a create (or full update) request; every field is checked
pub fn validate_create(request: &CreateUserRequest) -> Result<(), Vec<FieldViolation>> {
    let mut violations = Violations::default();
    violations.check("username", validate_username(&request.username));
    violations.check("email", validate_email(&request.email));
    violations.check("password", validate_password(&request.password));
    violations.check("firstname", validate_name(request.firstname.as_deref()));
    violations.check("lastname", validate_name(request.lastname.as_deref()));
    violations.check("roles", validate_roles(request.roles.as_deref()));
    violations.finish()
}

/// Validate only the fields a patch carries
pub fn validate_patch(patch: &PatchUserRequest) -> Result<(), Vec<FieldViolation>> {
    let mut violations = Violations::default();
    if let Some(username) = &patch.username {
        violations.check("username", validate_username(username));
    }
    if let Some(email) = &patch.email {
        violations.check("email", validate_email(email));
    }
    if let Some(password) = &patch.password {
        violations.check("password", validate_password(password));
    }
    if let Some(firstname) = &patch.firstname {
        violations.check("firstname", validate_name(firstname.as_deref()));
    }
    if let Some(lastname) = &patch.lastname {
        violations.check("lastname", validate_name(lastname.as_deref()));
    }
    if let Some(roles) = &patch.roles {
        violations.check("roles", validate_roles(Some(roles.as_slice())));
    }
    violations.finish()
}

/// Validate sign-in credentials
pub fn validate_sign_in(request: &SignInRequest) -> Result<(), Vec<FieldViolation>> {
    let mut violations = Violations::default();
    if request.username.trim().is_empty() {
        violations.check("username", Err("Username is required".to_string()));
    }
    if request.password.is_empty() {
        violations.check("password", Err("Password is required".to_string()));
    }
    violations.finish()
}
