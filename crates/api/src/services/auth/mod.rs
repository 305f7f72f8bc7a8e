//! Authentication service.
//!
//! Password registration and login, plus bearer token issue/verify.

mod error;
mod token;

pub use error::AuthError;
pub use token::{Identity, IssuedToken, TokenSigner};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use serde::Deserialize;

use emporium_core::{Email, Phone, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::{PostalAddress, User, UserAddress};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 15;

/// Registration form. Every field is optional at the type level so that a
/// missing field yields a specific message rather than a generic parse error.
#[derive(Debug, Default, Deserialize)]
pub struct Registration {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub address: Option<AddressForm>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddressForm {
    pub shipping: Option<PostalForm>,
    pub billing: Option<PostalForm>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostalForm {
    pub street: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<u32>,
}

/// Authentication service.
pub struct AuthService<'a> {
    store: &'a dyn Store,
    tokens: &'a TokenSigner,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store, tokens: &'a TokenSigner) -> Self {
        Self { store, tokens }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` for absent or blank fields,
    /// `AuthError::InvalidEmail`/`InvalidPhone`/`WeakPassword` for bad
    /// values, and `AuthError::UserAlreadyExists` if the email or phone is
    /// already registered.
    pub async fn register(&self, form: Registration) -> Result<User, AuthError> {
        let name = required(form.name, "Name")?;
        let email = Email::parse(&required(form.email, "Email")?)?;
        let phone = Phone::parse(&required(form.phone, "Phone")?)?;
        let password = form
            .password
            .filter(|p| !p.is_empty())
            .ok_or(AuthError::MissingField("Password"))?;
        validate_password(&password)?;

        let address = form.address.ok_or(AuthError::MissingField("Address"))?;
        let address = UserAddress {
            shipping: postal(address.shipping, "Shipping address")?,
            billing: postal(address.billing, "Billing address")?,
        };

        let password_hash = hash_password(&password)?;
        let now = Utc::now();
        let user = User {
            id: UserId::generate(),
            name,
            email,
            phone,
            address,
            created_at: now,
            updated_at: now,
        };

        self.store
            .create_user(&user, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(field) if field == "phone" => {
                    AuthError::UserAlreadyExists("Phone number")
                }
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists("Email"),
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Login with email and password, returning the user and a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or the
    /// password is wrong.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, IssuedToken), AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .store
            .get_user_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let token = self.tokens.issue(user.id, Utc::now())?;
        Ok((user, token))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn required(value: Option<String>, field: &'static str) -> Result<String, AuthError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingField(field))
}

fn postal(form: Option<PostalForm>, field: &'static str) -> Result<PostalAddress, AuthError> {
    let form = form.ok_or(AuthError::MissingField(field))?;
    Ok(PostalAddress {
        street: required(form.street, "Street")?,
        city: required(form.city, "City")?,
        pincode: form.pincode.ok_or(AuthError::MissingField("Pincode"))?,
    })
}

/// 8-15 characters with at least one lowercase, uppercase, digit, and symbol.
fn validate_password(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&len) {
        return Err(AuthError::WeakPassword(format!(
            "Password must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH} characters!"
        )));
    }
    if password.chars().any(char::is_whitespace) {
        return Err(AuthError::WeakPassword(
            "Password must not contain spaces!".to_string(),
        ));
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| !c.is_alphanumeric());
    if !(has_lower && has_upper && has_digit && has_symbol) {
        return Err(AuthError::WeakPassword(
            "Password must contain an uppercase letter, a lowercase letter, a number, and a special character!"
                .to_string(),
        ));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use secrecy::SecretString;

    use super::*;
    use crate::db::MemoryStore;

    fn signer() -> TokenSigner {
        TokenSigner::new(
            SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6!"),
            Duration::hours(1),
        )
    }

    fn postal_form() -> PostalForm {
        PostalForm {
            street: Some("1 Main St".to_string()),
            city: Some("Springfield".to_string()),
            pincode: Some(560_001),
        }
    }

    fn registration(email: &str, phone: &str) -> Registration {
        Registration {
            name: Some("Ada".to_string()),
            email: Some(email.to_string()),
            phone: Some(phone.to_string()),
            password: Some("Passw0rd!".to_string()),
            address: Some(AddressForm {
                shipping: Some(postal_form()),
                billing: Some(postal_form()),
            }),
        }
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("Passw0rd!").is_ok());
        assert!(validate_password("Pa0!").is_err());
        assert!(validate_password("Passw0rd!Passw0rd!").is_err());
        assert!(validate_password("password0!").is_err());
        assert!(validate_password("PASSWORD0!").is_err());
        assert!(validate_password("Password!!").is_err());
        assert!(validate_password("Password00").is_err());
        assert!(validate_password("Pass w0rd!").is_err());
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Passw0rd!").unwrap();
        assert!(verify_password("Passw0rd!", &hash).is_ok());
        assert!(matches!(
            verify_password("Passw0rd?", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let tokens = signer();
        let auth = AuthService::new(&store, &tokens);

        let user = auth
            .register(registration("Ada@Example.com", "+1 555 010 0000"))
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "ada@example.com");

        let (logged_in, issued) = auth.login("ada@example.com", "Passw0rd!").await.unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(tokens.verify(&issued.token, Utc::now()).unwrap().user_id, user.id);

        assert!(matches!(
            auth.login("ada@example.com", "Wr0ng!pass").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", "Passw0rd!").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_and_phone() {
        let store = MemoryStore::new();
        let tokens = signer();
        let auth = AuthService::new(&store, &tokens);

        auth.register(registration("ada@example.com", "5550100000"))
            .await
            .unwrap();

        let err = auth
            .register(registration("ADA@example.com", "5550100001"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists("Email")));

        let err = auth
            .register(registration("grace@example.com", "(555) 010-0000"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists("Phone number")));
    }

    #[tokio::test]
    async fn test_missing_fields_named() {
        let store = MemoryStore::new();
        let tokens = signer();
        let auth = AuthService::new(&store, &tokens);

        let mut form = registration("ada@example.com", "5550100000");
        form.name = Some("   ".to_string());
        assert!(matches!(
            auth.register(form).await,
            Err(AuthError::MissingField("Name"))
        ));

        let mut form = registration("ada@example.com", "5550100000");
        form.address = Some(AddressForm {
            shipping: Some(postal_form()),
            billing: None,
        });
        assert!(matches!(
            auth.register(form).await,
            Err(AuthError::MissingField("Billing address"))
        ));
    }
}
