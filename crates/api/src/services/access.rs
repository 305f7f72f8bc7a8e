//! Ownership checks for user-scoped resources.

use emporium_core::UserId;

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::User;
use crate::services::auth::Identity;

/// Proof that the caller is the user named in the request path.
#[derive(Debug, Clone)]
pub struct Owner {
    user: User,
}

impl Owner {
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user.id
    }

    #[must_use]
    pub const fn user(&self) -> &User {
        &self.user
    }
}

/// Check that `user_id` exists and is the caller.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the user does not exist, then
/// `AppError::Forbidden` if the caller is someone else.
pub async fn authorize(store: &dyn Store, caller: &Identity, user_id: UserId) -> Result<Owner> {
    let user = store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found!".to_string()))?;

    if caller.user_id != user.id {
        tracing::warn!(caller = %caller.user_id, target_user = %user_id, "ownership check failed");
        return Err(AppError::Forbidden(
            "Unauthorized access! You can only access your own cart and orders.".to_string(),
        ));
    }

    Ok(Owner { user })
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the service tests.

    use chrono::Utc;
    use rust_decimal::Decimal;

    use emporium_core::{Category, Email, NewProduct, Phone, Price, Product, UserId};

    use super::{Owner, authorize};
    use crate::db::Store;
    use crate::models::{PostalAddress, User, UserAddress};
    use crate::services::auth::Identity;

    #[allow(clippy::unwrap_used)]
    pub async fn owner(store: &dyn Store, email: &str, phone: &str) -> Owner {
        let now = Utc::now();
        let address = PostalAddress {
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            pincode: 560_001,
        };
        let user = User {
            id: UserId::generate(),
            name: "Ada".to_string(),
            email: Email::parse(email).unwrap(),
            phone: Phone::parse(phone).unwrap(),
            address: UserAddress {
                shipping: address.clone(),
                billing: address,
            },
            created_at: now,
            updated_at: now,
        };
        store.create_user(&user, "unused").await.unwrap();
        authorize(store, &Identity { user_id: user.id }, user.id)
            .await
            .unwrap()
    }

    #[allow(clippy::unwrap_used)]
    pub async fn product(store: &dyn Store, title: &str, units: i64, availability: bool) -> Product {
        let now = Utc::now();
        let category = Category::new(format!("{title} category"), String::new(), now);
        store.create_category(&category).await.unwrap();
        let product = Product::new(
            NewProduct {
                title: title.to_string(),
                description: String::new(),
                price: Price::new(Decimal::new(units, 0)).unwrap(),
                availability,
                category_id: category.id,
            },
            now,
        );
        store.create_product(&product).await.unwrap();
        product
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_missing_user_is_not_found_before_forbidden() {
        let store = MemoryStore::new();
        let caller = Identity {
            user_id: UserId::generate(),
        };
        let err = authorize(&store, &caller, UserId::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_other_users_resource_forbidden() {
        let store = MemoryStore::new();
        let alice = testing::owner(&store, "alice@example.com", "5550100001").await;
        let bob = testing::owner(&store, "bob@example.com", "5550100002").await;

        let caller = Identity {
            user_id: bob.user_id(),
        };
        let err = authorize(&store, &caller, alice.user_id())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
