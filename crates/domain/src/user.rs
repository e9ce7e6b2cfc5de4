//! User accounts and authentication.

use chrono::Utc;
use storage::{NewUser, Store, StoreTx, User, UserId};

use crate::cart::restocked;
use crate::error::{DomainError, Result};
use crate::password::{hash_password, verify_password};
use crate::token::{Claims, TokenIssuer};

/// Account fields supplied on registration and update. `password` is plain
/// text and is hashed before it reaches the store.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub address: String,
}

/// A successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Service for user accounts.
pub struct UserService<S: Store> {
    store: S,
    tokens: TokenIssuer,
}

impl<S: Store> UserService<S> {
    pub fn new(store: S, tokens: TokenIssuer) -> Self {
        Self { store, tokens }
    }

    #[tracing::instrument(skip(self, profile), fields(username = %profile.username))]
    pub async fn register(&self, profile: UserProfile) -> Result<User> {
        if self.store.username_taken(&profile.username).await? {
            return Err(DomainError::conflict("username already taken"));
        }
        if self.store.email_taken(&profile.email).await? {
            return Err(DomainError::conflict("email already taken"));
        }

        let password_hash = hash_password(&profile.password)?;
        let user = self
            .store
            .create_user(NewUser {
                name: profile.name,
                username: profile.username,
                password_hash,
                email: profile.email,
                address: profile.address,
                joined_at: Utc::now(),
            })
            .await?;

        metrics::counter!("users_registered_total").increment(1);
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Checks credentials and issues a bearer token.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let rejected = || DomainError::unauthorized("invalid username or password");

        let user = self
            .store
            .get_user_by_username(username)
            .await?
            .ok_or_else(rejected)?;
        if !verify_password(&user.password_hash, password)? {
            tracing::warn!(%username, "login rejected");
            return Err(rejected());
        }

        let token = self.tokens.issue(&user)?;
        Ok(Session { token, user })
    }

    /// Verifies a bearer token.
    pub fn authenticate(&self, token: &str) -> Result<Claims> {
        self.tokens.verify(token)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_user(&self, id: UserId) -> Result<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or(DomainError::NotFound("user"))
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.store.list_users().await?)
    }

    /// Replaces the account fields. Username and email are only checked for
    /// conflicts when they change.
    #[tracing::instrument(skip(self, profile))]
    pub async fn update_user(&self, id: UserId, profile: UserProfile) -> Result<User> {
        let existing = self.get_user(id).await?;

        if profile.username != existing.username
            && self.store.username_taken(&profile.username).await?
        {
            return Err(DomainError::conflict("username already taken"));
        }
        if profile.email != existing.email && self.store.email_taken(&profile.email).await? {
            return Err(DomainError::conflict("email already taken"));
        }

        let user = User {
            name: profile.name,
            username: profile.username,
            password_hash: hash_password(&profile.password)?,
            email: profile.email,
            address: profile.address,
            ..existing
        };
        self.store.update_user(&user).await?;
        tracing::info!(user_id = %id, "user updated");
        Ok(user)
    }

    /// Deletes a user. Every reservation in their cart goes back onto the
    /// books before the user, their favourites, cart and orders are removed.
    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, id: UserId) -> Result<()> {
        let mut tx = self.store.begin().await?;
        if !tx.user_exists(id).await? {
            return Err(DomainError::NotFound("user"));
        }

        let entries = tx.cart_entries(id).await?;
        for entry in &entries {
            if let Some(book) = tx.get_book(entry.book_id).await? {
                tx.set_book_quantity(book.id, restocked(&book, entry)?)
                    .await?;
            }
        }
        tx.delete_user(id).await?;
        tx.commit().await?;

        if !entries.is_empty() {
            metrics::counter!("cart_releases_total").increment(entries.len() as u64);
        }
        tracing::info!(user_id = %id, released = entries.len(), "user deleted");
        Ok(())
    }
}
