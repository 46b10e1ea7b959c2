use serde_json::Value;
use spares_core::repository::{Collection, Filter};
use spares_shared::pii::Masked;
use tracing::info;

use crate::manager::{fields, require, LifecycleEngine, LifecycleError, LifecycleResult};
use crate::models::{NewUser, Role, User};

impl LifecycleEngine {
    /// Registers a customer. `None` when the e-mail is already taken.
    pub async fn create_user(&self, new: NewUser) -> LifecycleResult<Option<User>> {
        self.register(new, Role::Customer).await
    }

    pub async fn create_admin(&self, new: NewUser) -> LifecycleResult<Option<User>> {
        self.register(new, Role::Admin).await
    }

    async fn register(&self, new: NewUser, role: Role) -> LifecycleResult<Option<User>> {
        require(!new.name.trim().is_empty(), "name is required")?;
        require(new.email.contains('@'), "a valid email is required")?;

        if self.get_user_by_email(&new.email).await?.is_some() {
            return Ok(None);
        }

        let mut user = User {
            id: String::new(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            password_hash: new.password_hash,
            role,
        };
        user.id = self.persist(Collection::Users, &user).await?;
        info!(user_id = %user.id, email = %Masked(&user.email), ?role, "User registered");
        Ok(Some(user))
    }

    pub async fn get_user(&self, user_id: &str) -> LifecycleResult<Option<User>> {
        self.load(Collection::Users, user_id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> LifecycleResult<Option<User>> {
        let mut users: Vec<User> = self
            .load_all(Collection::Users, &[Filter::eq("email", email)])
            .await?;
        Ok(if users.is_empty() {
            None
        } else {
            Some(users.swap_remove(0))
        })
    }

    /// The only way a role changes after registration.
    pub async fn promote_to_admin(&self, user_id: &str) -> LifecycleResult<Option<User>> {
        let Some(mut user) = self.get_user(user_id).await? else {
            return Ok(None);
        };
        if user.role != Role::Admin {
            self.store
                .update(
                    Collection::Users,
                    user_id,
                    fields([("role", Value::from("admin"))]),
                )
                .await?;
            user.role = Role::Admin;
            info!(user_id, "User promoted to admin");
        }
        Ok(Some(user))
    }

    /// Start-up hook: makes sure the configured admin account exists.
    pub async fn ensure_default_admin(&self, new: NewUser) -> LifecycleResult<User> {
        if let Some(existing) = self.get_user_by_email(&new.email).await? {
            return Ok(existing);
        }
        let email = new.email.clone();
        match self.create_admin(new).await? {
            Some(admin) => Ok(admin),
            // Registered concurrently between the lookup and the insert.
            None => self
                .get_user_by_email(&email)
                .await?
                .ok_or_else(|| LifecycleError::Validation(format!("admin {email} could not be created"))),
        }
    }
}
