use crate::{
    auth::{hash_password, verify_password, AccessToken, AuthService},
    db::DbPool,
    entities::branch::{self, Entity as BranchEntity},
    entities::user::{self, Entity as UserEntity, UserRole},
    entities::voucher::{self, Entity as VoucherEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::email::Mailer,
};
use chrono::{Duration, Utc};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const VERIFICATION_CODE_LEN: usize = 6;
const REGISTRATION_CODE_TTL_HOURS: i64 = 1;
const RESET_CODE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct LoginResult {
    pub token: AccessToken,
    pub user: UserSummary,
}

/// Account store: credentials, verification state, profile, the cart map and
/// saved vouchers all live on the user record.
#[derive(Clone)]
pub struct AccountService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    auth: Arc<AuthService>,
    mailer: Arc<dyn Mailer>,
    client_url: String,
}

impl AccountService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        auth: Arc<AuthService>,
        mailer: Arc<dyn Mailer>,
        client_url: String,
    ) -> Self {
        Self {
            db,
            event_sender,
            auth,
            mailer,
            client_url,
        }
    }

    /// Registers an account and mails a verification link. The account stays
    /// unverified (and unable to log in) until the code is confirmed.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<(), ServiceError> {
        let existing = UserEntity::find()
            .filter(user::Column::Email.eq(&input.email))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::ValidationError(
                "Email already registered".to_string(),
            ));
        }

        if !password_is_strong(&input.password) {
            return Err(ServiceError::ValidationError(
                "Password must be at least 8 characters with an uppercase letter, a digit and a symbol"
                    .to_string(),
            ));
        }

        let user_id = Uuid::new_v4();
        let code = generate_verification_code();
        let now = Utc::now();

        user::ActiveModel {
            id: Set(user_id),
            name: Set(input.name),
            email: Set(input.email.clone()),
            password_hash: Set(hash_password(&input.password)?),
            role: Set(UserRole::Customer),
            phone: Set(None),
            address: Set(None),
            date_of_birth: Set(None),
            image: Set(None),
            cart_data: Set(json!({})),
            saved_vouchers: Set(json!([])),
            email_verified: Set(false),
            verification_code: Set(Some(code.clone())),
            verification_expires: Set(Some(now + Duration::hours(REGISTRATION_CODE_TTL_HOURS))),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&*self.db)
        .await?;

        let link = format!("{}/confirm/{}", self.client_url, code);
        self.mailer
            .send(
                &input.email,
                "Confirm your account",
                &format!(
                    "<p>Hello,</p>\
                     <p>Thanks for signing up. Click the link below to confirm your account:</p>\
                     <p><a href=\"{link}\">Confirm email</a></p>"
                ),
            )
            .await?;

        info!(user_id = %user_id, "Account registered");
        self.event_sender
            .send_or_log(Event::UserRegistered(user_id))
            .await;
        Ok(())
    }

    /// Confirms the e-mailed verification code and marks the account verified.
    #[instrument(skip(self, code))]
    pub async fn confirm_email(&self, code: &str) -> Result<(), ServiceError> {
        let user = UserEntity::find()
            .filter(user::Column::VerificationCode.eq(code))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::BadRequest("Verification code is invalid or expired".to_string())
            })?;

        if let Some(expires) = user.verification_expires {
            if expires < Utc::now() {
                return Err(ServiceError::BadRequest(
                    "Verification code has expired".to_string(),
                ));
            }
        }

        let user_id = user.id;
        let mut active: user::ActiveModel = user.into();
        active.email_verified = Set(true);
        active.verification_code = Set(None);
        active.verification_expires = Set(None);
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;

        info!(user_id = %user_id, "Email confirmed");
        self.event_sender
            .send_or_log(Event::UserVerified(user_id))
            .await;
        Ok(())
    }

    /// Verifies credentials and issues an access token. Managers also get
    /// their branch id resolved from the branch collection.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResult, ServiceError> {
        let user = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::AuthError("User doesn't exist".to_string()))?;

        if !user.email_verified {
            return Err(ServiceError::AuthError("Email not verified".to_string()));
        }

        if !verify_password(password, &user.password_hash)? {
            return Err(ServiceError::AuthError("Invalid credentials".to_string()));
        }

        let token = self
            .auth
            .generate_token(user.id, &user.email, user.role)
            .map_err(|e| ServiceError::AuthError(e.to_string()))?;

        let branch_id = if user.role == UserRole::Manager {
            BranchEntity::find()
                .filter(branch::Column::ManagerId.eq(user.id))
                .one(&*self.db)
                .await?
                .map(|b| b.id)
        } else {
            None
        };

        info!(user_id = %user.id, "Login successful");
        Ok(LoginResult {
            token,
            user: UserSummary {
                id: user.id,
                name: user.name,
                email: user.email,
                role: user.role,
                branch_id,
            },
        })
    }

    /// Sends a one-time password-reset code.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn forgot_password(&self, email: &str) -> Result<(), ServiceError> {
        let user = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Email is not registered".to_string()))?;

        let code = generate_verification_code();
        let email = user.email.clone();
        let mut active: user::ActiveModel = user.into();
        active.verification_code = Set(Some(code.clone()));
        active.verification_expires =
            Set(Some(Utc::now() + Duration::minutes(RESET_CODE_TTL_MINUTES)));
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;

        self.mailer
            .send(
                &email,
                "Password reset code",
                &format!("<p>Your password reset code is: <b>{code}</b></p>"),
            )
            .await?;

        Ok(())
    }

    /// Redeems a reset code and replaces the password.
    #[instrument(skip(self, code, new_password), fields(email = %email))]
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        let user = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Email is not registered".to_string()))?;

        match &user.verification_code {
            Some(stored) if stored == code => {}
            _ => {
                return Err(ServiceError::BadRequest(
                    "Verification code is incorrect".to_string(),
                ))
            }
        }
        if let Some(expires) = user.verification_expires {
            if expires < Utc::now() {
                return Err(ServiceError::BadRequest(
                    "Verification code has expired, request a new one".to_string(),
                ));
            }
        }
        if !password_is_strong(new_password) {
            return Err(ServiceError::ValidationError(
                "Password must be at least 8 characters with an uppercase letter, a digit and a symbol"
                    .to_string(),
            ));
        }

        let user_id = user.id;
        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(hash_password(new_password)?);
        active.verification_code = Set(None);
        active.verification_expires = Set(None);
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;

        info!(user_id = %user_id, "Password reset");
        Ok(())
    }

    /// Changes the password of an authenticated account.
    #[instrument(skip(self, old_password, new_password))]
    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        let user = self.get_user(user_id).await?;

        if !verify_password(old_password, &user.password_hash)? {
            return Err(ServiceError::BadRequest(
                "Old password is incorrect".to_string(),
            ));
        }
        if old_password == new_password {
            return Err(ServiceError::BadRequest(
                "New password must differ from the old one".to_string(),
            ));
        }
        if !password_is_strong(new_password) {
            return Err(ServiceError::ValidationError(
                "Password must be at least 8 characters with an uppercase letter, a digit and a symbol"
                    .to_string(),
            ));
        }

        let mut active: user::ActiveModel = user.into();
        active.password_hash = Set(hash_password(new_password)?);
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;

        info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        UserEntity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<user::Model>, ServiceError> {
        UserEntity::find().all(&*self.db).await.map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn remove_user(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let result = UserEntity::delete_by_id(user_id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("User not found".to_string()));
        }
        self.event_sender
            .send_or_log(Event::UserRemoved(user_id))
            .await;
        Ok(())
    }

    #[instrument(skip(self, input))]
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        input: UpdateProfileInput,
    ) -> Result<user::Model, ServiceError> {
        let user = self.get_user(user_id).await?;
        let mut active: user::ActiveModel = user.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(phone) = input.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(address) = input.address {
            active.address = Set(Some(address));
        }
        if let Some(date_of_birth) = input.date_of_birth {
            active.date_of_birth = Set(Some(date_of_birth));
        }
        if let Some(image) = input.image {
            active.image = Set(Some(image));
        }
        active.updated_at = Set(Some(Utc::now()));

        active.update(&*self.db).await.map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn update_role(
        &self,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<user::Model, ServiceError> {
        let user = self.get_user(user_id).await?;
        let mut active: user::ActiveModel = user.into();
        active.role = Set(role);
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await.map_err(Into::into)
    }

    // ----- Saved vouchers -----

    /// Saves a voucher reference on the account; duplicates are refused.
    #[instrument(skip(self))]
    pub async fn save_voucher(&self, user_id: Uuid, voucher_id: Uuid) -> Result<(), ServiceError> {
        let user = self.get_user(user_id).await?;
        let mut saved = voucher_ids(&user.saved_vouchers);
        if saved.contains(&voucher_id) {
            return Err(ServiceError::BadRequest(
                "Voucher is already saved".to_string(),
            ));
        }
        saved.push(voucher_id);

        let mut active: user::ActiveModel = user.into();
        active.saved_vouchers = Set(json!(saved));
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove_saved_voucher(
        &self,
        user_id: Uuid,
        voucher_id: Uuid,
    ) -> Result<(), ServiceError> {
        let user = self.get_user(user_id).await?;
        let saved: Vec<Uuid> = voucher_ids(&user.saved_vouchers)
            .into_iter()
            .filter(|id| *id != voucher_id)
            .collect();

        let mut active: user::ActiveModel = user.into();
        active.saved_vouchers = Set(json!(saved));
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;
        Ok(())
    }

    /// Resolves the saved voucher ids to full voucher records.
    #[instrument(skip(self))]
    pub async fn saved_vouchers(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<voucher::Model>, ServiceError> {
        let user = self.get_user(user_id).await?;
        let ids = voucher_ids(&user.saved_vouchers);
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        VoucherEntity::find()
            .filter(voucher::Column::Id.is_in(ids))
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    // ----- Cart -----

    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<Value, ServiceError> {
        let user = self.get_user(user_id).await?;
        Ok(user.cart_data)
    }

    /// Increments the quantity of an item in the cart map.
    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, user_id: Uuid, item_id: &str) -> Result<Value, ServiceError> {
        let user = self.get_user(user_id).await?;
        let mut cart = cart_map(&user.cart_data);
        let quantity = cart.get(item_id).and_then(Value::as_i64).unwrap_or(0);
        cart.insert(item_id.to_string(), json!(quantity + 1));

        self.store_cart(user, cart).await
    }

    /// Decrements the quantity of an item, dropping it at zero.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(
        &self,
        user_id: Uuid,
        item_id: &str,
    ) -> Result<Value, ServiceError> {
        let user = self.get_user(user_id).await?;
        let mut cart = cart_map(&user.cart_data);
        let quantity = cart.get(item_id).and_then(Value::as_i64).unwrap_or(0);
        if quantity <= 1 {
            cart.remove(item_id);
        } else {
            cart.insert(item_id.to_string(), json!(quantity - 1));
        }

        self.store_cart(user, cart).await
    }

    /// Resets the cart map to empty. Unconditional: callers invoke this as a
    /// side effect of order creation with no compensating action.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let user = self.get_user(user_id).await?;
        let mut active: user::ActiveModel = user.into();
        active.cart_data = Set(json!({}));
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartCleared(user_id))
            .await;
        Ok(())
    }

    async fn store_cart(
        &self,
        user: user::Model,
        cart: Map<String, Value>,
    ) -> Result<Value, ServiceError> {
        let cart_value = Value::Object(cart);
        let mut active: user::ActiveModel = user.into();
        active.cart_data = Set(cart_value.clone());
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;
        Ok(cart_value)
    }
}

fn cart_map(value: &Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn voucher_ids(value: &Value) -> Vec<Uuid> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .filter_map(|s| match Uuid::parse_str(s) {
                    Ok(id) => Some(id),
                    Err(_) => {
                        warn!(raw = %s, "Skipping malformed voucher id on account");
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

fn generate_verification_code() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(VERIFICATION_CODE_LEN)
        .map(char::from)
        .collect()
}

/// At least 8 characters with an uppercase letter, a digit and a symbol.
fn password_is_strong(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| !c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_strength_rules() {
        assert!(password_is_strong("Str0ng!pass"));
        assert!(password_is_strong("Short1!A"));
        assert!(!password_is_strong("Sh0rt!"));
        assert!(!password_is_strong("alllowercase1!"));
        assert!(!password_is_strong("NoDigits!!"));
        assert!(!password_is_strong("NoSymbols123"));
    }

    #[test]
    fn verification_codes_are_six_alphanumerics() {
        let code = generate_verification_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn malformed_voucher_ids_are_skipped() {
        let value = json!(["not-a-uuid", "7be2f498-4d28-47fb-a348-7977a0c0f3bb"]);
        let ids = voucher_ids(&value);
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn cart_map_tolerates_non_object_values() {
        assert!(cart_map(&json!(null)).is_empty());
        assert_eq!(cart_map(&json!({"p1": 2})).get("p1"), Some(&json!(2)));
    }
}
