use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{self, AuthService},
    db::DbPool,
    entities::{user, UserRole},
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 3, max = 60, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub nombre: Option<String>,
    pub rol: Option<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Partial profile update; a supplied password is re-hashed.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub nombre: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub rol: Option<UserRole>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub nombre: Option<String>,
    pub email: String,
    pub username: String,
    pub rol: UserRole,
    pub creado_en: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            nombre: model.name,
            email: model.email,
            username: model.username,
            rol: model.role,
            creado_en: model.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub usuario: UserResponse,
    pub token: String,
}

/// User registration, login, and profile management.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DbPool>,
    auth: Arc<AuthService>,
    event_sender: Option<Arc<EventSender>>,
}

impl UserService {
    pub fn new(
        db: Arc<DbPool>,
        auth: Arc<AuthService>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            auth,
            event_sender,
        }
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterUserRequest) -> Result<UserResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db;

        let email_taken = user::Entity::find()
            .filter(user::Column::Email.eq(request.email.clone()))
            .one(db)
            .await?
            .is_some();
        if email_taken {
            return Err(ServiceError::Conflict("Email already registered".to_string()));
        }

        let username_taken = user::Entity::find()
            .filter(user::Column::Username.eq(request.username.clone()))
            .one(db)
            .await?
            .is_some();
        if username_taken {
            return Err(ServiceError::Conflict(
                "Username already registered".to_string(),
            ));
        }

        let password_hash = auth::hash_password(&request.password)?;
        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(request.email),
            username: Set(request.username),
            name: Set(request.nombre),
            password_hash: Set(password_hash),
            role: Set(request.rol.unwrap_or_default()),
            created_at: Set(Utc::now()),
            deleted_at: Set(None),
        }
        .insert(db)
        .await?;

        info!(user_id = %model.id, username = %model.username, "user registered");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::UserRegistered(model.id)).await {
                warn!(error = %e, "failed to send user registered event");
            }
        }

        Ok(model.into())
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        let user = user::Entity::find()
            .filter(user::Column::Username.eq(request.username.clone()))
            .filter(user::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        if !auth::verify_password(&user.password_hash, &request.password)? {
            return Err(ServiceError::Unauthorized("Incorrect password".to_string()));
        }

        let token = self.auth.issue_token(&user)?;
        info!(user_id = %user.id, "user logged in");

        Ok(LoginResponse {
            usuario: user.into(),
            token,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserResponse>, ServiceError> {
        let users = user::Entity::find()
            .filter(user::Column::DeletedAt.is_null())
            .order_by_asc(user::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(users.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserResponse, ServiceError> {
        self.find_active(user_id).await.map(Into::into)
    }

    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn update_user(
        &self,
        user_id: Uuid,
        request: UpdateUserRequest,
    ) -> Result<UserResponse, ServiceError> {
        let user = self.find_active(user_id).await?;

        let mut active: user::ActiveModel = user.into();
        if let Some(nombre) = request.nombre {
            active.name = Set(Some(nombre));
        }
        if let Some(email) = request.email {
            active.email = Set(email);
        }
        if let Some(password) = request.password {
            active.password_hash = Set(auth::hash_password(&password)?);
        }
        if let Some(rol) = request.rol {
            active.role = Set(rol);
        }

        let model = active.update(&*self.db).await?;
        info!(user_id = %user_id, "user updated");
        Ok(model.into())
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn delete_user(&self, user_id: Uuid) -> Result<Uuid, ServiceError> {
        let user = self.find_active(user_id).await?;

        let mut active: user::ActiveModel = user.into();
        active.deleted_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;

        info!(user_id = %user_id, "user soft-deleted");
        Ok(user_id)
    }

    async fn find_active(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .filter(user::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }
}
