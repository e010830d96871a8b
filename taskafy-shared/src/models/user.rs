/// Users and tasker profiles
///
/// Every account is a row in `users`. Taskers additionally own a single
/// `tasker_profiles` row holding their rates, skills, and cached reputation
/// (`completed_tasks`, `average_rating`, `total_reviews`).
///
/// Email uniqueness is case-insensitive (`UNIQUE (LOWER(email))`); callers
/// store the address lowercased and look it up with `LOWER(email) = LOWER($1)`.
///
/// # Example
///
/// ```no_run
/// use taskafy_shared::models::user::{CreateUser, Country, Language, User, UserRole};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "awa@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     full_name: "Awa Diallo".to_string(),
///     phone: None,
///     role: UserRole::Tasker,
///     language: Language::Fr,
///     country: Country::Senegal,
///     address: None,
///     city: Some("Dakar".to_string()),
/// })
/// .await?;
///
/// let found = User::find_by_email(&pool, "AWA@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Client,
    Tasker,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Client => "client",
            UserRole::Tasker => "tasker",
            UserRole::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(UserRole::Client),
            "tasker" => Ok(UserRole::Tasker),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("Invalid role: {}", other)),
        }
    }
}

/// Preferred interface language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_language", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Fr,
}

/// Supported markets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_country", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Country {
    #[default]
    IvoryCoast,
    Senegal,
}

const USER_COLUMNS: &str = "id, email, password_hash, full_name, phone, role, language, country, \
     address, city, latitude, longitude, is_active, is_verified, coin_balance, \
     created_at, updated_at, last_login_at";

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,

    /// Argon2id PHC string; never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub language: Language,
    pub country: Country,
    pub address: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: bool,
    pub is_verified: bool,
    pub coin_balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub language: Language,
    pub country: Country,
    pub address: Option<String>,
    pub city: Option<String>,
}

/// Partial profile update; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub language: Option<Language>,
    pub country: Option<Country>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.phone.is_none()
            && self.language.is_none()
            && self.country.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
    }
}

impl User {
    /// Inserts a user; runs inside the registration transaction
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        data: CreateUser,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (email, password_hash, full_name, phone, role, language, country, address, city)
            VALUES (LOWER($1), $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.full_name)
            .bind(data.phone)
            .bind(data.role)
            .bind(data.language)
            .bind(data.country)
            .bind(data.address)
            .bind(data.city)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Case-insensitive lookup
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Fetches a user only if they hold `role`
    pub async fn find_with_role(
        pool: &PgPool,
        id: Uuid,
        role: UserRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND role = $2");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(role)
            .fetch_optional(pool)
            .await
    }

    /// Applies a partial update
    ///
    /// Returns `None` if the user doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        let mut push = |column: &str, present: bool| {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        };
        push("full_name", data.full_name.is_some());
        push("phone", data.phone.is_some());
        push("language", data.language.is_some());
        push("country", data.country.is_some());
        push("address", data.address.is_some());
        push("city", data.city.is_some());
        push("latitude", data.latitude.is_some());
        push("longitude", data.longitude.is_some());

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(full_name) = data.full_name {
            q = q.bind(full_name);
        }
        if let Some(phone) = data.phone {
            q = q.bind(phone);
        }
        if let Some(language) = data.language {
            q = q.bind(language);
        }
        if let Some(country) = data.country {
            q = q.bind(country);
        }
        if let Some(address) = data.address {
            q = q.bind(address);
        }
        if let Some(city) = data.city {
            q = q.bind(city);
        }
        if let Some(latitude) = data.latitude {
            q = q.bind(latitude);
        }
        if let Some(longitude) = data.longitude {
            q = q.bind(longitude);
        }

        q.fetch_optional(pool).await
    }

    /// Sets coordinates, keeping address/city unless provided
    pub async fn update_location(
        pool: &PgPool,
        id: Uuid,
        latitude: f64,
        longitude: f64,
        address: Option<String>,
        city: Option<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET latitude = $2, longitude = $3,
                address = COALESCE($4, address),
                city = COALESCE($5, city),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(latitude)
            .bind(longitude)
            .bind(address)
            .bind(city)
            .fetch_optional(pool)
            .await
    }

    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets the admin-controlled verification flag on a tasker
    pub async fn set_verified(
        pool: &PgPool,
        id: Uuid,
        verified: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users SET is_verified = $2, updated_at = NOW()
            WHERE id = $1 AND role = 'tasker'
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(verified)
            .fetch_optional(pool)
            .await
    }

    pub async fn coin_balance(pool: &PgPool, id: Uuid) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT coin_balance FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Searches available taskers joined with their profile
    ///
    /// Ordered by average rating, best first.
    pub async fn search_taskers(
        pool: &PgPool,
        filter: &TaskerSearch,
    ) -> Result<Vec<UserWithProfile>, sqlx::Error> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT u.id FROM users u JOIN tasker_profiles p ON p.user_id = u.id \
             WHERE u.role = 'tasker' AND u.is_active AND p.is_available = ",
        );
        qb.push_bind(filter.is_available.unwrap_or(true));

        if let Some(category_id) = &filter.category_id {
            qb.push(" AND ").push_bind(category_id.clone()).push(" = ANY(p.service_categories)");
        }
        if let Some(city) = &filter.city {
            qb.push(" AND u.city ILIKE ").push_bind(format!("%{}%", city));
        }
        if let Some(min_rating) = filter.min_rating {
            qb.push(" AND p.average_rating >= ").push_bind(min_rating);
        }
        if let Some(max_rate) = filter.max_rate {
            qb.push(" AND p.hourly_rate <= ").push_bind(max_rate);
        }

        qb.push(" ORDER BY p.average_rating DESC, p.total_reviews DESC LIMIT ")
            .push_bind(filter.limit.unwrap_or(100).clamp(1, 100));

        let ids: Vec<Uuid> = qb.build_query_scalar().fetch_all(pool).await?;
        UserWithProfile::load_many(pool, &ids).await
    }
}

/// Filters for tasker search
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskerSearch {
    pub category_id: Option<String>,
    pub city: Option<String>,
    pub min_rating: Option<f64>,
    pub max_rate: Option<f64>,
    pub is_available: Option<bool>,
    pub limit: Option<i64>,
}

/// One priced service a tasker offers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOffering {
    pub category_id: String,
    pub subcategory: Option<String>,
    pub hourly_rate: f64,
}

const PROFILE_COLUMNS: &str = "user_id, bio, hourly_rate, service_categories, services, \
     certifications, portfolio_images, profile_image, availability, is_available, \
     max_travel_distance, completed_tasks, average_rating, total_reviews, languages_spoken";

/// Tasker-only profile data
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskerProfile {
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub hourly_rate: f64,
    pub service_categories: Vec<String>,
    pub services: Json<Vec<ServiceOffering>>,
    pub certifications: Vec<String>,
    pub portfolio_images: Vec<String>,
    pub profile_image: Option<String>,
    pub availability: serde_json::Value,
    pub is_available: bool,
    pub max_travel_distance: f64,
    pub completed_tasks: i32,
    pub average_rating: f64,
    pub total_reviews: i32,
    pub languages_spoken: Vec<String>,
}

/// Partial tasker profile update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskerProfile {
    pub bio: Option<String>,
    pub hourly_rate: Option<f64>,
    pub service_categories: Option<Vec<String>>,
    pub services: Option<Vec<ServiceOffering>>,
    pub certifications: Option<Vec<String>>,
    pub portfolio_images: Option<Vec<String>>,
    pub profile_image: Option<String>,
    pub availability: Option<serde_json::Value>,
    pub is_available: Option<bool>,
    pub max_travel_distance: Option<f64>,
    pub languages_spoken: Option<Vec<String>>,
}

impl TaskerProfile {
    /// Inserts the default profile for a new tasker
    pub async fn create_default<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasker_profiles (user_id) VALUES ($1) RETURNING {PROFILE_COLUMNS}"
        );

        sqlx::query_as::<_, TaskerProfile>(&query)
            .bind(user_id)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {PROFILE_COLUMNS} FROM tasker_profiles WHERE user_id = $1");

        sqlx::query_as::<_, TaskerProfile>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_many(pool: &PgPool, user_ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        let query =
            format!("SELECT {PROFILE_COLUMNS} FROM tasker_profiles WHERE user_id = ANY($1)");

        sqlx::query_as::<_, TaskerProfile>(&query)
            .bind(user_ids)
            .fetch_all(pool)
            .await
    }

    /// Applies a partial update; absent fields keep their value
    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        data: UpdateTaskerProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasker_profiles SET
                bio = COALESCE($2, bio),
                hourly_rate = COALESCE($3, hourly_rate),
                service_categories = COALESCE($4, service_categories),
                services = COALESCE($5, services),
                certifications = COALESCE($6, certifications),
                portfolio_images = COALESCE($7, portfolio_images),
                profile_image = COALESCE($8, profile_image),
                availability = COALESCE($9, availability),
                is_available = COALESCE($10, is_available),
                max_travel_distance = COALESCE($11, max_travel_distance),
                languages_spoken = COALESCE($12, languages_spoken)
            WHERE user_id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, TaskerProfile>(&query)
            .bind(user_id)
            .bind(data.bio)
            .bind(data.hourly_rate)
            .bind(data.service_categories)
            .bind(data.services.map(Json))
            .bind(data.certifications)
            .bind(data.portfolio_images)
            .bind(data.profile_image)
            .bind(data.availability)
            .bind(data.is_available)
            .bind(data.max_travel_distance)
            .bind(data.languages_spoken)
            .fetch_optional(pool)
            .await
    }

    /// Bumps the completed-task counter; part of the completion transaction
    pub async fn increment_completed<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE tasker_profiles SET completed_tasks = completed_tasks + 1 WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Recomputes the cached rating from the reviews table
    ///
    /// The average is rounded to one decimal place.
    pub async fn refresh_rating<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE tasker_profiles p SET
                average_rating = COALESCE(r.avg_rating, 0),
                total_reviews = r.total
            FROM (
                SELECT ROUND(AVG(rating)::NUMERIC, 1)::DOUBLE PRECISION AS avg_rating,
                       COUNT(*)::INTEGER AS total
                FROM reviews WHERE tasker_id = $1
            ) r
            WHERE p.user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(())
    }
}

/// User with its tasker profile, the shape most endpoints return
#[derive(Debug, Clone, Serialize)]
pub struct UserWithProfile {
    #[serde(flatten)]
    pub user: User,
    pub tasker_profile: Option<TaskerProfile>,
}

impl UserWithProfile {
    /// Attaches the tasker profile, if the user is a tasker
    pub async fn load(pool: &PgPool, user: User) -> Result<Self, sqlx::Error> {
        let tasker_profile = if user.role == UserRole::Tasker {
            TaskerProfile::find_by_user(pool, user.id).await?
        } else {
            None
        };

        Ok(Self {
            user,
            tasker_profile,
        })
    }

    /// Loads users by id, preserving the order of `ids`
    pub async fn load_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        let users: Vec<User> = sqlx::query_as(&query).bind(ids).fetch_all(pool).await?;
        let mut users: HashMap<Uuid, User> = users.into_iter().map(|u| (u.id, u)).collect();

        let mut profiles: HashMap<Uuid, TaskerProfile> = TaskerProfile::find_many(pool, ids)
            .await?
            .into_iter()
            .map(|p| (p.user_id, p))
            .collect();

        Ok(ids
            .iter()
            .filter_map(|id| {
                users.remove(id).map(|user| UserWithProfile {
                    tasker_profile: profiles.remove(id),
                    user,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "kofi@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            full_name: "Kofi Mensah".to_string(),
            phone: Some("+225 07 00 00 00".to_string()),
            role: UserRole::Client,
            language: Language::Fr,
            country: Country::IvoryCoast,
            address: None,
            city: Some("Abidjan".to_string()),
            latitude: None,
            longitude: None,
            is_active: true,
            is_verified: false,
            coin_balance: 50,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "client");
        assert_eq!(json["country"], "ivory_coast");
        assert_eq!(json["language"], "fr");
    }

    #[test]
    fn test_user_role_parsing() {
        assert_eq!("tasker".parse::<UserRole>().unwrap(), UserRole::Tasker);
        assert_eq!(UserRole::Admin.as_str(), "admin");
        assert!("superuser".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Language::default(), Language::Fr);
        assert_eq!(Country::default(), Country::IvoryCoast);
    }

    #[test]
    fn test_update_user_is_empty() {
        assert!(UpdateUser::default().is_empty());
        assert!(!UpdateUser {
            city: Some("Dakar".into()),
            ..Default::default()
        }
        .is_empty());
    }

    #[test]
    fn test_user_with_profile_flattens() {
        let with_profile = UserWithProfile {
            user: sample_user(),
            tasker_profile: None,
        };
        let json = serde_json::to_value(&with_profile).unwrap();
        assert_eq!(json["full_name"], "Kofi Mensah");
        assert!(json["tasker_profile"].is_null());
    }
}
