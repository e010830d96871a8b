/// Service categories
///
/// The catalogue is seeded by migration and read-only at runtime. Each
/// category carries English and French names and a list of bilingual
/// subcategories.

use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

/// Subcategory label in both supported languages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    pub en: String,
    pub fr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServiceCategory {
    pub id: Uuid,
    pub name_en: String,
    pub name_fr: String,
    pub icon: String,
    pub subcategories: Json<Vec<Subcategory>>,
}

impl ServiceCategory {
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ServiceCategory>(
            "SELECT id, name_en, name_fr, icon, subcategories FROM service_categories ORDER BY name_en",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ServiceCategory>(
            "SELECT id, name_en, name_fr, icon, subcategories FROM service_categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM service_categories WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Name in the requested language code, English otherwise
    pub fn name_for(&self, language: &str) -> &str {
        if language == "fr" {
            &self.name_fr
        } else {
            &self.name_en
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subcategories_deserialize_from_seed_shape() {
        let raw = r#"[{"en": "Sewing", "fr": "Couture"}]"#;
        let subs: Vec<Subcategory> = serde_json::from_str(raw).unwrap();
        assert_eq!(subs[0].fr, "Couture");
    }

    #[test]
    fn test_name_for() {
        let category = ServiceCategory {
            id: Uuid::new_v4(),
            name_en: "Car Services".into(),
            name_fr: "Services Automobiles".into(),
            icon: "🚗".into(),
            subcategories: Json(vec![]),
        };
        assert_eq!(category.name_for("fr"), "Services Automobiles");
        assert_eq!(category.name_for("en"), "Car Services");
    }
}
