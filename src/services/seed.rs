//! Reference data seeding
//!
//! Creates the built-in property types when their slug is not taken yet.
//! Each record is handled on its own: a failure is logged and counted, and
//! the remaining records are still processed.

use serde::Serialize;

use super::property_type::PropertyTypeService;
use crate::models::CreatePropertyTypeInput;

/// Built-in property types as `(name, slug, description)`
pub const PROPERTY_TYPES: &[(&str, &str, &str)] = &[
    ("Apartment", "apartment", "Self-contained unit in a multi-unit building"),
    ("House", "house", "Detached single-family home"),
    ("Villa", "villa", "Large detached house, usually with grounds"),
    ("Townhouse", "townhouse", "Multi-floor home sharing walls with its neighbours"),
    ("Land", "land", "Undeveloped plot"),
    ("Commercial", "commercial", "Retail or mixed-use premises"),
    ("Office", "office", "Office space"),
];

/// Outcome of a seed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Seed the built-in property types
pub async fn seed_property_types(service: &PropertyTypeService) -> SeedReport {
    let mut report = SeedReport::default();

    for (name, slug, description) in PROPERTY_TYPES {
        match service.get_by_slug(slug).await {
            Ok(Some(_)) => {
                report.skipped += 1;
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Failed to look up property type {}: {}", slug, e);
                report.failed += 1;
                continue;
            }
        }

        let input = CreatePropertyTypeInput {
            name: name.to_string(),
            slug: Some(slug.to_string()),
            description: Some(description.to_string()),
        };
        match service.insert(input).await {
            Ok(_) => report.created += 1,
            Err(e) => {
                tracing::error!("Failed to seed property type {}: {}", slug, e);
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        created = report.created,
        skipped = report.skipped,
        failed = report.failed,
        "Seeded property types"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{PropertyTypeRepository, SqlxPropertyTypeRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::ListParams;
    use std::sync::Arc;

    async fn setup() -> (PropertyTypeService, Arc<dyn PropertyTypeRepository>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxPropertyTypeRepository::boxed(pool);
        (PropertyTypeService::new(repo.clone()), repo)
    }

    #[tokio::test]
    async fn test_seed_twice_is_idempotent() {
        let (service, repo) = setup().await;

        let first = seed_property_types(&service).await;
        assert_eq!(first.created, PROPERTY_TYPES.len());
        assert_eq!(first.failed, 0);

        let second = seed_property_types(&service).await;
        assert_eq!(
            second,
            SeedReport {
                created: 0,
                skipped: PROPERTY_TYPES.len(),
                failed: 0,
            }
        );

        let (docs, total) = repo.list(&ListParams::new(1, 100)).await.unwrap();
        assert_eq!(total as usize, PROPERTY_TYPES.len());
        for (_, slug, _) in PROPERTY_TYPES {
            assert_eq!(docs.iter().filter(|t| t.slug == *slug).count(), 1);
        }
    }

    #[tokio::test]
    async fn test_seed_keeps_existing_records() {
        let (service, repo) = setup().await;
        repo.create("Villa", "villa", Some("Ours")).await.unwrap();

        let report = seed_property_types(&service).await;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.created, PROPERTY_TYPES.len() - 1);

        let villa = repo.get_by_slug("villa").await.unwrap().unwrap();
        assert_eq!(villa.description.as_deref(), Some("Ours"));
    }

    #[tokio::test]
    async fn test_seed_counts_conflicts_and_continues() {
        let (service, repo) = setup().await;
        // Name taken under another slug, so inserting "house" conflicts.
        repo.create("House", "home", None).await.unwrap();

        let report = seed_property_types(&service).await;
        assert_eq!(report.failed, 1);
        assert_eq!(report.created, PROPERTY_TYPES.len() - 1);
    }
}
