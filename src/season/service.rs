use rand::{seq::SliceRandom, Rng};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::{models::SeasonModel, repository::SeasonRepository};
use crate::cards::{models::CardTemplateModel, repository::CardRepository};
use crate::catalog::{models::TeacherModel, repository::CatalogRepository};
use crate::shared::AppError;

pub const NO_QUOTE: &str = "no quote available";

/// What a rollover produced. Pool generation is not all-or-nothing, so
/// failed template inserts are counted rather than retried.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonRollover {
    pub season: SeasonModel,
    pub cards_created: usize,
    pub failed_pairings: usize,
}

/// Builds one template per (teacher, subject) pairing. Each teacher's quotes
/// are dealt without replacement; once exhausted, the placeholder is used.
pub fn build_season_pool<R: Rng + ?Sized>(
    teachers: &[TeacherModel],
    season_id: &str,
    rng: &mut R,
) -> Vec<CardTemplateModel> {
    let mut pool = Vec::new();

    for teacher in teachers {
        let mut quotes = teacher.quotes.clone();
        quotes.shuffle(rng);

        for subject in &teacher.subjects {
            let quote = quotes.pop().unwrap_or_else(|| NO_QUOTE.to_string());
            pool.push(CardTemplateModel::new(
                teacher.name.clone(),
                subject.clone(),
                quote,
                season_id.to_string(),
            ));
        }
    }

    pool
}

/// Service for season rollover and season-scoped reads
pub struct SeasonService {
    season_repository: Arc<dyn SeasonRepository + Send + Sync>,
    card_repository: Arc<dyn CardRepository + Send + Sync>,
    catalog_repository: Arc<dyn CatalogRepository + Send + Sync>,
    season_length_days: i64,
    // Single writer for rollovers within this process
    rollover_lock: Mutex<()>,
}

impl SeasonService {
    pub fn new(
        season_repository: Arc<dyn SeasonRepository + Send + Sync>,
        card_repository: Arc<dyn CardRepository + Send + Sync>,
        catalog_repository: Arc<dyn CatalogRepository + Send + Sync>,
        season_length_days: i64,
    ) -> Self {
        Self {
            season_repository,
            card_repository,
            catalog_repository,
            season_length_days,
            rollover_lock: Mutex::new(()),
        }
    }

    /// Closes the current season by activating a new one, then regenerates
    /// the card pool for it
    #[instrument(skip(self))]
    pub async fn start_new_season(&self, name: &str) -> Result<SeasonRollover, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Season name is required".to_string()));
        }

        let _guard = self.rollover_lock.lock().await;

        let season = SeasonModel::new(name.to_string(), self.season_length_days);
        let deactivated = self.season_repository.activate_season(&season).await?;
        info!(season_id = %season.id, deactivated, "New season activated");

        let teachers = self.catalog_repository.list_teachers().await?;
        let pool = {
            let mut rng = rand::rng();
            build_season_pool(&teachers, &season.id, &mut rng)
        };

        let mut cards_created = 0;
        let mut failed_pairings = 0;
        for template in &pool {
            match self.card_repository.insert_template(template).await {
                Ok(()) => cards_created += 1,
                Err(e) => {
                    warn!(
                        teacher = %template.teacher_name,
                        subject = %template.subject,
                        error = %e,
                        "Failed to create card template"
                    );
                    failed_pairings += 1;
                }
            }
        }

        info!(
            season_id = %season.id,
            cards_created,
            failed_pairings,
            "Season card pool generated"
        );

        Ok(SeasonRollover {
            season,
            cards_created,
            failed_pairings,
        })
    }

    /// Starts "Season 1" when no season has ever existed
    #[instrument(skip(self))]
    pub async fn ensure_initial_season(&self) -> Result<Option<SeasonRollover>, AppError> {
        if !self.season_repository.list_seasons().await?.is_empty() {
            debug!("Seasons already exist, skipping initial season");
            return Ok(None);
        }
        self.start_new_season("Season 1").await.map(Some)
    }

    #[instrument(skip(self))]
    pub async fn list_seasons(&self) -> Result<Vec<SeasonModel>, AppError> {
        self.season_repository.list_seasons().await
    }

    #[instrument(skip(self))]
    pub async fn current_season(&self) -> Result<SeasonModel, AppError> {
        self.season_repository
            .get_active_season()
            .await?
            .ok_or_else(|| AppError::NotFound("No active season found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn season_leaderboard(
        &self,
        season_id: &str,
        limit: usize,
    ) -> Result<(SeasonModel, Vec<CardTemplateModel>), AppError> {
        let season = self
            .season_repository
            .get_season(season_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Season not found".to_string()))?;
        let cards = self.card_repository.top_templates(season_id, limit).await?;
        Ok((season, cards))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use rand::{rngs::StdRng, SeedableRng};

    fn service(store: Arc<InMemoryStore>) -> SeasonService {
        SeasonService::new(store.clone(), store.clone(), store, 7)
    }

    #[test]
    fn pool_has_one_card_per_pairing_and_no_repeated_quotes() {
        let teachers = vec![
            TeacherModel::new("Mr. Smith", &["Math", "Physics", "Chess"], &["a", "b"]),
            TeacherModel::new("Dr. Lee", &["Biology"], &[]),
        ];
        let mut rng = StdRng::seed_from_u64(7);

        let pool = build_season_pool(&teachers, "s1", &mut rng);

        assert_eq!(pool.len(), 4);
        assert!(pool.iter().all(|c| c.season_id == "s1" && c.rating == 1000));

        let mut smith_quotes: Vec<&str> = pool
            .iter()
            .filter(|c| c.teacher_name == "Mr. Smith")
            .map(|c| c.quote.as_str())
            .collect();
        smith_quotes.sort();
        assert_eq!(smith_quotes, vec!["a", "b", NO_QUOTE]);

        let lee = pool.iter().find(|c| c.teacher_name == "Dr. Lee").unwrap();
        assert_eq!(lee.quote, NO_QUOTE);
    }

    #[tokio::test]
    async fn rollover_regenerates_pool_for_new_season() {
        let store = Arc::new(InMemoryStore::new());
        store
            .add_teacher(TeacherModel::new("Mr. Smith", &["Math", "Physics"], &["q"]))
            .await
            .unwrap();
        let service = service(store.clone());

        let first = service.start_new_season("Season 1").await.unwrap();
        let second = service.start_new_season("Season 2").await.unwrap();

        assert_eq!(second.cards_created, 2);
        assert_eq!(second.failed_pairings, 0);
        let active = service.current_season().await.unwrap();
        assert_eq!(active.id, second.season.id);

        let seasons = service.list_seasons().await.unwrap();
        assert_eq!(seasons.iter().filter(|s| s.is_active).count(), 1);

        let old_pool = store
            .list_templates_by_season(&first.season.id)
            .await
            .unwrap();
        let new_pool = store
            .list_templates_by_season(&second.season.id)
            .await
            .unwrap();
        assert_eq!(old_pool.len(), 2);
        assert_eq!(new_pool.len(), 2);
        assert!(new_pool.iter().all(|c| old_pool.iter().all(|o| o.type_id != c.type_id)));
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let service = service(Arc::new(InMemoryStore::new()));
        let result = service.start_new_season("   ").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn initial_season_created_only_once() {
        let service = service(Arc::new(InMemoryStore::new()));

        let created = service.ensure_initial_season().await.unwrap();
        let again = service.ensure_initial_season().await.unwrap();

        assert_eq!(created.unwrap().season.name, "Season 1");
        assert!(again.is_none());
        assert_eq!(service.list_seasons().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_rollovers_leave_one_active_season() {
        let service = Arc::new(service(Arc::new(InMemoryStore::new())));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move { service.start_new_season(&format!("S{}", i)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let seasons = service.list_seasons().await.unwrap();
        assert_eq!(seasons.len(), 8);
        assert_eq!(seasons.iter().filter(|s| s.is_active).count(), 1);
    }

    #[tokio::test]
    async fn leaderboard_for_unknown_season_is_not_found() {
        let service = service(Arc::new(InMemoryStore::new()));
        let result = service.season_leaderboard("missing", 10).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
