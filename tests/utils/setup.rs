#![allow(dead_code)] // Test utilities may not all be used in every test

use axum::Router;
use chrono::Utc;
use std::sync::Arc;

use teachercards::{
    build_router,
    cards::{models::CardTemplateModel, repository::CardRepository},
    catalog::{models::TeacherModel, repository::CatalogRepository},
    pack::{
        models::PackModel,
        repository::{OpenPackResult, PackRepository},
    },
    player::{models::PlayerModel, repository::PlayerRepository},
    season::repository::SeasonRepository,
    AppConfig, AppState, InMemoryStore, SessionClaims,
};

pub const TEST_SECRET: &str = "integration-test-secret";

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub store: Arc<InMemoryStore>,
    pub state: AppState,
    pub app: Router,
    /// Active-season templates ordered by (teacher, subject)
    pub templates: Vec<CardTemplateModel>,
}

impl TestSetup {
    /// Bearer header value for a player, as the auth service would mint it
    pub fn token(&self, player_id: &str) -> String {
        mint_token(player_id, false)
    }

    pub fn admin_token(&self, player_id: &str) -> String {
        mint_token(player_id, true)
    }

    pub fn type_id(&self, index: usize) -> String {
        self.templates[index].type_id.clone()
    }

    /// The id of `player_id`'s copy of template `index`
    pub async fn copy_id(&self, player_id: &str, index: usize) -> String {
        let type_id = self.type_id(index);
        self.store
            .list_collection(player_id)
            .await
            .unwrap()
            .into_iter()
            .find(|entry| entry.copy.type_id == type_id)
            .map(|entry| entry.copy.id)
            .unwrap_or_else(|| panic!("{} should own template {}", player_id, index))
    }

    pub async fn coins(&self, player_id: &str) -> i64 {
        self.store
            .get_player(player_id)
            .await
            .unwrap()
            .unwrap()
            .coins
    }

    /// Gives the player `level` units of template `index` through a free pack
    pub async fn grant(&self, player_id: &str, index: usize, level: i32) {
        let template = self.templates[index].clone();
        let pack = PackModel::new(player_id.to_string(), template.season_id.clone());
        self.store.purchase_pack(&pack, 0).await.unwrap();

        let drawn = vec![template; level as usize];
        let result = self
            .store
            .try_open_pack(&pack.id, player_id, &drawn)
            .await
            .unwrap();
        assert!(matches!(result, OpenPackResult::Opened(_)));
        self.store.refresh_rating(player_id).await.unwrap();
    }
}

pub fn mint_token(player_id: &str, admin: bool) -> String {
    let now = Utc::now().timestamp() as usize;
    let claims = SessionClaims {
        player_id: player_id.to_string(),
        username: player_id.to_string(),
        admin,
        exp: now + 3600,
        iat: now,
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}

pub struct TestSetupBuilder {
    teachers: Vec<TeacherModel>,
    players: Vec<(String, i64)>,
    grants: Vec<(String, usize, i32)>,
    pack_price: i64,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            teachers: vec![],
            players: vec![],
            grants: vec![],
            pack_price: 100,
        }
    }

    pub fn with_teacher(mut self, name: &str, subjects: &[&str], quotes: &[&str]) -> Self {
        self.teachers.push(TeacherModel::new(name, subjects, quotes));
        self
    }

    /// Two teachers, three templates: (Lee, Biology), (Smith, Math), (Smith, Physics)
    pub fn with_default_catalog(self) -> Self {
        self.with_teacher("Mr. Smith", &["Math", "Physics"], &["Show your work."])
            .with_teacher("Dr. Lee", &["Biology"], &["Life finds a way."])
    }

    pub fn with_player(mut self, player_id: &str, coins: i64) -> Self {
        self.players.push((player_id.to_string(), coins));
        self
    }

    pub fn with_players(self, players: Vec<&str>) -> Self {
        players
            .into_iter()
            .fold(self, |builder, player| builder.with_player(player, 0))
    }

    /// Player starts with `level` units of template `index`
    pub fn with_copy(mut self, player_id: &str, index: usize, level: i32) -> Self {
        self.grants.push((player_id.to_string(), index, level));
        self
    }

    pub fn with_pack_price(mut self, price: i64) -> Self {
        self.pack_price = price;
        self
    }

    pub async fn build(self) -> TestSetup {
        let store = Arc::new(InMemoryStore::new());
        for teacher in self.teachers {
            store.add_teacher(teacher).await.unwrap();
        }

        let config = AppConfig {
            jwt_secret: TEST_SECRET.to_string(),
            pack_price: self.pack_price,
            ..AppConfig::default()
        };
        let state = AppState::new(store.clone(), config);
        state
            .season_service
            .start_new_season("Season 1")
            .await
            .unwrap();

        let season = store.get_active_season().await.unwrap().unwrap();
        let mut templates = store.list_templates_by_season(&season.id).await.unwrap();
        templates.sort_by(|a, b| {
            (a.teacher_name.as_str(), a.subject.as_str())
                .cmp(&(b.teacher_name.as_str(), b.subject.as_str()))
        });

        for (player_id, coins) in &self.players {
            store
                .ensure_player(&PlayerModel::new(player_id.clone(), player_id.clone()))
                .await
                .unwrap();
            if *coins > 0 {
                store.credit_coins(player_id, *coins).await.unwrap();
            }
        }

        let setup = TestSetup {
            app: build_router(state.clone()),
            store,
            state,
            templates,
        };
        for (player_id, index, level) in self.grants {
            setup.grant(&player_id, index, level).await;
        }
        setup
    }
}
