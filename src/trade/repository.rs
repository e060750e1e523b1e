use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

use super::models::{TradeKind, TradeModel, TradeStatus};
use crate::cards::models::OwnedCopyModel;
use crate::shared::AppError;
use crate::store::{transfer_copy_tx, InMemoryStore, PostgresStore};

/// Result of attempting to record a new offer
#[derive(Debug, Clone, PartialEq)]
pub enum CreateTradeResult {
    Created(TradeModel),
    /// One of the copies is already promised in another pending trade
    CopyInPendingTrade,
}

/// Result of attempting to accept an offer
#[derive(Debug, Clone, PartialEq)]
pub enum AcceptTradeResult {
    Completed(TradeModel),
    TradeNotFound,
    AlreadyResolved,
    NotCounterparty,
    /// Ownership changed since the offer was made
    StaleOffer(String),
    InsufficientFunds { balance: i64, required: i64 },
}

/// Result of attempting to cancel an offer
#[derive(Debug, Clone, PartialEq)]
pub enum CancelTradeResult {
    Canceled(TradeModel),
    TradeNotFound,
    AlreadyResolved,
    NotOfferer,
}

/// Trait for trade repository operations.
///
/// `try_accept_trade` and `try_cancel_trade` are the serialization point for a
/// trade: status check, ownership/coin mutation and the terminal status write
/// happen as one unit.
#[async_trait]
pub trait TradeRepository {
    async fn try_create_trade(&self, trade: &TradeModel) -> Result<CreateTradeResult, AppError>;
    async fn get_trade(&self, trade_id: &str) -> Result<Option<TradeModel>, AppError>;

    /// Pending trades the player may accept, newest first
    async fn list_incoming_trades(&self, player_id: &str) -> Result<Vec<TradeModel>, AppError>;

    /// Every trade the player offered or was offered, newest first
    async fn list_trade_history(&self, player_id: &str) -> Result<Vec<TradeModel>, AppError>;

    async fn try_accept_trade(
        &self,
        trade_id: &str,
        acceptor_id: &str,
    ) -> Result<AcceptTradeResult, AppError>;

    async fn try_cancel_trade(
        &self,
        trade_id: &str,
        player_id: &str,
    ) -> Result<CancelTradeResult, AppError>;
}

fn stale_reason(
    trade: &TradeModel,
    acceptor_id: &str,
    offered: Option<&OwnedCopyModel>,
    requested: Option<&OwnedCopyModel>,
) -> Option<String> {
    match offered {
        Some(copy) if copy.owner_id == trade.offered_by_id => {}
        _ => return Some("Offered card is no longer owned by the offerer".to_string()),
    }
    if trade.kind() == TradeKind::CardForCard {
        match requested {
            Some(copy) if copy.owner_id == acceptor_id => {}
            _ => return Some("Requested card is no longer owned by the recipient".to_string()),
        }
    }
    None
}

#[async_trait]
impl TradeRepository for InMemoryStore {
    #[instrument(skip(self, trade), fields(trade_id = %trade.id))]
    async fn try_create_trade(&self, trade: &TradeModel) -> Result<CreateTradeResult, AppError> {
        let mut tables = self.tables()?;

        let conflict = tables.trades.values().any(|existing| {
            existing.is_pending()
                && (existing.references_copy(&trade.offered_copy_id)
                    || trade
                        .requested_copy_id
                        .as_deref()
                        .is_some_and(|id| existing.references_copy(id)))
        });
        if conflict {
            debug!("Copy already referenced by a pending trade");
            return Ok(CreateTradeResult::CopyInPendingTrade);
        }

        tables.trades.insert(trade.id.clone(), trade.clone());
        info!("Trade created in memory");
        Ok(CreateTradeResult::Created(trade.clone()))
    }

    #[instrument(skip(self))]
    async fn get_trade(&self, trade_id: &str) -> Result<Option<TradeModel>, AppError> {
        let tables = self.tables()?;
        Ok(tables.trades.get(trade_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_incoming_trades(&self, player_id: &str) -> Result<Vec<TradeModel>, AppError> {
        let tables = self.tables()?;
        let mut trades: Vec<TradeModel> = tables
            .trades
            .values()
            .filter(|t| t.is_pending() && t.can_be_accepted_by(player_id))
            .cloned()
            .collect();
        trades.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(trades)
    }

    #[instrument(skip(self))]
    async fn list_trade_history(&self, player_id: &str) -> Result<Vec<TradeModel>, AppError> {
        let tables = self.tables()?;
        let mut trades: Vec<TradeModel> = tables
            .trades
            .values()
            .filter(|t| {
                t.offered_by_id == player_id || t.offered_to_id.as_deref() == Some(player_id)
            })
            .cloned()
            .collect();
        trades.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(trades)
    }

    #[instrument(skip(self))]
    async fn try_accept_trade(
        &self,
        trade_id: &str,
        acceptor_id: &str,
    ) -> Result<AcceptTradeResult, AppError> {
        let mut tables = self.tables()?;

        let trade = match tables.trades.get(trade_id) {
            Some(trade) => trade.clone(),
            None => return Ok(AcceptTradeResult::TradeNotFound),
        };
        if !trade.is_pending() {
            return Ok(AcceptTradeResult::AlreadyResolved);
        }
        if !trade.can_be_accepted_by(acceptor_id) {
            return Ok(AcceptTradeResult::NotCounterparty);
        }

        let offered = tables.copies.get(&trade.offered_copy_id).cloned();
        let requested = trade
            .requested_copy_id
            .as_ref()
            .and_then(|id| tables.copies.get(id))
            .cloned();
        if let Some(reason) = stale_reason(&trade, acceptor_id, offered.as_ref(), requested.as_ref())
        {
            warn!(%reason, "Rejecting stale trade offer");
            return Ok(AcceptTradeResult::StaleOffer(reason));
        }

        match trade.kind() {
            TradeKind::CardForCard => {
                let requested_id = requested.map(|c| c.id).ok_or(AppError::Internal)?;
                tables.transfer_copy(&trade.offered_copy_id, acceptor_id)?;
                tables.transfer_copy(&requested_id, &trade.offered_by_id)?;
            }
            TradeKind::CardForCoins => {
                let balance = tables
                    .players
                    .get(acceptor_id)
                    .map(|p| p.coins)
                    .ok_or_else(|| AppError::NotFound("Buyer not found".to_string()))?;
                if balance < trade.asking_price {
                    return Ok(AcceptTradeResult::InsufficientFunds {
                        balance,
                        required: trade.asking_price,
                    });
                }
                if !tables.players.contains_key(&trade.offered_by_id) {
                    return Err(AppError::NotFound("Seller not found".to_string()));
                }

                if let Some(buyer) = tables.players.get_mut(acceptor_id) {
                    buyer.coins -= trade.asking_price;
                }
                if let Some(seller) = tables.players.get_mut(&trade.offered_by_id) {
                    seller.coins += trade.asking_price;
                }
                tables.transfer_copy(&trade.offered_copy_id, acceptor_id)?;
            }
        }

        let stored = tables.trades.get_mut(trade_id).ok_or(AppError::Internal)?;
        stored.status = TradeStatus::Completed;
        if stored.offered_to_id.is_none() {
            stored.offered_to_id = Some(acceptor_id.to_string());
        }
        let completed = stored.clone();

        info!(kind = ?completed.kind(), "Trade completed in memory");
        Ok(AcceptTradeResult::Completed(completed))
    }

    #[instrument(skip(self))]
    async fn try_cancel_trade(
        &self,
        trade_id: &str,
        player_id: &str,
    ) -> Result<CancelTradeResult, AppError> {
        let mut tables = self.tables()?;

        let trade = match tables.trades.get_mut(trade_id) {
            Some(trade) => trade,
            None => return Ok(CancelTradeResult::TradeNotFound),
        };
        if !trade.is_pending() {
            return Ok(CancelTradeResult::AlreadyResolved);
        }
        if trade.offered_by_id != player_id {
            return Ok(CancelTradeResult::NotOfferer);
        }
        trade.status = TradeStatus::Canceled;

        info!("Trade canceled in memory");
        Ok(CancelTradeResult::Canceled(trade.clone()))
    }
}

const TRADE_COLUMNS: &str = "id, offered_by_id, offered_to_id, offered_copy_id, requested_copy_id, asking_price, status, created_at";

fn trade_from_row(row: &PgRow) -> Result<TradeModel, AppError> {
    let status: String = row.try_get("status")?;
    let status = TradeStatus::from_str(&status)
        .map_err(|_| AppError::DatabaseError(format!("Unknown trade status: {}", status)))?;

    Ok(TradeModel {
        id: row.try_get("id")?,
        offered_by_id: row.try_get("offered_by_id")?,
        offered_to_id: row.try_get("offered_to_id")?,
        offered_copy_id: row.try_get("offered_copy_id")?,
        requested_copy_id: row.try_get("requested_copy_id")?,
        asking_price: row.try_get("asking_price")?,
        status,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl TradeRepository for PostgresStore {
    #[instrument(skip(self, trade), fields(trade_id = %trade.id))]
    async fn try_create_trade(&self, trade: &TradeModel) -> Result<CreateTradeResult, AppError> {
        let mut tx = self.pool.begin().await?;

        // Serialises creators so two offers cannot both pass the conflict check
        sqlx::query("LOCK TABLE trades IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let copy_ids: Vec<String> = std::iter::once(trade.offered_copy_id.clone())
            .chain(trade.requested_copy_id.clone())
            .collect();
        let conflict = sqlx::query(
            "SELECT 1 FROM trades WHERE status = 'pending'
             AND (offered_copy_id = ANY($1) OR requested_copy_id = ANY($1)) LIMIT 1",
        )
        .bind(&copy_ids)
        .fetch_optional(&mut *tx)
        .await?
        .is_some();
        if conflict {
            return Ok(CreateTradeResult::CopyInPendingTrade);
        }

        sqlx::query(
            "INSERT INTO trades (id, offered_by_id, offered_to_id, offered_copy_id, requested_copy_id, asking_price, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&trade.id)
        .bind(&trade.offered_by_id)
        .bind(&trade.offered_to_id)
        .bind(&trade.offered_copy_id)
        .bind(&trade.requested_copy_id)
        .bind(trade.asking_price)
        .bind(trade.status.to_string())
        .bind(trade.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Trade created in database");
        Ok(CreateTradeResult::Created(trade.clone()))
    }

    #[instrument(skip(self))]
    async fn get_trade(&self, trade_id: &str) -> Result<Option<TradeModel>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM trades WHERE id = $1", TRADE_COLUMNS))
            .bind(trade_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(trade_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn list_incoming_trades(&self, player_id: &str) -> Result<Vec<TradeModel>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM trades WHERE status = 'pending' AND offered_by_id <> $1
             AND (offered_to_id = $1 OR (offered_to_id IS NULL AND requested_copy_id IS NULL))
             ORDER BY created_at DESC",
            TRADE_COLUMNS
        ))
        .bind(player_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(trade_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn list_trade_history(&self, player_id: &str) -> Result<Vec<TradeModel>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM trades WHERE offered_by_id = $1 OR offered_to_id = $1
             ORDER BY created_at DESC",
            TRADE_COLUMNS
        ))
        .bind(player_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(trade_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn try_accept_trade(
        &self,
        trade_id: &str,
        acceptor_id: &str,
    ) -> Result<AcceptTradeResult, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM trades WHERE id = $1 FOR UPDATE",
            TRADE_COLUMNS
        ))
        .bind(trade_id)
        .fetch_optional(&mut *tx)
        .await?;
        let trade = match row {
            Some(row) => trade_from_row(&row)?,
            None => return Ok(AcceptTradeResult::TradeNotFound),
        };
        if !trade.is_pending() {
            return Ok(AcceptTradeResult::AlreadyResolved);
        }
        if !trade.can_be_accepted_by(acceptor_id) {
            return Ok(AcceptTradeResult::NotCounterparty);
        }

        let copy_ids: Vec<String> = std::iter::once(trade.offered_copy_id.clone())
            .chain(trade.requested_copy_id.clone())
            .collect();
        let copies = sqlx::query_as::<_, OwnedCopyModel>(
            "SELECT id, type_id, owner_id, level FROM owned_copies WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(&copy_ids)
        .fetch_all(&mut *tx)
        .await?;
        let offered = copies.iter().find(|c| c.id == trade.offered_copy_id);
        let requested = trade
            .requested_copy_id
            .as_ref()
            .and_then(|id| copies.iter().find(|c| &c.id == id));
        if let Some(reason) = stale_reason(&trade, acceptor_id, offered, requested) {
            warn!(%reason, "Rejecting stale trade offer");
            return Ok(AcceptTradeResult::StaleOffer(reason));
        }
        let offered = offered.cloned().ok_or(AppError::Internal)?;

        match trade.kind() {
            TradeKind::CardForCard => {
                let requested = requested.cloned().ok_or(AppError::Internal)?;
                transfer_copy_tx(&mut tx, &offered, acceptor_id).await?;
                transfer_copy_tx(&mut tx, &requested, &trade.offered_by_id).await?;
            }
            TradeKind::CardForCoins => {
                let row = sqlx::query("SELECT coins FROM players WHERE id = $1 FOR UPDATE")
                    .bind(acceptor_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Buyer not found".to_string()))?;
                let balance: i64 = row.try_get("coins")?;
                if balance < trade.asking_price {
                    return Ok(AcceptTradeResult::InsufficientFunds {
                        balance,
                        required: trade.asking_price,
                    });
                }

                sqlx::query("UPDATE players SET coins = coins - $1 WHERE id = $2")
                    .bind(trade.asking_price)
                    .bind(acceptor_id)
                    .execute(&mut *tx)
                    .await?;
                let credited = sqlx::query("UPDATE players SET coins = coins + $1 WHERE id = $2")
                    .bind(trade.asking_price)
                    .bind(&trade.offered_by_id)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();
                if credited == 0 {
                    return Err(AppError::NotFound("Seller not found".to_string()));
                }
                transfer_copy_tx(&mut tx, &offered, acceptor_id).await?;
            }
        }

        let row = sqlx::query(&format!(
            "UPDATE trades SET status = 'completed', offered_to_id = COALESCE(offered_to_id, $2)
             WHERE id = $1 AND status = 'pending' RETURNING {}",
            TRADE_COLUMNS
        ))
        .bind(trade_id)
        .bind(acceptor_id)
        .fetch_optional(&mut *tx)
        .await?;
        let completed = match row {
            Some(row) => trade_from_row(&row)?,
            None => return Ok(AcceptTradeResult::AlreadyResolved),
        };

        tx.commit().await?;
        info!(kind = ?completed.kind(), "Trade completed in database");
        Ok(AcceptTradeResult::Completed(completed))
    }

    #[instrument(skip(self))]
    async fn try_cancel_trade(
        &self,
        trade_id: &str,
        player_id: &str,
    ) -> Result<CancelTradeResult, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM trades WHERE id = $1 FOR UPDATE",
            TRADE_COLUMNS
        ))
        .bind(trade_id)
        .fetch_optional(&mut *tx)
        .await?;
        let trade = match row {
            Some(row) => trade_from_row(&row)?,
            None => return Ok(CancelTradeResult::TradeNotFound),
        };
        if !trade.is_pending() {
            return Ok(CancelTradeResult::AlreadyResolved);
        }
        if trade.offered_by_id != player_id {
            return Ok(CancelTradeResult::NotOfferer);
        }

        sqlx::query("UPDATE trades SET status = 'canceled' WHERE id = $1 AND status = 'pending'")
            .bind(trade_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Trade canceled in database");
        Ok(CancelTradeResult::Canceled(TradeModel {
            status: TradeStatus::Canceled,
            ..trade
        }))
    }
}
