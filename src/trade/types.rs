use serde::Deserialize;

/// Request payload for offering a trade.
///
/// With `requestedCopyId` it is a card-for-card swap addressed to that
/// copy's owner; otherwise `askingPrice` makes it a coin sale, open to
/// anyone unless `offeredToId` narrows it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTradeRequest {
    pub offered_copy_id: String,
    pub requested_copy_id: Option<String>,
    pub asking_price: Option<i64>,
    pub offered_to_id: Option<String>,
}
