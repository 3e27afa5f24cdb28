//! Comanda edits. `open` is the only state that accepts changes; `closed` and `cancelled`
//! are terminal.

use crate::error::ValidationError;
use crate::model::{Comanda, ComandaStatus, LineItem};
use chrono::{DateTime, Utc};

fn ensure_open(comanda: &Comanda) -> Result<(), ValidationError> {
    if comanda.is_open() {
        Ok(())
    } else {
        Err(ValidationError::ComandaNotOpen(comanda.status))
    }
}

/// Adds a priced line, merging with an existing line for the same sku.
pub fn add_item(
    comanda: &Comanda,
    item: LineItem,
    now: DateTime<Utc>,
) -> Result<Comanda, ValidationError> {
    ensure_open(comanda)?;
    let mut next = comanda.clone();
    match next.items.iter().position(|line| line.sku == item.sku) {
        Some(idx) => {
            let line = &mut next.items[idx];
            line.quantity = line
                .quantity
                .checked_add(item.quantity)
                .ok_or(ValidationError::TotalOverflow)?;
            // Price at the time of the latest add wins.
            line.unit_price = item.unit_price;
        }
        None => next.items.push(item),
    }
    next.recompute_total().ok_or(ValidationError::TotalOverflow)?;
    next.updated_at = now;
    Ok(next)
}

/// Removes every unit of `sku`.
pub fn remove_item(
    comanda: &Comanda,
    sku: &str,
    now: DateTime<Utc>,
) -> Result<Comanda, ValidationError> {
    ensure_open(comanda)?;
    let mut next = comanda.clone();
    let before = next.items.len();
    next.items.retain(|line| line.sku != sku);
    if next.items.len() == before {
        return Err(ValidationError::ItemNotInComanda(sku.to_string()));
    }
    next.recompute_total().ok_or(ValidationError::TotalOverflow)?;
    next.updated_at = now;
    Ok(next)
}

/// Checkout. The total is frozen as of this call.
pub fn close(comanda: &Comanda, now: DateTime<Utc>) -> Result<Comanda, ValidationError> {
    ensure_open(comanda)?;
    let mut next = comanda.clone();
    next.recompute_total().ok_or(ValidationError::TotalOverflow)?;
    next.status = ComandaStatus::Closed;
    next.updated_at = now;
    next.closed_at = Some(now);
    Ok(next)
}

/// Discards the tab without billing.
pub fn cancel(comanda: &Comanda, now: DateTime<Utc>) -> Result<Comanda, ValidationError> {
    ensure_open(comanda)?;
    let mut next = comanda.clone();
    next.status = ComandaStatus::Cancelled;
    next.updated_at = now;
    next.closed_at = Some(now);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(sku: &str, quantity: u32, unit_price: i64) -> LineItem {
        LineItem {
            sku: sku.into(),
            quantity,
            unit_price,
        }
    }

    fn tab() -> Comanda {
        Comanda::open("c-1".into(), "t-1".into(), Some("4".into()), Utc::now())
    }

    #[test]
    fn test_add_merges_and_recomputes_total() {
        let now = Utc::now();
        let c = add_item(&tab(), line("beer", 2, 800), now).unwrap();
        let c = add_item(&c, line("fries", 1, 1_100), now).unwrap();
        let c = add_item(&c, line("beer", 1, 800), now).unwrap();
        assert_eq!(c.items.len(), 2);
        assert_eq!(c.items[0].quantity, 3);
        assert_eq!(c.total, 3 * 800 + 1_100);
    }

    #[test]
    fn test_remove_missing_item_is_rejected() {
        let now = Utc::now();
        let c = add_item(&tab(), line("beer", 1, 800), now).unwrap();
        let err = remove_item(&c, "wine", now).unwrap_err();
        assert_eq!(err, ValidationError::ItemNotInComanda("wine".into()));

        let c = remove_item(&c, "beer", now).unwrap();
        assert!(c.items.is_empty());
        assert_eq!(c.total, 0);
    }

    #[test]
    fn test_closed_comanda_is_frozen() {
        let now = Utc::now();
        let c = add_item(&tab(), line("beer", 2, 800), now).unwrap();
        let closed = close(&c, now).unwrap();
        assert_eq!(closed.status, ComandaStatus::Closed);
        assert_eq!(closed.total, 1_600);

        assert_eq!(
            add_item(&closed, line("beer", 1, 800), now).unwrap_err(),
            ValidationError::ComandaNotOpen(ComandaStatus::Closed)
        );
        assert!(remove_item(&closed, "beer", now).is_err());
        assert!(cancel(&closed, now).is_err());
        assert!(close(&closed, now).is_err());
    }

    #[test]
    fn test_cancel_discards() {
        let now = Utc::now();
        let c = add_item(&tab(), line("beer", 2, 800), now).unwrap();
        let cancelled = cancel(&c, now).unwrap();
        assert_eq!(cancelled.status, ComandaStatus::Cancelled);
        assert!(add_item(&cancelled, line("beer", 1, 800), now).is_err());
    }
}
