// ============================================================================
// Settlement Arithmetic
// Remainder of a partial fill between an incoming and a resting order
// ============================================================================

use crate::domain::{NewOrder, Order};
use crate::numeric::{Amount, NumericResult};
use std::cmp::Ordering;

/// Terms of the order that carries the unmet part of a fill, or `None` when
/// the two orders cancel exactly.
///
/// Quantities are compared on the currency that `incoming` buys and `matched`
/// sells:
/// - incoming wants more: the remainder continues the incoming order at its
///   own rate.
/// - matched offers more: the remainder continues the matched order at its
///   own rate.
///
/// The remainder inherits parties, currencies and platform from the side it
/// continues, carries no signature, and names that side as its creator.
pub fn derive_remainder(incoming: &Order, matched: &Order) -> NumericResult<Option<NewOrder>> {
    let wanted = incoming.buy_amount();
    let offered = matched.sell_amount();

    let remainder = match wanted.cmp(&offered) {
        Ordering::Equal => return Ok(None),
        Ordering::Greater => {
            let buy = wanted.checked_sub(offered.as_decimal())?;
            let spent = incoming.sell_amount().scaled(offered, wanted)?;
            let sell = incoming.sell_amount().checked_sub(spent)?;
            continue_order(incoming, buy, sell)?
        }
        Ordering::Less => {
            let received = matched.buy_amount().scaled(wanted, offered)?;
            let buy = matched.buy_amount().checked_sub(received)?;
            let sell = offered.checked_sub(wanted.as_decimal())?;
            continue_order(matched, buy, sell)?
        }
    };
    Ok(Some(remainder))
}

fn continue_order(parent: &Order, buy: Amount, sell: Amount) -> NumericResult<NewOrder> {
    Ok(NewOrder::new(
        parent.sender_pk.clone(),
        parent.receiver_pk.clone(),
        parent.buy_currency.clone(),
        parent.sell_currency.clone(),
        buy,
        sell,
        parent.platform.clone(),
    )?
    .derived_from(parent.id))
}
