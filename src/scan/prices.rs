//! Pure quote derivation from a fetched order book.

use rust_decimal::Decimal;

use crate::types::{MarketPrices, OrderBook, SideQuote};

/// Highest resting bid, `None` for an empty ladder.
pub fn best_bid(book: &OrderBook) -> Option<Decimal> {
    book.bids.iter().map(|level| level.price).max()
}

/// Lowest resting ask, `None` for an empty ladder.
pub fn best_ask(book: &OrderBook) -> Option<Decimal> {
    book.asks.iter().map(|level| level.price).min()
}

/// Implied price of the opposite outcome.
///
/// The input is rounded once, at the market's precision, before the
/// subtraction, so `price + complement(price) == 1` holds exactly at that
/// precision.
pub fn complement(price: Option<Decimal>, precision: u32) -> Option<Decimal> {
    price.map(|p| Decimal::ONE - p.round_dp(precision))
}

/// Derive both sides' quotes from a yes-side order book.
///
/// A one-sided book yields a partial quote; the missing fields stay `None`.
pub fn resolve(book: &OrderBook, precision: u32) -> MarketPrices {
    let bid = best_bid(book);
    let ask = best_ask(book);
    MarketPrices {
        yes: SideQuote {
            buy: ask,
            sell: bid,
        },
        no: SideQuote {
            buy: complement(bid, precision),
            sell: complement(ask, precision),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PriceLevel;
    use rust_decimal_macros::dec;

    fn book(bids: &[(Decimal, Decimal)], asks: &[(Decimal, Decimal)]) -> OrderBook {
        let level = |&(price, size): &(Decimal, Decimal)| PriceLevel { price, size };
        OrderBook {
            bids: bids.iter().map(level).collect(),
            asks: asks.iter().map(level).collect(),
        }
    }

    #[test]
    fn complement_sums_to_one() {
        for price in [dec!(0.01), dec!(0.37), dec!(0.5), dec!(0.99)] {
            for precision in [2u32, 3, 4] {
                let c = complement(Some(price), precision).unwrap();
                assert_eq!(price + c, Decimal::ONE, "price {} dp {}", price, precision);
            }
        }
    }

    #[test]
    fn complement_rounds_input_once() {
        // 0.5549 rounds to 0.55 at two decimals, then 1 - 0.55 = 0.45.
        assert_eq!(complement(Some(dec!(0.5549)), 2), Some(dec!(0.45)));
        assert_eq!(complement(Some(dec!(0.567)), 2), Some(dec!(0.43)));
        // At higher precision the same input keeps more digits.
        assert_eq!(complement(Some(dec!(0.5549)), 4), Some(dec!(0.4451)));
    }

    #[test]
    fn complement_of_none_is_none() {
        assert_eq!(complement(None, 2), None);
    }

    #[test]
    fn best_prices_ignore_ladder_ordering() {
        let book = book(
            &[(dec!(0.40), dec!(5)), (dec!(0.45), dec!(3)), (dec!(0.42), dec!(1))],
            &[(dec!(0.60), dec!(2)), (dec!(0.55), dec!(4))],
        );
        assert_eq!(best_bid(&book), Some(dec!(0.45)));
        assert_eq!(best_ask(&book), Some(dec!(0.55)));
    }

    #[test]
    fn resolve_full_book() {
        let book = book(&[(dec!(0.45), dec!(3))], &[(dec!(0.55), dec!(4))]);
        let prices = resolve(&book, 2);
        assert_eq!(prices.yes.buy, Some(dec!(0.55)));
        assert_eq!(prices.yes.sell, Some(dec!(0.45)));
        assert_eq!(prices.no.buy, Some(dec!(0.55)));
        assert_eq!(prices.no.sell, Some(dec!(0.45)));
    }

    #[test]
    fn resolve_bidless_book_is_partial_not_error() {
        let book = book(&[], &[(dec!(0.60), dec!(2)), (dec!(0.70), dec!(1))]);
        let prices = resolve(&book, 2);
        assert_eq!(prices.yes.sell, None);
        assert_eq!(prices.yes.buy, Some(dec!(0.60)));
        assert_eq!(prices.no.buy, None);
        assert_eq!(prices.no.sell, Some(dec!(0.40)));
    }

    #[test]
    fn resolve_empty_book_is_all_none() {
        let prices = resolve(&OrderBook::default(), 2);
        assert_eq!(prices, MarketPrices::default());
    }
}
