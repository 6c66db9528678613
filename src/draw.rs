use crate::bet::Bet;

/// The draw-evaluation predicate: a pure, deterministic function of the bet
/// fields. Placeholder per spec — a single pinned winning number, kept pure
/// so expected winners can be pinned from literal inputs in tests.
pub fn has_won(bet: &Bet) -> bool {
    bet.number == 7574
}
