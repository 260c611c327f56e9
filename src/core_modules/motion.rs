// THEORY:
// The `motion` module gives the tracker its sense of momentum. Between two
// consecutive frames a marker moves roughly as far as it did between the previous
// two, so the next position is extrapolated at constant velocity from the last two
// tracked positions. The prediction only has to be close: the tracker's expanding
// window absorbs the error.
//
// Only past positions are ever consulted. With fewer than two positions there is
// no velocity yet and the predictor says so (`None`) instead of inventing a point.

use crate::core_modules::position::Position;

/// Constant-velocity extrapolation: `2 * prev - prev_prev`, componentwise.
pub fn predict(prev: Position, prev_prev: Position) -> Position {
    Position::new(
        prev.x.saturating_mul(2).saturating_sub(prev_prev.x),
        prev.y.saturating_mul(2).saturating_sub(prev_prev.y),
    )
}

/// Predicts the position in the frame following `track`, if two positions are known.
pub fn predict_next(track: &[Position]) -> Option<Position> {
    match track {
        [.., prev_prev, prev] => Some(predict(*prev, *prev_prev)),
        _ => None,
    }
}
