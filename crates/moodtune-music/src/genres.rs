//! Static expression → genre mapping. Immutable, defined at startup.

use moodtune_core::Expression;

/// Ordered genre tags for an expression.
///
/// `disgusted` has no entry; callers fall back to the raw label.
pub fn genres_for(expression: Expression) -> Option<&'static [&'static str]> {
    match expression {
        Expression::Happy => Some(&["happy", "latino", "pop"]),
        Expression::Sad => Some(&["sad", "acoustic", "blues"]),
        Expression::Angry => Some(&["metal", "rock", "punk"]),
        Expression::Neutral => Some(&["pop", "classical", "jazz"]),
        Expression::Surprised => Some(&["electronic", "k-pop", "dance"]),
        Expression::Fearful => Some(&["classical", "ambient", "new-age"]),
        Expression::Disgusted => None,
    }
}

/// The query term sent to the search endpoint: the expression's primary
/// genre, or the raw expression label when unmapped.
pub fn search_query(expression: Expression) -> &'static str {
    genres_for(expression).map_or(expression.as_str(), |genres| genres[0])
}
