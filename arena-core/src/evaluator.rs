use arena_types::{GuessMark, RoomError};

/// Score a guess against the secret with two-pass Mastermind semantics.
///
/// First pass marks exact hits and consumes those secret positions. Second
/// pass scans the remaining secret positions left to right, so each secret
/// digit is credited to at most one guess position and repeated digits are
/// never over-counted. The result depends only on `(secret, guess)`.
pub fn evaluate_guess(secret: &str, guess: &str) -> Result<Vec<GuessMark>, RoomError> {
    let secret = secret.as_bytes();
    let guess = guess.as_bytes();

    if guess.len() != secret.len() || !guess.iter().all(u8::is_ascii_digit) {
        return Err(RoomError::InvalidGuess {
            expected_length: secret.len() as u32,
        });
    }

    let mut marks = vec![GuessMark::Miss; secret.len()];
    let mut consumed = vec![false; secret.len()];

    for i in 0..secret.len() {
        if guess[i] == secret[i] {
            marks[i] = GuessMark::Exact;
            consumed[i] = true;
        }
    }

    for i in 0..guess.len() {
        if marks[i] == GuessMark::Exact {
            continue;
        }
        for j in 0..secret.len() {
            if !consumed[j] && guess[i] == secret[j] {
                marks[i] = GuessMark::Partial;
                consumed[j] = true;
                break;
            }
        }
    }

    Ok(marks)
}

/// A guess solves the round iff every position is exact.
pub fn is_fully_correct(marks: &[GuessMark]) -> bool {
    marks.iter().all(|m| *m == GuessMark::Exact)
}
