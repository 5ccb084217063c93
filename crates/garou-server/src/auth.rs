use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Subject used for spectator (receiver) tokens.
const RECEIVER_SUBJECT: &str = "receiver";

fn token_for(secret: &str, subject: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("hmac accepts any key length");
    mac.update(subject.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// A player token is valid iff it is the hex HMAC of the declared team
/// name under the shared secret.
pub fn is_valid_player_token(secret: &str, token: &str, team_name: &str) -> bool {
    constant_time_eq(&token_for(secret, team_name), token)
}

pub fn is_valid_receiver_token(secret: &str, token: &str) -> bool {
    constant_time_eq(&token_for(secret, RECEIVER_SUBJECT), token)
}

pub fn player_token(secret: &str, team_name: &str) -> String {
    token_for(secret, team_name)
}

pub fn receiver_token(secret: &str) -> String {
    token_for(secret, RECEIVER_SUBJECT)
}

fn constant_time_eq(expected: &str, candidate: &str) -> bool {
    if expected.len() != candidate.len() {
        return false;
    }
    expected
        .bytes()
        .zip(candidate.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_player_token() {
        let token = player_token("s3cret", "team-alpha");
        assert!(is_valid_player_token("s3cret", &token, "team-alpha"));
        assert!(!is_valid_player_token("s3cret", &token, "team-beta"));
        assert!(!is_valid_player_token("other", &token, "team-alpha"));
    }

    #[test]
    fn receiver_token_is_not_a_player_token() {
        let token = receiver_token("s3cret");
        assert!(is_valid_receiver_token("s3cret", &token));
        assert!(!is_valid_player_token("s3cret", &token, "receiver-team"));
    }

    #[test]
    fn truncated_token_is_rejected() {
        let token = player_token("s3cret", "team-alpha");
        assert!(!is_valid_player_token("s3cret", &token[..10], "team-alpha"));
    }
}
