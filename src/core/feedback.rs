/// Canned user-facing texts
pub const MSG_CONNECTION: &str = "We couldn't reach the server. Check your connection and try again.";
pub const MSG_SESSION: &str = "Your session has expired. Please sign in again.";
pub const MSG_FORBIDDEN: &str = "You don't have permission to do that.";
pub const MSG_DUPLICATE: &str = "That already exists.";
pub const MSG_NOT_FOUND: &str = "We couldn't find what you were looking for.";
pub const MSG_PAYMENT: &str = "The payment provider is unavailable right now. You have not been charged.";
pub const MSG_GENERIC: &str = "Something went wrong. Please try again.";

/// Pick the text to show a user for a raw upstream error message
///
/// First matching rule wins; matching is case-insensitive.
pub fn user_message(raw: &str) -> &'static str {
    let lower = raw.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["network", "timed out", "timeout", "connect", "dns"]) {
        MSG_CONNECTION
    } else if has(&["401", "jwt", "unauthorized", "expired"]) {
        MSG_SESSION
    } else if has(&["403", "permission", "row-level", "forbidden"]) {
        MSG_FORBIDDEN
    } else if has(&["409", "duplicate", "unique", "already"]) {
        MSG_DUPLICATE
    } else if has(&["404", "not found"]) {
        MSG_NOT_FOUND
    } else if has(&["gateway", "stripe", "payu"]) {
        MSG_PAYMENT
    } else {
        MSG_GENERIC
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristics() {
        assert_eq!(user_message("error sending request: Network unreachable"), MSG_CONNECTION);
        assert_eq!(user_message("Unauthorized (401): JWT expired"), MSG_SESSION);
        assert_eq!(user_message("new row violates row-level security policy"), MSG_FORBIDDEN);
        assert_eq!(user_message("duplicate key value violates unique constraint"), MSG_DUPLICATE);
        assert_eq!(user_message("Not found: models"), MSG_NOT_FOUND);
        assert_eq!(user_message("Gateway returned error 500"), MSG_PAYMENT);
        assert_eq!(user_message("weird"), MSG_GENERIC);
    }
}
